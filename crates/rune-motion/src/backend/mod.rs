//! Playback backend: the keyframe groups layers accept, the timing curves
//! they are eased with, and an in-process compositor that plays them.
//!
//! # Architecture
//!
//! ```text
//! Compositor (LayerCache)
//!   └── CompositorLayer (Layer), one per node
//!         └── KeyframeGroup
//!               ├── KeyframeTrack per key path
//!               └── progress / completion hooks
//! ```

pub mod compositor;
pub mod group;
pub mod timing;

pub use compositor::{Compositor, CompositorLayer, Presentation};
pub use group::{CompletionHook, FillMode, KeyPath, KeyframeGroup, KeyframeTrack, ProgressHook};
pub use timing::TimingCurve;
