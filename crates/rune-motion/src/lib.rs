//! Keyframe transform animations for scene nodes.
//!
//! An arbitrary `t -> Transform` function is sampled at a logical frame rate
//! into per-channel keyframe tracks (translation, scale, rotation), wrapped
//! in a [`KeyframeGroup`](backend::KeyframeGroup) with repeat, autoreverse and
//! timing metadata, and played on the node's cached layer. While the backend
//! plays, the runner mirrors progress back into the node and the animation,
//! and on completion snaps both to the final value and releases the layer.
//!
//! - [`tracks`]: sampling value functions into keyframe tracks
//! - [`runner`]: starting animations and the removal handle
//! - [`backend`]: keyframe groups, timing curves and the reference compositor
//! - [`node`] and [`layer`]: the seams a scene graph implements

pub mod animation;
pub mod backend;
pub mod error;
pub mod geometry;
pub mod layer;
pub mod node;
pub mod runner;
pub mod tracks;
pub mod types;

pub use animation::{Animation, AnimationKind, SharedAnimation};
pub use backend::{Compositor, KeyframeGroup, TimingCurve};
pub use error::{MotionError, Result};
pub use geometry::{Point, Rect, Transform};
pub use node::{Node, SceneNode, SharedNode};
pub use runner::{RemovalHandle, start};
pub use tracks::{DEFAULT_FPS, MAX_SAMPLES, TrackSet, build_tracks, sample_times};
pub use types::{AnimationId, AnimationState, NodeId};
