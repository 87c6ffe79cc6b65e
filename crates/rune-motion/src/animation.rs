//! Resolved animation descriptions and their per-run state.
//!
//! An [`Animation`] pairs an [`AnimationKind`] (what is sampled) with playback
//! parameters (duration, repeat, autoreverse, timing) and the mutable state the
//! runner maintains while it plays: progress, lifecycle state, removal handle
//! and user callbacks.
//!
//! # Example
//!
//! ```
//! use rune_motion::animation::Animation;
//! use rune_motion::geometry::Transform;
//! use rune_motion::node::SceneNode;
//!
//! let node = SceneNode::new(None).into_shared();
//! let animation = Animation::transform(|t| Transform::rotate(t), 0.5)
//!     .target(&node)
//!     .repeat_count(2.0)
//!     .autoreverses(true);
//! assert_eq!(animation.progress(), 0.0);
//! ```

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::backend::TimingCurve;
use crate::geometry::Transform;
use crate::node::{Node, SharedNode, WeakNode};
use crate::runner::RemovalHandle;
use crate::tracks::DEFAULT_FPS;
use crate::types::{AnimationId, AnimationState};

pub type TransformFunction = Rc<dyn Fn(f64) -> Transform>;
pub type ScalarFunction = Rc<dyn Fn(f64) -> f64>;
pub type SharedAnimation = Rc<RefCell<Animation>>;

/// Parameters of a transform animation.
#[derive(Clone)]
pub struct TransformAnimation {
    /// `t in [0, 1] -> Transform`. `None` until the authoring layer resolves it.
    pub value_fn: Option<TransformFunction>,
    /// Samples per second of animation time used when building tracks.
    pub logical_fps: u32,
}

/// Parameters of an opacity animation.
#[derive(Clone)]
pub struct OpacityAnimation {
    pub value_fn: Option<ScalarFunction>,
    pub logical_fps: u32,
}

/// What an animation drives; the runner dispatches on this tag.
#[derive(Clone)]
pub enum AnimationKind {
    Transform(TransformAnimation),
    Opacity(OpacityAnimation),
}

impl AnimationKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Transform(_) => "transform",
            Self::Opacity(_) => "opacity",
        }
    }

    pub fn logical_fps(&self) -> u32 {
        match self {
            Self::Transform(t) => t.logical_fps,
            Self::Opacity(o) => o.logical_fps,
        }
    }
}

impl fmt::Debug for AnimationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let resolved = match self {
            Self::Transform(t) => t.value_fn.is_some(),
            Self::Opacity(o) => o.value_fn.is_some(),
        };
        f.debug_struct("AnimationKind")
            .field("kind", &self.name())
            .field("logical_fps", &self.logical_fps())
            .field("resolved", &resolved)
            .finish()
    }
}

/// A single animation and its playback state.
pub struct Animation {
    id: AnimationId,
    pub kind: AnimationKind,
    node: Option<WeakNode>,
    /// Duration of one forward pass in seconds.
    pub duration: f64,
    pub autoreverses: bool,
    pub repeat_count: f64,
    pub timing: TimingCurve,
    pub(crate) progress: f64,
    pub(crate) lifecycle: Rc<Cell<AnimationState>>,
    pub(crate) removal: Option<RemovalHandle>,
    pub(crate) on_progress_update: Option<Box<dyn FnMut(f64)>>,
    pub(crate) completion: Option<Box<dyn FnMut()>>,
}

impl fmt::Debug for Animation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Animation")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("duration", &self.duration)
            .field("autoreverses", &self.autoreverses)
            .field("repeat_count", &self.repeat_count)
            .field("timing", &self.timing)
            .field("progress", &self.progress)
            .field("state", &self.state())
            .finish()
    }
}

impl Animation {
    pub fn new(kind: AnimationKind, duration: f64) -> Self {
        Self {
            id: AnimationId::new(),
            kind,
            node: None,
            duration,
            autoreverses: false,
            repeat_count: 0.0,
            timing: TimingCurve::Linear,
            progress: 0.0,
            lifecycle: Rc::new(Cell::new(AnimationState::Idle)),
            removal: None,
            on_progress_update: None,
            completion: None,
        }
    }

    /// Transform animation sampled at [`DEFAULT_FPS`].
    pub fn transform(value_fn: impl Fn(f64) -> Transform + 'static, duration: f64) -> Self {
        Self::new(
            AnimationKind::Transform(TransformAnimation {
                value_fn: Some(Rc::new(value_fn)),
                logical_fps: DEFAULT_FPS,
            }),
            duration,
        )
    }

    /// Opacity animation sampled at [`DEFAULT_FPS`].
    pub fn opacity(value_fn: impl Fn(f64) -> f64 + 'static, duration: f64) -> Self {
        Self::new(
            AnimationKind::Opacity(OpacityAnimation {
                value_fn: Some(Rc::new(value_fn)),
                logical_fps: DEFAULT_FPS,
            }),
            duration,
        )
    }

    pub fn target<N: Node + 'static>(mut self, node: &Rc<RefCell<N>>) -> Self {
        let weak = Rc::downgrade(node);
        self.node = Some(weak as WeakNode);
        self
    }

    pub fn target_shared(mut self, node: &SharedNode) -> Self {
        self.node = Some(Rc::downgrade(node));
        self
    }

    pub fn logical_fps(mut self, fps: u32) -> Self {
        match &mut self.kind {
            AnimationKind::Transform(t) => t.logical_fps = fps,
            AnimationKind::Opacity(o) => o.logical_fps = fps,
        }
        self
    }

    pub fn autoreverses(mut self, autoreverses: bool) -> Self {
        self.autoreverses = autoreverses;
        self
    }

    pub fn repeat_count(mut self, repeat_count: f64) -> Self {
        self.repeat_count = repeat_count;
        self
    }

    pub fn timing(mut self, timing: TimingCurve) -> Self {
        self.timing = timing;
        self
    }

    pub fn on_progress_update(mut self, observer: impl FnMut(f64) + 'static) -> Self {
        self.on_progress_update = Some(Box::new(observer));
        self
    }

    pub fn on_completion(mut self, completion: impl FnMut() + 'static) -> Self {
        self.completion = Some(Box::new(completion));
        self
    }

    pub fn into_shared(self) -> SharedAnimation {
        Rc::new(RefCell::new(self))
    }

    pub fn id(&self) -> AnimationId {
        self.id
    }

    pub fn node(&self) -> Option<&WeakNode> {
        self.node.as_ref()
    }

    /// Normalized time of the last progress tick; `1.0` once completed.
    pub fn progress(&self) -> f64 {
        self.progress
    }

    pub fn state(&self) -> AnimationState {
        self.lifecycle.get()
    }

    /// Handle for the current run, if one was started.
    pub fn removal_handle(&self) -> Option<RemovalHandle> {
        self.removal.clone()
    }

    /// Detach the current run from its layer. See [`RemovalHandle::remove`].
    pub fn remove(&self) -> bool {
        self.removal.as_ref().is_some_and(|handle| handle.remove())
    }

    pub fn set_on_progress_update(&mut self, observer: Option<Box<dyn FnMut(f64)>>) {
        self.on_progress_update = observer;
    }

    pub fn set_completion(&mut self, completion: Option<Box<dyn FnMut()>>) {
        self.completion = completion;
    }
}
