//! Scene node interface consumed by the runner.
//!
//! The runner only needs a node's identity, its bounds (to offset the
//! sampled translation) and somewhere to write the live value while the
//! backend plays. Nodes are shared as `Rc<RefCell<dyn Node>>`; animations
//! keep a `Weak` so a dropped node simply stops receiving updates.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::geometry::{Rect, Transform};
use crate::types::{AnimationId, NodeId};

pub type SharedNode = Rc<RefCell<dyn Node>>;
pub type WeakNode = Weak<RefCell<dyn Node>>;

/// A scene-graph node that can be animated.
pub trait Node {
    fn id(&self) -> NodeId;

    /// Bounds in the parent's coordinate space, if the node has been laid out.
    fn bounds(&self) -> Option<Rect>;

    /// Write the node's current transform on behalf of `writer`.
    fn set_transform(&mut self, value: Transform, writer: AnimationId);

    /// Write the node's current opacity on behalf of `writer`.
    fn set_opacity(&mut self, value: f64, writer: AnimationId);
}

/// Holder for a node property written by animations.
///
/// Each write bumps the revision and records the writer, so callers can tell
/// which animation last drove the value.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueSlot<T> {
    value: T,
    revision: u64,
    last_writer: Option<AnimationId>,
}

impl<T: Copy> ValueSlot<T> {
    pub fn new(value: T) -> Self {
        Self {
            value,
            revision: 0,
            last_writer: None,
        }
    }

    pub fn get(&self) -> T {
        self.value
    }

    pub fn set(&mut self, value: T, writer: AnimationId) {
        self.value = value;
        self.revision += 1;
        self.last_writer = Some(writer);
    }

    /// Number of writes so far.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn last_writer(&self) -> Option<AnimationId> {
        self.last_writer
    }
}

/// Plain node with transform and opacity slots.
#[derive(Debug, Clone)]
pub struct SceneNode {
    id: NodeId,
    bounds: Option<Rect>,
    pub transform: ValueSlot<Transform>,
    pub opacity: ValueSlot<f64>,
}

impl SceneNode {
    pub fn new(bounds: Option<Rect>) -> Self {
        Self {
            id: NodeId::new(),
            bounds,
            transform: ValueSlot::new(Transform::identity()),
            opacity: ValueSlot::new(1.0),
        }
    }

    pub fn with_id(mut self, id: NodeId) -> Self {
        self.id = id;
        self
    }

    pub fn set_bounds(&mut self, bounds: Option<Rect>) {
        self.bounds = bounds;
    }

    pub fn into_shared(self) -> Rc<RefCell<SceneNode>> {
        Rc::new(RefCell::new(self))
    }
}

impl Node for SceneNode {
    fn id(&self) -> NodeId {
        self.id
    }

    fn bounds(&self) -> Option<Rect> {
        self.bounds
    }

    fn set_transform(&mut self, value: Transform, writer: AnimationId) {
        self.transform.set(value, writer);
    }

    fn set_opacity(&mut self, value: f64, writer: AnimationId) {
        self.opacity.set(value, writer);
    }
}
