//! Layer and layer-cache interfaces the runner plays animations through.
//!
//! A layer cache hands out one renderable layer per node, creating it on
//! first use. Every `layer_for` is a hold on that layer and is matched by a
//! `free` once the animation that needed it is done; implementations decide
//! when a layer with no remaining holds is reclaimed.

use std::rc::Rc;

use crate::backend::KeyframeGroup;
use crate::error::Result;
use crate::node::Node;
use crate::types::{AnimationId, NodeId};

/// A renderable surface that plays keyframe groups.
pub trait Layer {
    /// Register `group` under `key`. A group already registered under the
    /// same key is displaced.
    fn add_animation(&self, group: KeyframeGroup, key: AnimationId) -> Result<()>;

    /// Detach the group registered under `key`. Returns `false` if there was
    /// none.
    fn remove_animation(&self, key: AnimationId) -> bool;
}

/// Maps nodes to their cached layers.
pub trait LayerCache {
    /// Layer for `node`, created on first use.
    fn layer_for(&self, node: &dyn Node) -> Rc<dyn Layer>;

    /// Release one hold on the node's layer. Safe to call for a node that is
    /// not cached.
    fn free(&self, node_id: NodeId);
}
