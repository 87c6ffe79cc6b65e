//! In-process compositor: a layer cache whose layers play keyframe groups
//! from an explicit clock.
//!
//! Each call to [`Compositor::tick`] advances every attached group, updates
//! the presented values of each layer and then delivers hook notifications.
//! Notifications are collected while layers are borrowed and dispatched only
//! after every borrow is released, so hooks may call back into the compositor
//! (free a layer, remove or add animations) without conflict.
//!
//! ```
//! use std::rc::Rc;
//! use rune_motion::backend::{Compositor, KeyPath, KeyframeGroup, KeyframeTrack};
//! use rune_motion::layer::{Layer, LayerCache};
//! use rune_motion::node::SceneNode;
//! use rune_motion::types::AnimationId;
//!
//! let compositor = Rc::new(Compositor::new());
//! let node = SceneNode::new(None);
//! let layer = compositor.layer_for(&node);
//! let group = KeyframeGroup::new(1.0)
//!     .track(KeyframeTrack::new(KeyPath::Opacity, vec![0.0, 1.0], vec![0.0, 0.5]));
//! layer.add_animation(group, AnimationId::new()).unwrap();
//!
//! compositor.tick(0.25);
//! let presented = compositor.presentation(rune_motion::node::Node::id(&node)).unwrap();
//! assert!((presented.opacity - 0.5).abs() < 1e-9);
//! ```

use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use super::group::{CompletionHook, FillMode, KeyPath, KeyframeGroup, ProgressHook};
use crate::error::Result;
use crate::geometry::Rect;
use crate::layer::{Layer, LayerCache};
use crate::node::Node;
use crate::types::{AnimationId, NodeId};

/// Values a layer currently displays.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Presentation {
    pub translate_x: f64,
    pub translate_y: f64,
    pub scale_x: f64,
    pub scale_y: f64,
    /// Rotation in radians.
    pub rotation: f64,
    pub opacity: f64,
}

impl Presentation {
    /// Model values for a layer placed at `bounds`.
    pub fn at_rest(bounds: Option<Rect>) -> Self {
        let (x, y) = bounds.map(|b| (b.x, b.y)).unwrap_or((0.0, 0.0));
        Self {
            translate_x: x,
            translate_y: y,
            scale_x: 1.0,
            scale_y: 1.0,
            rotation: 0.0,
            opacity: 1.0,
        }
    }

    fn set(&mut self, key_path: KeyPath, value: f64) {
        match key_path {
            KeyPath::TranslationX => self.translate_x = value,
            KeyPath::TranslationY => self.translate_y = value,
            KeyPath::ScaleX => self.scale_x = value,
            KeyPath::ScaleY => self.scale_y = value,
            KeyPath::RotationZ => self.rotation = value,
            KeyPath::Opacity => self.opacity = value,
        }
    }
}

/// Pending hook invocation.
enum Notice {
    Progress(ProgressHook, f64),
    Completion(CompletionHook, bool),
}

impl Notice {
    fn dispatch(self) {
        match self {
            Self::Progress(hook, t) => hook(t),
            Self::Completion(hook, finished) => hook(finished),
        }
    }
}

/// A group attached to a layer and its playback clock.
struct Playback {
    key: AnimationId,
    group: KeyframeGroup,
    elapsed: f64,
    /// Eased local time presented on the last tick.
    time: Option<f64>,
    finished: bool,
}

impl Playback {
    /// Advance by `dt` and queue the resulting notifications.
    fn advance(&mut self, dt: f64, notices: &mut Vec<Notice>) {
        if self.finished {
            return;
        }

        self.elapsed += dt;
        let local = self.group.local_time(self.elapsed);
        let t = self.group.timing.evaluate(local);
        self.time = Some(t);

        if let Some(hook) = self.group.progress_hook() {
            notices.push(Notice::Progress(hook, t));
        }
        if self.elapsed >= self.group.active_duration() {
            self.finished = true;
            if let Some(hook) = self.group.completion_hook() {
                notices.push(Notice::Completion(hook, true));
            }
        }
    }

    fn present(&self, presentation: &mut Presentation) {
        let Some(t) = self.time else {
            return;
        };
        if self.finished && self.group.fill_mode == FillMode::Removed {
            return;
        }
        for track in &self.group.tracks {
            if let Some(value) = track.sample(t) {
                presentation.set(track.key_path, value);
            }
        }
    }
}

/// A node's layer inside the [`Compositor`].
pub struct CompositorLayer {
    node_id: NodeId,
    model: Presentation,
    animations: RefCell<Vec<Playback>>,
    presentation: Cell<Presentation>,
}

impl CompositorLayer {
    fn new(node_id: NodeId, bounds: Option<Rect>) -> Self {
        let model = Presentation::at_rest(bounds);
        Self {
            node_id,
            model,
            animations: RefCell::new(Vec::new()),
            presentation: Cell::new(model),
        }
    }

    pub fn node_id(&self) -> NodeId {
        self.node_id
    }

    pub fn presentation(&self) -> Presentation {
        self.presentation.get()
    }

    /// Keys of attached groups, in the order they were added.
    pub fn animation_keys(&self) -> Vec<AnimationId> {
        self.animations.borrow().iter().map(|p| p.key).collect()
    }

    /// Whether any attached group is still playing.
    pub fn is_animating(&self) -> bool {
        self.animations.borrow().iter().any(|p| !p.finished)
    }

    fn advance(&self, dt: f64, notices: &mut Vec<Notice>) {
        let mut animations = self.animations.borrow_mut();
        for playback in animations.iter_mut() {
            playback.advance(dt, notices);
        }
        animations.retain(|p| !(p.finished && p.group.removed_on_completion));
        self.recompute(&animations);
    }

    fn recompute(&self, animations: &[Playback]) {
        let mut presentation = self.model;
        for playback in animations {
            playback.present(&mut presentation);
        }
        self.presentation.set(presentation);
    }
}

impl Layer for CompositorLayer {
    fn add_animation(&self, group: KeyframeGroup, key: AnimationId) -> Result<()> {
        if let Err(err) = group.validate() {
            tracing::warn!(node = %self.node_id, animation = %key, error = %err, "group rejected");
            return Err(err);
        }

        let displaced = {
            let mut animations = self.animations.borrow_mut();
            let displaced = animations
                .iter()
                .position(|p| p.key == key)
                .map(|idx| animations.remove(idx));
            animations.push(Playback {
                key,
                group,
                elapsed: 0.0,
                time: None,
                finished: false,
            });
            self.recompute(&animations);
            displaced
        };

        tracing::trace!(node = %self.node_id, animation = %key, "group attached");
        let Some(old) = displaced else {
            return Ok(());
        };
        tracing::debug!(node = %self.node_id, animation = %key, "group displaced");
        if !old.finished {
            if let Some(hook) = old.group.completion_hook() {
                hook(false);
            }
        }
        Ok(())
    }

    fn remove_animation(&self, key: AnimationId) -> bool {
        let mut animations = self.animations.borrow_mut();
        let before = animations.len();
        animations.retain(|p| p.key != key);
        let removed = animations.len() != before;
        if removed {
            self.recompute(&animations);
        }
        removed
    }
}

struct CacheEntry {
    layer: Rc<CompositorLayer>,
    holds: usize,
}

/// Layer cache and playback clock.
///
/// Layers are reference counted per node: every [`LayerCache::layer_for`]
/// adds a hold, every [`LayerCache::free`] drops one, and the layer is
/// reclaimed when the last hold goes.
#[derive(Default)]
pub struct Compositor {
    layers: RefCell<HashMap<NodeId, CacheEntry>>,
    clock: Cell<f64>,
}

impl Compositor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seconds advanced so far.
    pub fn now(&self) -> f64 {
        self.clock.get()
    }

    /// Advance every layer by `dt` seconds and deliver hooks.
    pub fn tick(&self, dt: f64) {
        self.clock.set(self.clock.get() + dt);

        let layers: Vec<Rc<CompositorLayer>> = self
            .layers
            .borrow()
            .values()
            .map(|entry| entry.layer.clone())
            .collect();

        let mut notices = Vec::new();
        for layer in &layers {
            layer.advance(dt, &mut notices);
        }

        tracing::trace!(
            now = self.clock.get(),
            layers = layers.len(),
            notices = notices.len(),
            "compositor tick"
        );
        for notice in notices {
            notice.dispatch();
        }
    }

    /// Tick at `dt` until nothing is animating or `max_ticks` is reached.
    /// Returns the number of ticks run.
    pub fn run_until_idle(&self, dt: f64, max_ticks: usize) -> usize {
        let mut ticks = 0;
        while ticks < max_ticks && self.has_active_animations() {
            self.tick(dt);
            ticks += 1;
        }
        ticks
    }

    pub fn has_active_animations(&self) -> bool {
        self.layers
            .borrow()
            .values()
            .any(|entry| entry.layer.is_animating())
    }

    pub fn layer(&self, node_id: NodeId) -> Option<Rc<CompositorLayer>> {
        self.layers
            .borrow()
            .get(&node_id)
            .map(|entry| entry.layer.clone())
    }

    pub fn presentation(&self, node_id: NodeId) -> Option<Presentation> {
        self.layer(node_id).map(|layer| layer.presentation())
    }

    pub fn is_cached(&self, node_id: NodeId) -> bool {
        self.layers.borrow().contains_key(&node_id)
    }

    /// Outstanding holds on the node's layer.
    pub fn hold_count(&self, node_id: NodeId) -> usize {
        self.layers
            .borrow()
            .get(&node_id)
            .map_or(0, |entry| entry.holds)
    }

    pub fn layer_count(&self) -> usize {
        self.layers.borrow().len()
    }
}

impl LayerCache for Compositor {
    fn layer_for(&self, node: &dyn Node) -> Rc<dyn Layer> {
        let node_id = node.id();
        let mut layers = self.layers.borrow_mut();
        let entry = layers.entry(node_id).or_insert_with(|| {
            tracing::debug!(node = %node_id, "layer created");
            CacheEntry {
                layer: Rc::new(CompositorLayer::new(node_id, node.bounds())),
                holds: 0,
            }
        });
        entry.holds += 1;
        entry.layer.clone()
    }

    fn free(&self, node_id: NodeId) {
        let reclaimed = {
            let mut layers = self.layers.borrow_mut();
            let Some(entry) = layers.get_mut(&node_id) else {
                return;
            };
            entry.holds = entry.holds.saturating_sub(1);
            if entry.holds == 0 {
                layers.remove(&node_id)
            } else {
                None
            }
        };
        if reclaimed.is_some() {
            tracing::debug!(node = %node_id, "layer reclaimed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{KeyframeTrack, TimingCurve};
    use crate::node::SceneNode;

    const EPSILON: f64 = 1e-9;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < EPSILON
    }

    fn fade(duration: f64) -> KeyframeGroup {
        KeyframeGroup::new(duration).track(KeyframeTrack::new(
            KeyPath::Opacity,
            vec![0.0, 0.5],
            vec![0.0, 0.5],
        ))
    }

    type Log = Rc<RefCell<Vec<String>>>;

    fn logged(group: KeyframeGroup, log: &Log) -> KeyframeGroup {
        let progress_log = log.clone();
        let completion_log = log.clone();
        group
            .on_progress(move |t| progress_log.borrow_mut().push(format!("p{t:.2}")))
            .on_completion(move |f| completion_log.borrow_mut().push(format!("c{f}")))
    }

    #[test]
    fn test_layer_for_is_idempotent_and_counts_holds() {
        let compositor = Compositor::new();
        let node = SceneNode::new(Some(Rect::new(3.0, 4.0, 10.0, 10.0)));
        let a = compositor.layer_for(&node);
        let b = compositor.layer_for(&node);
        assert!(Rc::ptr_eq(&a, &b));
        assert_eq!(compositor.hold_count(node.id()), 2);
        assert_eq!(compositor.layer_count(), 1);

        let presented = compositor.presentation(node.id()).unwrap();
        assert_eq!(presented, Presentation::at_rest(node.bounds()));
        assert_eq!(presented.translate_x, 3.0);

        compositor.free(node.id());
        assert!(compositor.is_cached(node.id()));
        compositor.free(node.id());
        assert!(!compositor.is_cached(node.id()));

        // Freeing an uncached node is a no-op.
        compositor.free(node.id());
        compositor.free(NodeId(u64::MAX));
        assert_eq!(compositor.layer_count(), 0);
    }

    #[test]
    fn test_add_animation_rejects_invalid_group() {
        let compositor = Compositor::new();
        let node = SceneNode::new(None);
        let layer = compositor.layer_for(&node);
        let bad = KeyframeGroup::new(1.0).track(KeyframeTrack::new(
            KeyPath::ScaleX,
            vec![1.0],
            vec![0.0, 0.5],
        ));
        assert!(layer.add_animation(bad, AnimationId::new()).is_err());
        assert!(!compositor.has_active_animations());
    }

    #[test]
    fn test_playback_delivers_progress_then_single_completion() {
        let compositor = Compositor::new();
        let node = SceneNode::new(None);
        let log: Log = Rc::default();
        compositor
            .layer_for(&node)
            .add_animation(logged(fade(1.0), &log), AnimationId::new())
            .unwrap();

        let ticks = compositor.run_until_idle(0.25, 100);
        assert_eq!(ticks, 4);
        compositor.tick(0.25);

        assert_eq!(
            *log.borrow(),
            vec!["p0.25", "p0.50", "p0.75", "p1.00", "ctrue"]
        );

        // Held forward after completion.
        let presented = compositor.presentation(node.id()).unwrap();
        assert!(approx_eq(presented.opacity, 0.5));
        let layer = compositor.layer(node.id()).unwrap();
        assert_eq!(layer.animation_keys().len(), 1);
        assert!(!layer.is_animating());
    }

    #[test]
    fn test_presentation_interpolates_and_holds_last_key() {
        let compositor = Compositor::new();
        let node = SceneNode::new(None);
        let layer = compositor.layer_for(&node);
        layer.add_animation(fade(1.0), AnimationId::new()).unwrap();

        compositor.tick(0.25);
        assert!(approx_eq(compositor.presentation(node.id()).unwrap().opacity, 0.25));
        compositor.tick(0.5);
        assert!(approx_eq(compositor.presentation(node.id()).unwrap().opacity, 0.5));
    }

    #[test]
    fn test_autoreverse_returns_to_start() {
        let compositor = Compositor::new();
        let node = SceneNode::new(None);
        let log: Log = Rc::default();
        compositor
            .layer_for(&node)
            .add_animation(
                logged(fade(1.0).autoreverses(true), &log),
                AnimationId::new(),
            )
            .unwrap();

        compositor.run_until_idle(0.5, 100);
        assert_eq!(*log.borrow(), vec!["p0.50", "p1.00", "p0.50", "p0.00", "ctrue"]);
        assert!(approx_eq(compositor.presentation(node.id()).unwrap().opacity, 0.0));
    }

    #[test]
    fn test_repeat_count_and_timing() {
        let compositor = Compositor::new();
        let node = SceneNode::new(None);
        let log: Log = Rc::default();
        compositor
            .layer_for(&node)
            .add_animation(
                logged(
                    fade(1.0).repeat_count(2.0).timing(TimingCurve::EaseIn),
                    &log,
                ),
                AnimationId::new(),
            )
            .unwrap();

        let ticks = compositor.run_until_idle(0.5, 100);
        assert_eq!(ticks, 4);
        let log = log.borrow();
        assert_eq!(log.last().map(String::as_str), Some("ctrue"));
        // Eased half-way point lags behind linear time.
        let first: f64 = log[0][1..].parse().unwrap();
        assert!(first < 0.5);
    }

    #[test]
    fn test_displaced_group_completes_unfinished() {
        let compositor = Compositor::new();
        let node = SceneNode::new(None);
        let layer = compositor.layer_for(&node);
        let key = AnimationId::new();
        let log: Log = Rc::default();

        layer.add_animation(logged(fade(1.0), &log), key).unwrap();
        compositor.tick(0.25);
        layer.add_animation(fade(1.0), key).unwrap();

        assert_eq!(*log.borrow(), vec!["p0.25", "cfalse"]);
        assert_eq!(compositor.layer(node.id()).unwrap().animation_keys(), vec![key]);
    }

    #[test]
    fn test_remove_animation_restores_model_without_completion() {
        let compositor = Compositor::new();
        let node = SceneNode::new(None);
        let layer = compositor.layer_for(&node);
        let key = AnimationId::new();
        let log: Log = Rc::default();

        layer.add_animation(logged(fade(1.0), &log), key).unwrap();
        compositor.tick(0.25);
        assert!(layer.remove_animation(key));
        assert!(!layer.remove_animation(key));
        compositor.tick(0.25);

        assert_eq!(*log.borrow(), vec!["p0.25"]);
        assert_eq!(compositor.presentation(node.id()).unwrap().opacity, 1.0);
    }

    #[test]
    fn test_hooks_may_free_their_layer() {
        let compositor = Rc::new(Compositor::new());
        let node = SceneNode::new(None);
        let node_id = node.id();
        let cache = compositor.clone();
        let group = fade(0.5).on_completion(move |_| cache.free(node_id));

        compositor.layer_for(&node).add_animation(group, AnimationId::new()).unwrap();
        compositor.run_until_idle(0.25, 10);
        assert!(!compositor.is_cached(node_id));
        assert_eq!(compositor.now(), 0.5);
    }
}
