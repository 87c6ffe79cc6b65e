//! Animation runner: starts an animation on its node's cached layer and keeps
//! node, animation and cache in step with backend playback.
//!
//! Starting an animation:
//! 1. resolves the target node (offset = bounds origin, or the origin)
//! 2. samples the animation into a [`KeyframeGroup`] (dispatching on
//!    [`AnimationKind`])
//! 3. attaches autoreverse, repeat count and timing, then validates the group
//! 4. acquires the node's layer and registers the group under the animation id
//!
//! The group carries two hooks:
//! - `progress(t)` re-evaluates the animation's own value function at `t`
//!   and writes it to the node, updates `progress`, then notifies the
//!   observer
//! - `completion(finished)` snaps node and progress to `t = 1`, frees the
//!   layer, then runs the animation's completion callback and `on_done`
//!
//! Per run the lifecycle is `Idle -> Running -> {Completed, Removed}`. The
//! completion sequence runs at most once, and never after removal.

mod opacity;
mod transform;

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use crate::animation::{Animation, AnimationKind, SharedAnimation};
use crate::backend::KeyframeGroup;
use crate::error::{MotionError, Result};
use crate::geometry::Point;
use crate::layer::{Layer, LayerCache};
use crate::node::{Node, WeakNode};
use crate::types::{AnimationId, AnimationState, NodeId};

/// Writes the animated value at `t` into a node.
type ApplyFn = Rc<dyn Fn(&mut dyn Node, f64)>;

/// A sampled animation ready to be wrapped with playback metadata.
struct Prepared {
    group: KeyframeGroup,
    apply: ApplyFn,
}

/// Start `animation` on its target node.
///
/// `on_done` runs after the animation's own completion callback when the
/// backend reports completion. On error nothing has been applied: no layer
/// is held and the animation stays as it was.
pub fn start(
    animation: &SharedAnimation,
    cache: &Rc<dyn LayerCache>,
    on_done: impl FnOnce() + 'static,
) -> Result<RemovalHandle> {
    let (id, kind, node, duration, autoreverses, repeat_count, timing) = {
        let a = animation.borrow();
        (
            a.id(),
            a.kind.clone(),
            a.node().cloned(),
            a.duration,
            a.autoreverses,
            a.repeat_count,
            a.timing,
        )
    };

    let weak_node = node.ok_or_else(|| {
        MotionError::missing_target(format!("{id} has no target node"))
    })?;
    let node = weak_node.upgrade().ok_or_else(|| {
        MotionError::missing_target(format!("{id} targets a node that no longer exists"))
    })?;

    let (node_id, offset) = {
        let node = node.borrow();
        let offset = node.bounds().map(|b| b.origin()).unwrap_or(Point::ORIGIN);
        (node.id(), offset)
    };

    let prepared = match &kind {
        AnimationKind::Transform(params) => transform::prepare(id, params, duration, offset)?,
        AnimationKind::Opacity(params) => opacity::prepare(id, params, duration)?,
    };

    let group = prepared
        .group
        .autoreverses(autoreverses)
        .repeat_count(repeat_count)
        .timing(timing);
    if let Err(err) = group.validate() {
        tracing::warn!(animation = %id, node = %node_id, error = %err, "keyframe group rejected");
        return Err(err);
    }

    let lifecycle = Rc::new(Cell::new(AnimationState::Idle));
    let run = Rc::new(Run {
        id,
        node_id,
        node: weak_node,
        animation: Rc::downgrade(animation),
        cache: Rc::downgrade(cache),
        state: lifecycle.clone(),
        apply: prepared.apply,
        on_done: RefCell::new(Some(Box::new(on_done))),
    });

    let progress_run = run.clone();
    let completion_run = run.clone();
    let group = group
        .on_progress(move |t| progress_run.progress(t))
        .on_completion(move |finished| completion_run.complete(finished));

    let layer = cache.layer_for(&*node.borrow());
    if let Err(err) = layer.add_animation(group, id) {
        tracing::warn!(animation = %id, node = %node_id, error = %err, "layer refused animation");
        cache.free(node_id);
        return Err(err);
    }
    lifecycle.set(AnimationState::Running);

    let handle = RemovalHandle {
        inner: Rc::new(RemovalInner {
            key: id,
            node_id,
            layer: Rc::downgrade(&layer),
            cache: Rc::downgrade(cache),
            animation: Rc::downgrade(animation),
            state: lifecycle.clone(),
            detached: Cell::new(false),
        }),
    };

    {
        let mut a = animation.borrow_mut();
        a.progress = 0.0;
        a.lifecycle = lifecycle;
        a.removal = Some(handle.clone());
    }

    tracing::debug!(
        animation = %id,
        node = %node_id,
        kind = kind.name(),
        duration,
        repeat_count,
        autoreverses,
        "animation started"
    );
    Ok(handle)
}

/// Shared state behind one run's backend hooks.
struct Run {
    id: AnimationId,
    node_id: NodeId,
    node: WeakNode,
    animation: Weak<RefCell<Animation>>,
    cache: Weak<dyn LayerCache>,
    state: Rc<Cell<AnimationState>>,
    apply: ApplyFn,
    on_done: RefCell<Option<Box<dyn FnOnce()>>>,
}

impl Run {
    fn progress(&self, t: f64) {
        if self.state.get() != AnimationState::Running {
            tracing::trace!(animation = %self.id, t, "progress after run ended ignored");
            return;
        }

        self.write_node(t);

        let Some(animation) = self.animation.upgrade() else {
            return;
        };
        let observer = {
            let mut a = animation.borrow_mut();
            a.progress = t;
            a.on_progress_update.take()
        };
        if let Some(observer) = observer {
            let mut slot = Restore::new(&animation, observer, observer_slot);
            slot.call(|observer| observer(t));
        }
    }

    fn complete(&self, finished: bool) {
        if self.state.get() != AnimationState::Running {
            tracing::debug!(
                animation = %self.id,
                state = ?self.state.get(),
                finished,
                "completion suppressed"
            );
            return;
        }
        self.state.set(AnimationState::Completed);

        // Bookkeeping first so a failing callback cannot leave stale state.
        self.write_node(1.0);
        let animation = self.animation.upgrade();
        if let Some(animation) = &animation {
            animation.borrow_mut().progress = 1.0;
        }
        if let Some(cache) = self.cache.upgrade() {
            cache.free(self.node_id);
        }
        tracing::debug!(
            animation = %self.id,
            node = %self.node_id,
            finished,
            "animation completed"
        );

        if let Some(animation) = &animation {
            let completion = animation.borrow_mut().completion.take();
            if let Some(completion) = completion {
                let mut slot = Restore::new(animation, completion, completion_slot);
                slot.call(|completion| completion());
            }
        }

        let on_done = self.on_done.borrow_mut().take();
        if let Some(on_done) = on_done {
            on_done();
        }
    }

    fn write_node(&self, t: f64) {
        let Some(node) = self.node.upgrade() else {
            tracing::trace!(animation = %self.id, node = %self.node_id, "target node dropped");
            return;
        };
        match node.try_borrow_mut() {
            Ok(mut node) => (self.apply)(&mut *node, t),
            Err(_) => {
                tracing::warn!(
                    animation = %self.id,
                    node = %self.node_id,
                    "node busy, skipped write"
                );
            }
        }
    }
}

type ObserverFn = Box<dyn FnMut(f64)>;
type CompletionFn = Box<dyn FnMut()>;

fn observer_slot(a: &mut Animation) -> &mut Option<ObserverFn> {
    &mut a.on_progress_update
}

fn completion_slot(a: &mut Animation) -> &mut Option<CompletionFn> {
    &mut a.completion
}

/// A user callback taken out of its animation for the duration of a call.
///
/// Dropping puts the callback back, also when the call unwinds, unless the
/// callback installed a replacement meanwhile.
struct Restore<'a, F> {
    animation: &'a RefCell<Animation>,
    callback: Option<F>,
    slot: fn(&mut Animation) -> &mut Option<F>,
}

impl<'a, F> Restore<'a, F> {
    fn new(
        animation: &'a RefCell<Animation>,
        callback: F,
        slot: fn(&mut Animation) -> &mut Option<F>,
    ) -> Self {
        Self {
            animation,
            callback: Some(callback),
            slot,
        }
    }

    fn call(&mut self, invoke: impl FnOnce(&mut F)) {
        if let Some(callback) = self.callback.as_mut() {
            invoke(callback);
        }
    }
}

impl<F> Drop for Restore<'_, F> {
    fn drop(&mut self) {
        let Some(callback) = self.callback.take() else {
            return;
        };
        let Ok(mut a) = self.animation.try_borrow_mut() else {
            tracing::warn!("animation busy, callback dropped");
            return;
        };
        let slot = (self.slot)(&mut *a);
        if slot.is_none() {
            *slot = Some(callback);
        }
    }
}

/// Detaches one animation run from its layer.
///
/// Cloning shares the same handle; only the first [`remove`](Self::remove)
/// across all clones has any effect.
#[derive(Clone)]
pub struct RemovalHandle {
    inner: Rc<RemovalInner>,
}

struct RemovalInner {
    key: AnimationId,
    node_id: NodeId,
    layer: Weak<dyn Layer>,
    cache: Weak<dyn LayerCache>,
    animation: Weak<RefCell<Animation>>,
    state: Rc<Cell<AnimationState>>,
    detached: Cell<bool>,
}

impl RemovalInner {
    /// Whether the animation has been restarted since this run began. The
    /// newer run is registered under the same key and must stay attached.
    fn superseded(&self) -> bool {
        self.animation.upgrade().is_some_and(|animation| {
            animation
                .try_borrow()
                .is_ok_and(|a| !Rc::ptr_eq(&a.lifecycle, &self.state))
        })
    }
}

impl RemovalHandle {
    /// Remove the animation from its layer.
    ///
    /// A running animation becomes `Removed` and its hold on the cached layer
    /// is released; its completion sequence will not run. Removing after
    /// completion only detaches the held final frame. Returns `true` on the
    /// first call, `false` afterwards. A handle from a run that was replaced
    /// by a restart leaves the layer alone.
    pub fn remove(&self) -> bool {
        let inner = &self.inner;
        if inner.detached.replace(true) {
            return false;
        }

        if !inner.superseded() {
            if let Some(layer) = inner.layer.upgrade() {
                layer.remove_animation(inner.key);
            }
        }

        if inner.state.get() == AnimationState::Running {
            inner.state.set(AnimationState::Removed);
            if let Some(cache) = inner.cache.upgrade() {
                cache.free(inner.node_id);
            }
        }

        tracing::debug!(animation = %inner.key, node = %inner.node_id, "animation removed");
        true
    }

    /// Key the animation is registered under.
    pub fn key(&self) -> AnimationId {
        self.inner.key
    }

    pub fn state(&self) -> AnimationState {
        self.inner.state.get()
    }

    pub fn is_removed(&self) -> bool {
        self.inner.detached.get()
    }
}

impl fmt::Debug for RemovalHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemovalHandle")
            .field("key", &self.inner.key)
            .field("node", &self.inner.node_id)
            .field("state", &self.inner.state.get())
            .field("detached", &self.inner.detached.get())
            .finish()
    }
}
