use std::cell::{Cell, RefCell};
use std::f64::consts::FRAC_PI_2;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::Rc;

use anyhow::Result;
use rune_motion::layer::LayerCache;
use rune_motion::{
    Animation, AnimationState, Compositor, Node, Rect, SceneNode, SharedAnimation, TimingCurve,
    Transform,
};

const EPSILON: f64 = 1e-9;
const FRAME: f64 = 1.0 / 60.0;

fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < EPSILON
}

fn start(
    compositor: &Rc<Compositor>,
    animation: &SharedAnimation,
    done: &Rc<Cell<usize>>,
) -> rune_motion::Result<rune_motion::RemovalHandle> {
    let cache: Rc<dyn LayerCache> = compositor.clone();
    let done = done.clone();
    rune_motion::start(animation, &cache, move || done.set(done.get() + 1))
}

#[test]
fn scale_ramp_plays_to_completion() -> Result<()> {
    let compositor = Rc::new(Compositor::new());
    let node = SceneNode::new(None).into_shared();
    let node_id = node.borrow().id();
    let done = Rc::new(Cell::new(0));
    let animation = Animation::transform(|t| Transform::scale(1.0 + t, 1.0 + t), 1.0)
        .target(&node)
        .into_shared();

    start(&compositor, &animation, &done)?;
    assert_eq!(compositor.hold_count(node_id), 1);

    compositor.tick(0.5);
    let presented = compositor.presentation(node_id).expect("layer while playing");
    assert!(approx_eq(presented.scale_x, 1.5));
    assert!(approx_eq(presented.scale_y, 1.5));
    assert!(approx_eq(node.borrow().transform.get().m11, 1.5));
    assert!(approx_eq(animation.borrow().progress(), 0.5));

    compositor.run_until_idle(FRAME, 600);

    assert_eq!(node.borrow().transform.get(), Transform::scale(2.0, 2.0));
    assert_eq!(animation.borrow().progress(), 1.0);
    assert_eq!(animation.borrow().state(), AnimationState::Completed);
    assert_eq!(done.get(), 1);
    assert!(!compositor.is_cached(node_id));
    Ok(())
}

#[test]
fn rotation_track_is_presented_mid_flight() -> Result<()> {
    let compositor = Rc::new(Compositor::new());
    let node = SceneNode::new(None).into_shared();
    let node_id = node.borrow().id();
    let done = Rc::new(Cell::new(0));
    let animation = Animation::transform(|t| Transform::rotate(FRAC_PI_2 * t), 1.0)
        .target(&node)
        .logical_fps(4)
        .into_shared();

    start(&compositor, &animation, &done)?;
    compositor.tick(0.5);

    let presented = compositor.presentation(node_id).expect("layer while playing");
    assert!(approx_eq(presented.rotation, FRAC_PI_2 / 2.0));

    compositor.run_until_idle(0.25, 10);
    let final_transform = node.borrow().transform.get();
    assert!(approx_eq(final_transform.rotation_angle(), FRAC_PI_2));
    Ok(())
}

#[test]
fn translation_is_offset_by_node_origin() -> Result<()> {
    let compositor = Rc::new(Compositor::new());
    let node = SceneNode::new(Some(Rect::new(10.0, 20.0, 50.0, 50.0))).into_shared();
    let node_id = node.borrow().id();
    let done = Rc::new(Cell::new(0));
    let animation = Animation::transform(|t| Transform::translate(40.0 * t, 0.0), 1.0)
        .target(&node)
        .logical_fps(10)
        .into_shared();

    start(&compositor, &animation, &done)?;
    compositor.tick(0.5);

    let presented = compositor.presentation(node_id).expect("layer while playing");
    assert!(approx_eq(presented.translate_x, 30.0));
    assert!(approx_eq(presented.translate_y, 20.0));
    // The node itself receives the untranslated function value.
    assert!(approx_eq(node.borrow().transform.get().dx, 20.0));
    Ok(())
}

#[test]
fn autoreversing_run_still_snaps_to_end_value() -> Result<()> {
    let compositor = Rc::new(Compositor::new());
    let node = SceneNode::new(None).into_shared();
    let done = Rc::new(Cell::new(0));
    let progress = Rc::new(RefCell::new(Vec::new()));
    let observed = progress.clone();
    let animation = Animation::opacity(|t| 1.0 - t, 0.5)
        .target(&node)
        .autoreverses(true)
        .repeat_count(2.0)
        .on_progress_update(move |t| observed.borrow_mut().push(t))
        .into_shared();

    start(&compositor, &animation, &done)?;
    let ticks = compositor.run_until_idle(0.25, 100);

    assert_eq!(ticks, 8);
    let progress = progress.borrow();
    assert_eq!(progress.len(), 8);
    assert!(approx_eq(progress[1], 1.0));
    assert!(approx_eq(progress[3], 0.0));
    assert_eq!(node.borrow().opacity.get(), 0.0);
    assert_eq!(animation.borrow().progress(), 1.0);
    assert_eq!(done.get(), 1);
    Ok(())
}

#[test]
fn removal_mid_flight_releases_layer_and_skips_completion() -> Result<()> {
    let compositor = Rc::new(Compositor::new());
    let node = SceneNode::new(None).into_shared();
    let node_id = node.borrow().id();
    let done = Rc::new(Cell::new(0));
    let completed = Rc::new(Cell::new(false));
    let flag = completed.clone();
    let animation = Animation::opacity(|t| t, 1.0)
        .target(&node)
        .timing(TimingCurve::EaseInEaseOut)
        .on_completion(move || flag.set(true))
        .into_shared();

    let handle = start(&compositor, &animation, &done)?;
    compositor.tick(0.25);
    let mirrored = node.borrow().opacity.get();

    assert!(handle.remove());
    assert!(!compositor.is_cached(node_id));
    compositor.run_until_idle(0.25, 10);
    compositor.tick(1.0);

    assert!(!completed.get());
    assert_eq!(done.get(), 0);
    assert_eq!(animation.borrow().state(), AnimationState::Removed);
    assert_eq!(node.borrow().opacity.get(), mirrored);
    Ok(())
}

#[test]
fn restart_displaces_previous_run() -> Result<()> {
    let compositor = Rc::new(Compositor::new());
    let node = SceneNode::new(None).into_shared();
    let node_id = node.borrow().id();
    let done = Rc::new(Cell::new(0));
    let completions = Rc::new(Cell::new(0));
    let counter = completions.clone();
    let animation = Animation::opacity(|t| t, 1.0)
        .target(&node)
        .on_completion(move || counter.set(counter.get() + 1))
        .into_shared();

    let first = start(&compositor, &animation, &done)?;
    compositor.tick(0.25);
    let second = start(&compositor, &animation, &done)?;

    // The displaced run completes unfinished and gives back its hold.
    assert_eq!(first.state(), AnimationState::Completed);
    assert_eq!(second.state(), AnimationState::Running);
    assert_eq!(completions.get(), 1);
    assert_eq!(compositor.hold_count(node_id), 1);
    assert_eq!(animation.borrow().progress(), 0.0);

    // Removing through the stale handle leaves the new run playing.
    assert!(first.remove());
    assert!(compositor.has_active_animations());

    compositor.run_until_idle(0.25, 10);
    assert_eq!(completions.get(), 2);
    assert_eq!(done.get(), 2);
    assert!(!compositor.is_cached(node_id));
    Ok(())
}

#[test]
fn dropped_node_stops_receiving_values() -> Result<()> {
    let compositor = Rc::new(Compositor::new());
    let node = SceneNode::new(None).into_shared();
    let done = Rc::new(Cell::new(0));
    let animation = Animation::opacity(|t| t, 1.0).target(&node).into_shared();

    start(&compositor, &animation, &done)?;
    compositor.tick(0.25);
    drop(node);
    compositor.run_until_idle(0.25, 10);

    assert_eq!(animation.borrow().state(), AnimationState::Completed);
    assert_eq!(done.get(), 1);
    assert_eq!(compositor.layer_count(), 0);
    Ok(())
}

#[test]
fn animations_on_one_node_share_its_layer() -> Result<()> {
    let compositor = Rc::new(Compositor::new());
    let node = SceneNode::new(None).into_shared();
    let node_id = node.borrow().id();
    let done = Rc::new(Cell::new(0));
    let grow = Animation::transform(|t| Transform::scale(1.0 + t, 1.0 + t), 0.5)
        .target(&node)
        .into_shared();
    let fade = Animation::opacity(|t| 1.0 - t, 1.0).target(&node).into_shared();

    start(&compositor, &grow, &done)?;
    start(&compositor, &fade, &done)?;
    assert_eq!(compositor.layer_count(), 1);
    assert_eq!(compositor.hold_count(node_id), 2);

    compositor.tick(0.5);
    assert_eq!(grow.borrow().state(), AnimationState::Completed);
    assert_eq!(compositor.hold_count(node_id), 1);
    let presented = compositor.presentation(node_id).expect("fade still holds the layer");
    // The finished group holds its last sample, one frame short of t = 1.
    assert!(approx_eq(presented.scale_x, 1.0 + 14.0 / 15.0));
    assert!(approx_eq(presented.opacity, 0.5));

    compositor.run_until_idle(0.25, 10);
    assert_eq!(done.get(), 2);
    assert!(!compositor.is_cached(node_id));
    Ok(())
}

#[test]
fn failing_completion_callback_leaves_no_stale_layer() -> Result<()> {
    let compositor = Rc::new(Compositor::new());
    let node = SceneNode::new(None).into_shared();
    let node_id = node.borrow().id();
    let done = Rc::new(Cell::new(0));
    let animation = Animation::transform(|t| Transform::scale(1.0 + t, 1.0 + t), 0.5)
        .target(&node)
        .on_completion(|| panic!("completion callback failed"))
        .into_shared();

    start(&compositor, &animation, &done)?;
    let outcome = catch_unwind(AssertUnwindSafe(|| compositor.run_until_idle(FRAME, 600)));

    assert!(outcome.is_err());
    assert_eq!(compositor.hold_count(node_id), 0);
    assert!(!compositor.is_cached(node_id));
    assert_eq!(node.borrow().transform.get(), Transform::scale(2.0, 2.0));
    assert_eq!(animation.borrow().progress(), 1.0);
    assert_eq!(animation.borrow().state(), AnimationState::Completed);
    Ok(())
}
