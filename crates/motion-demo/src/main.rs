use std::cell::Cell;
use std::f64::consts::FRAC_PI_2;
use std::rc::Rc;

use anyhow::Result;
use rune_config::{RuneConfig, TimingName};
use rune_motion::layer::LayerCache;
use rune_motion::{Animation, Compositor, Node, Rect, SceneNode, TimingCurve, Transform};
use tracing_subscriber::EnvFilter;

/// Upper bound on demo playback, in seconds of compositor time.
const MAX_PLAYBACK_SECS: u32 = 60;

fn main() -> Result<()> {
    let config = RuneConfig::load();
    init_tracing(&config)?;

    let motion = &config.motion;
    let compositor = Rc::new(Compositor::new());
    let cache: Rc<dyn LayerCache> = compositor.clone();

    // Spinning card: quarter turn while growing to twice its size.
    let card = SceneNode::new(Some(Rect::new(40.0, 40.0, 100.0, 100.0))).into_shared();
    let card_id = card.borrow().id();
    let spin = Animation::transform(
        |t| Transform::rotate(FRAC_PI_2 * t).then(&Transform::scale(1.0 + t, 1.0 + t)),
        motion.duration,
    )
    .target(&card)
    .logical_fps(motion.default_fps)
    .repeat_count(motion.repeat_count)
    .autoreverses(motion.autoreverses)
    .timing(timing_curve(motion.timing))
    .on_progress_update(|t| tracing::trace!(t, "spin progress"))
    .on_completion(|| tracing::info!("spin finished"))
    .into_shared();

    // Fading badge, removed half way through.
    let badge = SceneNode::new(Some(Rect::new(200.0, 40.0, 24.0, 24.0))).into_shared();
    let fade = Animation::opacity(|t| 1.0 - t, motion.duration)
        .target(&badge)
        .logical_fps(motion.default_fps)
        .on_completion(|| tracing::info!("fade finished"))
        .into_shared();

    let spins_done = Rc::new(Cell::new(0u32));
    let counter = spins_done.clone();
    rune_motion::start(&spin, &cache, move || counter.set(counter.get() + 1))?;
    let fade_handle = rune_motion::start(&fade, &cache, || {})?;

    let dt = motion.tick_interval();
    let remove_at = removal_tick(motion.duration, dt);
    let report_every = (motion.tick_hz / 4).max(1) as usize;
    let max_ticks = (MAX_PLAYBACK_SECS * motion.tick_hz.max(1)) as usize;

    let mut ticks = 0;
    while compositor.has_active_animations() && ticks < max_ticks {
        compositor.tick(dt);
        ticks += 1;

        if ticks == remove_at && fade_handle.remove() {
            tracing::info!(
                opacity = badge.borrow().opacity.get(),
                "badge fade removed"
            );
        }
        if ticks % report_every == 0 {
            if let Some(p) = compositor.presentation(card_id) {
                tracing::info!(
                    now = compositor.now(),
                    x = p.translate_x,
                    y = p.translate_y,
                    scale_x = p.scale_x,
                    scale_y = p.scale_y,
                    rotation = p.rotation,
                    "card presented"
                );
            }
        }
    }

    let card = card.borrow();
    let final_transform = card.transform.get();
    tracing::info!(
        ticks,
        spins_done = spins_done.get(),
        state = ?spin.borrow().state(),
        progress = spin.borrow().progress(),
        rotation = final_transform.rotation_angle(),
        determinant = final_transform.determinant(),
        writes = card.transform.revision(),
        "playback finished"
    );
    if ticks >= max_ticks {
        tracing::warn!(max_ticks, "playback stopped before animations went idle");
    }
    Ok(())
}

fn init_tracing(config: &RuneConfig) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.logging.filter)?,
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
    Ok(())
}

/// Tick at which the fade is removed, half way through and never before the first tick.
fn removal_tick(duration: f64, dt: f64) -> usize {
    ((duration / 2.0 / dt).round() as usize).max(1)
}

fn timing_curve(name: TimingName) -> TimingCurve {
    match name {
        TimingName::Linear => TimingCurve::Linear,
        TimingName::EaseIn => TimingCurve::EaseIn,
        TimingName::EaseOut => TimingCurve::EaseOut,
        TimingName::EaseInOut => TimingCurve::EaseInEaseOut,
    }
}
