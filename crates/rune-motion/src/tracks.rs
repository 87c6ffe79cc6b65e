//! Sampling of time-parameterized values into keyframe tracks.
//!
//! A value function is evaluated on the half-open stride
//! `t = 0, Δt, 2Δt, ... < 1` with `Δt = 1 / (duration * fps)`. The endpoint
//! `t = 1` is never sampled; the backend holds the last sample forward until
//! playback ends.
//!
//! For transforms every sample is decomposed into five channels. Translation
//! and scale come from the bounding box of the unit square under the sampled
//! transform, rotation from `atan2(m12, m11)`. Under rotation the bounding box
//! is wider than the true scale factor; the backend's translate/scale/rotate
//! channels reproduce the sampled transform with that approximation, so it is
//! kept as is.

use serde::{Deserialize, Serialize};

use crate::error::{MotionError, Result};
use crate::geometry::{Point, Rect, Transform, normalize_angle};

/// Default logical sample rate for generated tracks.
pub const DEFAULT_FPS: u32 = 30;

/// Five time-aligned transform channels plus their shared key times.
///
/// Every sequence has the same length, at least one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackSet {
    translate_x: Vec<f64>,
    translate_y: Vec<f64>,
    scale_x: Vec<f64>,
    scale_y: Vec<f64>,
    rotation: Vec<f64>,
    times: Vec<f64>,
    duration: f64,
}

impl TrackSet {
    pub fn translate_x(&self) -> &[f64] {
        &self.translate_x
    }

    pub fn translate_y(&self) -> &[f64] {
        &self.translate_y
    }

    pub fn scale_x(&self) -> &[f64] {
        &self.scale_x
    }

    pub fn scale_y(&self) -> &[f64] {
        &self.scale_y
    }

    /// Rotation in radians, see [`normalize_angle`].
    pub fn rotation(&self) -> &[f64] {
        &self.rotation
    }

    /// Normalized sample times in `[0, 1)`.
    pub fn times(&self) -> &[f64] {
        &self.times
    }

    /// Playback duration in seconds.
    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// Number of samples per channel.
    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }
}

/// A single sampled channel, e.g. opacity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalarTrack {
    pub values: Vec<f64>,
    pub times: Vec<f64>,
    pub duration: f64,
}

/// Upper bound on samples per channel.
pub const MAX_SAMPLES: usize = 1 << 20;

/// Sample times for `duration` seconds at `fps` samples per second.
///
/// Returns `ceil(duration * fps)` times; sample `i` is `i / (duration * fps)`
/// so the stride never accumulates rounding error into an extra sample.
pub fn sample_times(duration: f64, fps: u32) -> Result<Vec<f64>> {
    if !duration.is_finite() || duration <= 0.0 {
        return Err(MotionError::invalid_parameter(format!(
            "duration must be a positive number of seconds, got {duration}"
        )));
    }
    if fps == 0 {
        return Err(MotionError::invalid_parameter(
            "sample rate must be at least 1 fps",
        ));
    }

    let frames = duration * f64::from(fps);
    if !frames.is_finite() || frames > MAX_SAMPLES as f64 {
        return Err(MotionError::invalid_parameter(format!(
            "duration {duration}s at {fps} fps exceeds {MAX_SAMPLES} samples"
        )));
    }

    let count = (frames.ceil() as usize).max(1);
    Ok((0..count)
        .map(|i| i as f64 / frames)
        .take_while(|t| *t < 1.0)
        .collect())
}

/// Sample a transform function into translate/scale/rotation channels.
///
/// `offset` is added to every translation sample; callers pass the target
/// node's bounds origin.
pub fn build_tracks<F>(value_fn: F, duration: f64, offset: Point, fps: u32) -> Result<TrackSet>
where
    F: Fn(f64) -> Transform,
{
    let times = sample_times(duration, fps)?;
    let n = times.len();

    let mut tracks = TrackSet {
        translate_x: Vec::with_capacity(n),
        translate_y: Vec::with_capacity(n),
        scale_x: Vec::with_capacity(n),
        scale_y: Vec::with_capacity(n),
        rotation: Vec::with_capacity(n),
        times: Vec::with_capacity(n),
        duration,
    };

    let unit = Rect::unit();
    for t in times {
        let transform = value_fn(t);
        let bounds = transform.apply_rect(&unit);

        tracks.translate_x.push(bounds.x + offset.x);
        tracks.translate_y.push(bounds.y + offset.y);
        tracks.scale_x.push(bounds.width);
        tracks.scale_y.push(bounds.height);
        tracks.rotation.push(normalize_angle(transform.rotation_angle()));
        tracks.times.push(t);
    }

    tracing::debug!(samples = n, duration, fps, "built transform tracks");
    Ok(tracks)
}

/// Sample a scalar function on the same stride as [`build_tracks`].
pub fn build_scalar_track<F>(value_fn: F, duration: f64, fps: u32) -> Result<ScalarTrack>
where
    F: Fn(f64) -> f64,
{
    let times = sample_times(duration, fps)?;
    let values = times.iter().map(|&t| value_fn(t)).collect();
    Ok(ScalarTrack {
        values,
        times,
        duration,
    })
}
