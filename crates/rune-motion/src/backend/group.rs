//! Keyframe group: the object handed to a layer for playback.
//!
//! A group bundles one or more [`KeyframeTrack`]s that share a duration with
//! playback metadata (autoreverse, repeat count, timing curve, fill mode) and
//! two hooks the backend calls while playing:
//! - `progress(t)` on every tick, with the eased local time `t`
//! - `completion(finished)` once playback stops
//!
//! # Example
//!
//! ```
//! use rune_motion::backend::{KeyPath, KeyframeGroup, KeyframeTrack, TimingCurve};
//!
//! let group = KeyframeGroup::new(0.5)
//!     .track(KeyframeTrack::new(KeyPath::Opacity, vec![0.0, 1.0], vec![0.0, 0.5]))
//!     .autoreverses(true)
//!     .repeat_count(2.0)
//!     .timing(TimingCurve::EaseOut);
//! assert!(group.validate().is_ok());
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::rc::Rc;

use super::timing::TimingCurve;
use crate::error::{MotionError, Result};
use crate::tracks::{ScalarTrack, TrackSet};

/// Called with the eased local time of the group on each tick.
pub type ProgressHook = Rc<dyn Fn(f64)>;

/// Called once when playback stops; `true` if it ran to the end.
pub type CompletionHook = Rc<dyn Fn(bool)>;

/// Layer property a track drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyPath {
    TranslationX,
    TranslationY,
    ScaleX,
    ScaleY,
    RotationZ,
    Opacity,
}

impl KeyPath {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TranslationX => "transform.translation.x",
            Self::TranslationY => "transform.translation.y",
            Self::ScaleX => "transform.scale.x",
            Self::ScaleY => "transform.scale.y",
            Self::RotationZ => "transform.rotation.z",
            Self::Opacity => "opacity",
        }
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the layer presents outside the group's active time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillMode {
    /// Drop back to the layer's model values once playback ends.
    Removed,
    /// Hold the final presented values after playback ends.
    #[default]
    Forwards,
}

/// Values for one key path at normalized key times.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyframeTrack {
    pub key_path: KeyPath,
    pub values: Vec<f64>,
    pub key_times: Vec<f64>,
}

impl KeyframeTrack {
    pub fn new(key_path: KeyPath, values: Vec<f64>, key_times: Vec<f64>) -> Self {
        Self {
            key_path,
            values,
            key_times,
        }
    }

    /// Linearly interpolated value at normalized time `t`.
    ///
    /// Before the first key time the first value applies; past the last key
    /// time the last value is held.
    pub fn sample(&self, t: f64) -> Option<f64> {
        let first = *self.values.first()?;
        let idx = self.key_times.partition_point(|k| *k <= t);
        if idx == 0 {
            return Some(first);
        }
        if idx >= self.key_times.len() {
            return self.values.last().copied();
        }

        let (t0, t1) = (self.key_times[idx - 1], self.key_times[idx]);
        let (v0, v1) = (self.values[idx - 1], self.values[idx]);
        let span = t1 - t0;
        if span <= 0.0 {
            return Some(v1);
        }
        Some(v0 + (v1 - v0) * ((t - t0) / span))
    }

    fn validate(&self) -> Result<()> {
        let path = self.key_path;
        if self.values.is_empty() {
            return Err(MotionError::backend_submission(format!(
                "track {path} has no keyframes"
            )));
        }
        if self.values.len() != self.key_times.len() {
            return Err(MotionError::backend_submission(format!(
                "track {path} has {} values but {} key times",
                self.values.len(),
                self.key_times.len()
            )));
        }
        if !self.key_times.iter().all(|k| (0.0..=1.0).contains(k)) {
            return Err(MotionError::backend_submission(format!(
                "track {path} has key times outside [0, 1]"
            )));
        }
        if !self.key_times.windows(2).all(|w| w[0] <= w[1]) {
            return Err(MotionError::backend_submission(format!(
                "track {path} key times must be sorted"
            )));
        }
        if !self.values.iter().all(|v| v.is_finite()) {
            return Err(MotionError::backend_submission(format!(
                "track {path} has non-finite values"
            )));
        }
        Ok(())
    }
}

/// A set of tracks played together on one layer.
#[derive(Clone)]
pub struct KeyframeGroup {
    pub tracks: Vec<KeyframeTrack>,
    /// Duration of one forward pass in seconds.
    pub duration: f64,
    pub autoreverses: bool,
    /// Number of cycles; `0` plays once, fractional values stop mid-cycle,
    /// `f64::INFINITY` repeats forever.
    pub repeat_count: f64,
    pub timing: TimingCurve,
    pub fill_mode: FillMode,
    pub removed_on_completion: bool,
    progress: Option<ProgressHook>,
    completion: Option<CompletionHook>,
}

impl fmt::Debug for KeyframeGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyframeGroup")
            .field("tracks", &self.tracks)
            .field("duration", &self.duration)
            .field("autoreverses", &self.autoreverses)
            .field("repeat_count", &self.repeat_count)
            .field("timing", &self.timing)
            .field("fill_mode", &self.fill_mode)
            .field("removed_on_completion", &self.removed_on_completion)
            .field("has_progress_hook", &self.progress.is_some())
            .field("has_completion_hook", &self.completion.is_some())
            .finish()
    }
}

impl KeyframeGroup {
    /// Empty group that holds its final values and stays attached after
    /// completion.
    pub fn new(duration: f64) -> Self {
        Self {
            tracks: Vec::new(),
            duration,
            autoreverses: false,
            repeat_count: 0.0,
            timing: TimingCurve::Linear,
            fill_mode: FillMode::Forwards,
            removed_on_completion: false,
            progress: None,
            completion: None,
        }
    }

    /// Group with the five transform channels of `tracks`.
    pub fn from_track_set(tracks: &TrackSet) -> Self {
        let times = tracks.times();
        let channel = |key_path, values: &[f64]| {
            KeyframeTrack::new(key_path, values.to_vec(), times.to_vec())
        };

        Self::new(tracks.duration())
            .track(channel(KeyPath::TranslationX, tracks.translate_x()))
            .track(channel(KeyPath::TranslationY, tracks.translate_y()))
            .track(channel(KeyPath::ScaleX, tracks.scale_x()))
            .track(channel(KeyPath::ScaleY, tracks.scale_y()))
            .track(channel(KeyPath::RotationZ, tracks.rotation()))
    }

    /// Group with a single scalar channel on `key_path`.
    pub fn from_scalar_track(key_path: KeyPath, track: ScalarTrack) -> Self {
        Self::new(track.duration).track(KeyframeTrack::new(key_path, track.values, track.times))
    }

    pub fn track(mut self, track: KeyframeTrack) -> Self {
        self.tracks.push(track);
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

    pub fn on_progress(mut self, hook: impl Fn(f64) + 'static) -> Self {
        self.progress = Some(Rc::new(hook));
        self
    }

    pub fn on_completion(mut self, hook: impl Fn(bool) + 'static) -> Self {
        self.completion = Some(Rc::new(hook));
        self
    }

    pub fn progress_hook(&self) -> Option<ProgressHook> {
        self.progress.clone()
    }

    pub fn completion_hook(&self) -> Option<CompletionHook> {
        self.completion.clone()
    }

    /// Length of one cycle: a forward pass, plus the reverse pass when
    /// autoreversing.
    pub fn cycle_duration(&self) -> f64 {
        if self.autoreverses {
            self.duration * 2.0
        } else {
            self.duration
        }
    }

    /// Total active time in seconds; infinite for endless repeats.
    pub fn active_duration(&self) -> f64 {
        let cycles = if self.repeat_count > 0.0 {
            self.repeat_count
        } else {
            1.0
        };
        self.cycle_duration() * cycles
    }

    /// Normalized forward time at `elapsed` seconds into the active period,
    /// before the timing curve is applied.
    pub fn local_time(&self, elapsed: f64) -> f64 {
        let active = self.active_duration();
        if elapsed >= active {
            return self.end_time();
        }

        let cycle = self.cycle_duration();
        let position = elapsed.max(0.0) % cycle;
        let forward = position / self.duration;
        if forward > 1.0 {
            2.0 - forward
        } else {
            forward
        }
    }

    /// Local time at which playback comes to rest.
    fn end_time(&self) -> f64 {
        let cycles = if self.repeat_count > 0.0 {
            self.repeat_count
        } else {
            1.0
        };
        if !self.autoreverses {
            let frac = cycles.fract();
            return if frac == 0.0 { 1.0 } else { frac };
        }

        // Each cycle is a forward and a reverse half.
        let halves = cycles * 2.0;
        let frac = halves.fract();
        let whole = halves.floor() as u64;
        let in_reverse = whole % 2 == 1;
        match (frac == 0.0, in_reverse) {
            (true, true) => 1.0,
            (true, false) => 0.0,
            (false, false) => frac,
            (false, true) => 1.0 - frac,
        }
    }

    /// Value of `key_path` at eased time `t`, if the group drives it.
    pub fn sample(&self, key_path: KeyPath, t: f64) -> Option<f64> {
        self.tracks
            .iter()
            .find(|track| track.key_path == key_path)
            .and_then(|track| track.sample(t))
    }

    /// Check the group is playable.
    pub fn validate(&self) -> Result<()> {
        if !self.duration.is_finite() || self.duration <= 0.0 {
            return Err(MotionError::backend_submission(format!(
                "group duration must be positive, got {}",
                self.duration
            )));
        }
        if self.repeat_count.is_nan() || self.repeat_count < 0.0 {
            return Err(MotionError::backend_submission(format!(
                "repeat count must be non-negative, got {}",
                self.repeat_count
            )));
        }
        if self.tracks.is_empty() {
            return Err(MotionError::backend_submission("group has no tracks"));
        }

        for (i, track) in self.tracks.iter().enumerate() {
            track.validate()?;
            if self.tracks[..i].iter().any(|t| t.key_path == track.key_path) {
                return Err(MotionError::backend_submission(format!(
                    "duplicate track for {}",
                    track.key_path
                )));
            }
        }
        Ok(())
    }
}
