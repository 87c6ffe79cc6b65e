//! Timing curves applied by the compositor to an animation's local time.
//!
//! The runner treats a [`TimingCurve`] as an opaque value and passes it
//! through to the backend; only the compositor evaluates it.
//!
//! ```
//! use rune_motion::backend::TimingCurve;
//!
//! let eased = TimingCurve::EaseInEaseOut.evaluate(0.5);
//! assert!((eased - 0.5).abs() < 1e-3);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{MotionError, Result};

/// Monotonic mapping from linear local time to eased time, both in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TimingCurve {
    /// No easing.
    #[default]
    Linear,
    /// `cubic-bezier(0.42, 0, 1, 1)`
    EaseIn,
    /// `cubic-bezier(0, 0, 0.58, 1)`
    EaseOut,
    /// `cubic-bezier(0.42, 0, 0.58, 1)`
    EaseInEaseOut,
    /// Custom curve through control points `(x1, y1)` and `(x2, y2)`.
    CubicBezier { x1: f64, y1: f64, x2: f64, y2: f64 },
}

impl TimingCurve {
    /// Custom cubic bezier. The x coordinates must lie in `[0, 1]` so the
    /// curve stays a function of time.
    pub fn cubic_bezier(x1: f64, y1: f64, x2: f64, y2: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&x1) || !(0.0..=1.0).contains(&x2) {
            return Err(MotionError::invalid_parameter(format!(
                "bezier x control points must be in [0, 1], got {x1} and {x2}"
            )));
        }
        Ok(Self::CubicBezier { x1, y1, x2, y2 })
    }

    /// Evaluate at `t`, clamped to `[0, 1]`.
    pub fn evaluate(&self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match *self {
            Self::Linear => t,
            Self::EaseIn => cubic_bezier(0.42, 0.0, 1.0, 1.0, t),
            Self::EaseOut => cubic_bezier(0.0, 0.0, 0.58, 1.0, t),
            Self::EaseInEaseOut => cubic_bezier(0.42, 0.0, 0.58, 1.0, t),
            Self::CubicBezier { x1, y1, x2, y2 } => cubic_bezier(x1, y1, x2, y2, t),
        }
    }
}

/// Evaluate the curve's y at the parameter whose x equals `progress`.
fn cubic_bezier(x1: f64, y1: f64, x2: f64, y2: f64, progress: f64) -> f64 {
    if progress <= 0.0 {
        return 0.0;
    }
    if progress >= 1.0 {
        return 1.0;
    }

    let t = solve_bezier_x(x1, x2, progress);
    bezier_component(y1, y2, t)
}

/// Newton-Raphson on x(t), falling back to bisection when the slope flattens.
fn solve_bezier_x(x1: f64, x2: f64, target_x: f64) -> f64 {
    let mut t = target_x;
    for _ in 0..8 {
        let x = bezier_component(x1, x2, t) - target_x;
        if x.abs() < 1e-9 {
            return t;
        }
        let dx = bezier_derivative(x1, x2, t);
        if dx.abs() < 1e-9 {
            break;
        }
        t = (t - x / dx).clamp(0.0, 1.0);
    }

    let (mut lo, mut hi) = (0.0, 1.0);
    t = target_x;
    for _ in 0..32 {
        let x = bezier_component(x1, x2, t);
        if (x - target_x).abs() < 1e-9 {
            break;
        }
        if x < target_x {
            lo = t;
        } else {
            hi = t;
        }
        t = (lo + hi) * 0.5;
    }
    t
}

/// `3(1-t)²t·p1 + 3(1-t)t²·p2 + t³`
#[inline]
fn bezier_component(p1: f64, p2: f64, t: f64) -> f64 {
    let mt = 1.0 - t;
    3.0 * mt * mt * t * p1 + 3.0 * mt * t * t * p2 + t * t * t
}

#[inline]
fn bezier_derivative(p1: f64, p2: f64, t: f64) -> f64 {
    let mt = 1.0 - t;
    3.0 * mt * mt * p1 + 6.0 * mt * t * (p2 - p1) + 3.0 * t * t * (1.0 - p2)
}
