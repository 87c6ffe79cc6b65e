//! 2D affine geometry used by the track builder.
//!
//! `Transform` stores the linear part as `m11, m12, m21, m22` and the
//! translation as `dx, dy`:
//! ```text
//! | m11  m21  dx |
//! | m12  m22  dy |
//! |  0    0    1 |
//! ```
//! A point maps as `x' = m11*x + m21*y + dx`, `y' = m12*x + m22*y + dy`.
//!
//! # Usage
//!
//! ```
//! use rune_motion::geometry::{Rect, Transform};
//!
//! let t = Transform::translate(10.0, 0.0).then(&Transform::scale(2.0, 2.0));
//! let (x, y) = t.apply_point(1.0, 1.0);
//! assert_eq!((x, y), (12.0, 2.0));
//!
//! let bbox = Transform::scale(2.0, 3.0).apply_rect(&Rect::unit());
//! assert_eq!((bbox.width, bbox.height), (2.0, 3.0));
//! ```

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Tolerance below which a negative angle is still treated as zero by
/// [`normalize_angle`].
pub const ANGLE_EPSILON: f64 = 1e-25;

/// A 2D affine transformation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub m11: f64,
    pub m12: f64,
    pub m21: f64,
    pub m22: f64,
    pub dx: f64,
    pub dy: f64,
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

impl Transform {
    pub const fn new(m11: f64, m12: f64, m21: f64, m22: f64, dx: f64, dy: f64) -> Self {
        Self {
            m11,
            m12,
            m21,
            m22,
            dx,
            dy,
        }
    }

    pub const fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, 0.0, 0.0)
    }

    pub const fn translate(dx: f64, dy: f64) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, dx, dy)
    }

    pub const fn scale(sx: f64, sy: f64) -> Self {
        Self::new(sx, 0.0, 0.0, sy, 0.0, 0.0)
    }

    /// Rotation by `angle` radians (counter-clockwise in a y-up frame).
    pub fn rotate(angle: f64) -> Self {
        let (sin, cos) = angle.sin_cos();
        Self::new(cos, sin, -sin, cos, 0.0, 0.0)
    }

    pub fn rotate_deg(angle_deg: f64) -> Self {
        Self::rotate(angle_deg * PI / 180.0)
    }

    /// Compose with another transform (`self * other`): `other` applies
    /// first, then `self`.
    pub fn then(&self, other: &Self) -> Self {
        Self {
            m11: self.m11 * other.m11 + self.m21 * other.m12,
            m12: self.m12 * other.m11 + self.m22 * other.m12,
            m21: self.m11 * other.m21 + self.m21 * other.m22,
            m22: self.m12 * other.m21 + self.m22 * other.m22,
            dx: self.m11 * other.dx + self.m21 * other.dy + self.dx,
            dy: self.m12 * other.dx + self.m22 * other.dy + self.dy,
        }
    }

    pub fn apply_point(&self, x: f64, y: f64) -> (f64, f64) {
        (
            self.m11 * x + self.m21 * y + self.dx,
            self.m12 * x + self.m22 * y + self.dy,
        )
    }

    /// Axis-aligned bounding box of `rect` after mapping its four corners.
    pub fn apply_rect(&self, rect: &Rect) -> Rect {
        let corners = [
            self.apply_point(rect.x, rect.y),
            self.apply_point(rect.x + rect.width, rect.y),
            self.apply_point(rect.x, rect.y + rect.height),
            self.apply_point(rect.x + rect.width, rect.y + rect.height),
        ];

        let mut min_x = f64::INFINITY;
        let mut min_y = f64::INFINITY;
        let mut max_x = f64::NEG_INFINITY;
        let mut max_y = f64::NEG_INFINITY;
        for (x, y) in corners {
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }

        Rect::new(min_x, min_y, max_x - min_x, max_y - min_y)
    }

    pub fn determinant(&self) -> f64 {
        self.m11 * self.m22 - self.m12 * self.m21
    }

    /// Rotation of the first basis vector, `atan2(m12, m11)`.
    pub fn rotation_angle(&self) -> f64 {
        self.m12.atan2(self.m11)
    }

    pub fn is_identity(&self, epsilon: f64) -> bool {
        (self.m11 - 1.0).abs() < epsilon
            && self.m12.abs() < epsilon
            && self.m21.abs() < epsilon
            && (self.m22 - 1.0).abs() < epsilon
            && self.dx.abs() < epsilon
            && self.dy.abs() < epsilon
    }
}

/// Map an angle from `atan2` so that values at or below `-ANGLE_EPSILON`
/// move up by one full turn.
///
/// Inputs in `(-ε, π]` pass through unchanged, `(-π, -ε]` lands in
/// `(π, 2π - ε]`. Each call is independent; adjacent samples may still
/// straddle a `2π` wrap.
pub fn normalize_angle(angle: f64) -> f64 {
    if angle > -ANGLE_EPSILON {
        angle
    } else {
        angle + 2.0 * PI
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ORIGIN: Self = Self { x: 0.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle (origin + size).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// `[0,0] x [1,1]`
    pub const fn unit() -> Self {
        Self::new(0.0, 0.0, 1.0, 1.0)
    }

    pub fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }
}
