//! 2D affine transforms for composed transform-axis properties.
//!
//! Stored as a 3x2 matrix (the bottom row [0, 0, 1] is implicit):
//! ```text
//! | a  c  tx |
//! | b  d  ty |
//! | 0  0  1  |
//! ```
//!
//! Serialized for the primitive as CSS `matrix(a, b, c, d, tx, ty)`.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// A 2D affine transformation matrix.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform2D {
    /// Scale X (matrix element a)
    pub a: f64,
    /// Skew Y (matrix element b)
    pub b: f64,
    /// Skew X (matrix element c)
    pub c: f64,
    /// Scale Y (matrix element d)
    pub d: f64,
    /// Translate X (matrix element tx)
    pub tx: f64,
    /// Translate Y (matrix element ty)
    pub ty: f64,
}

impl Default for Transform2D {
    fn default() -> Self {
        Self::identity()
    }
}

impl Transform2D {
    /// Create an identity transform (no change).
    pub fn identity() -> Self {
        Self {
            a: 1.0,
            b: 0.0,
            c: 0.0,
            d: 1.0,
            tx: 0.0,
            ty: 0.0,
        }
    }

    /// Create a translation transform.
    pub fn translate(tx: f64, ty: f64) -> Self {
        Self {
            tx,
            ty,
            ..Self::identity()
        }
    }

    /// Create a non-uniform scale transform.
    pub fn scale(sx: f64, sy: f64) -> Self {
        Self {
            a: sx,
            d: sy,
            ..Self::identity()
        }
    }

    /// Create a rotation transform from radians.
    pub fn rotate(angle_rad: f64) -> Self {
        let cos = angle_rad.cos();
        let sin = angle_rad.sin();
        Self {
            a: cos,
            b: sin,
            c: -sin,
            d: cos,
            tx: 0.0,
            ty: 0.0,
        }
    }

    /// Create a rotation transform from degrees.
    pub fn rotate_deg(angle_deg: f64) -> Self {
        Self::rotate(angle_deg * PI / 180.0)
    }

    /// Compose this transform with another (this * other).
    ///
    /// The resulting transform applies `other` first, then `self`.
    pub fn then(&self, other: &Self) -> Self {
        Self {
            a: self.a * other.a + self.c * other.b,
            b: self.b * other.a + self.d * other.b,
            c: self.a * other.c + self.c * other.d,
            d: self.b * other.c + self.d * other.d,
            tx: self.a * other.tx + self.c * other.ty + self.tx,
            ty: self.b * other.tx + self.d * other.ty + self.ty,
        }
    }

    /// Format as a CSS `matrix()` function.
    pub fn to_css(&self) -> String {
        format!(
            "matrix({}, {}, {}, {}, {}, {})",
            clean(self.a),
            clean(self.b),
            clean(self.c),
            clean(self.d),
            clean(self.tx),
            clean(self.ty)
        )
    }
}

/// Round away float noise (`6.1e-17`, `-0`) so CSS output is stable.
fn clean(value: f64) -> f64 {
    let rounded = (value * 1e6).round() / 1e6;
    if rounded == 0.0 { 0.0 } else { rounded }
}
