//! 2×3 affine matrices and conversion from caller-supplied transforms.

use crate::error::{RenderError, Result};

/// A caller-supplied transform.
///
/// `matrix` is row-major: row 0 holds the x coefficients, row 1 the y
/// coefficients and the last column the translation.
pub trait Transform {
    fn is_affine(&self) -> bool {
        true
    }

    fn matrix(&self) -> [[f64; 3]; 3];
}

/// Affine map `(x, y) → (a·x + c·y + e, b·x + d·y + f)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AffineMatrix {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl Default for AffineMatrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl AffineMatrix {
    pub const IDENTITY: Self = Self::new(1.0, 0.0, 0.0, 1.0, 0.0, 0.0);

    pub const fn new(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Self {
        Self { a, b, c, d, e, f }
    }

    pub const fn translate(tx: f64, ty: f64) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, tx, ty)
    }

    pub const fn scale(sx: f64, sy: f64) -> Self {
        Self::new(sx, 0.0, 0.0, sy, 0.0, 0.0)
    }

    pub fn rotate(radians: f64) -> Self {
        let (s, c) = radians.sin_cos();
        Self::new(c, s, -s, c, 0.0, 0.0)
    }

    /// Convert a source-space transform into device space.
    ///
    /// The y axis is flipped and shifted by `flip_height` so that the
    /// source origin (bottom-left) lands on device row `flip_height`.
    pub fn from_transform(transform: &dyn Transform, flip_height: f64) -> Result<Self> {
        let m = affine_rows(transform)?;
        Ok(Self::new(
            m[0][0],
            -m[1][0],
            m[0][1],
            -m[1][1],
            m[0][2],
            flip_height - m[1][2],
        ))
    }

    /// Apply `transform` (unflipped) and then `master`, which already carries the flip.
    pub fn compose_transform(transform: &dyn Transform, master: &Self) -> Result<Self> {
        let m = affine_rows(transform)?;
        let local = Self::new(m[0][0], m[1][0], m[0][1], m[1][1], m[0][2], m[1][2]);
        Ok(local.then(master))
    }

    /// The map that applies `self` first and `next` second.
    pub fn then(&self, next: &Self) -> Self {
        Self {
            a: next.a * self.a + next.c * self.b,
            b: next.b * self.a + next.d * self.b,
            c: next.a * self.c + next.c * self.d,
            d: next.b * self.c + next.d * self.d,
            e: next.a * self.e + next.c * self.f + next.e,
            f: next.b * self.e + next.d * self.f + next.f,
        }
    }

    /// Translate in the input space before applying `self`.
    pub fn pre_translate(&self, tx: f64, ty: f64) -> Self {
        Self::translate(tx, ty).then(self)
    }

    pub fn determinant(&self) -> f64 {
        self.a * self.d - self.b * self.c
    }

    pub fn invert(&self) -> Option<Self> {
        let det = self.determinant();
        if det == 0.0 || !det.is_finite() {
            return None;
        }
        Some(Self {
            a: self.d / det,
            b: -self.b / det,
            c: -self.c / det,
            d: self.a / det,
            e: (self.c * self.f - self.d * self.e) / det,
            f: (self.b * self.e - self.a * self.f) / det,
        })
    }

    pub fn transform_point(&self, p: [f64; 2]) -> [f64; 2] {
        [
            self.a * p[0] + self.c * p[1] + self.e,
            self.b * p[0] + self.d * p[1] + self.f,
        ]
    }

    pub fn transform_distance(&self, v: [f64; 2]) -> [f64; 2] {
        [self.a * v[0] + self.c * v[1], self.b * v[0] + self.d * v[1]]
    }

    pub fn is_finite(&self) -> bool {
        [self.a, self.b, self.c, self.d, self.e, self.f]
            .iter()
            .all(|v| v.is_finite())
    }

    pub fn to_skia(&self) -> tiny_skia::Transform {
        tiny_skia::Transform::from_row(
            self.a as f32,
            self.b as f32,
            self.c as f32,
            self.d as f32,
            self.e as f32,
            self.f as f32,
        )
    }
}

impl Transform for AffineMatrix {
    fn matrix(&self) -> [[f64; 3]; 3] {
        [[self.a, self.c, self.e], [self.b, self.d, self.f], [0.0, 0.0, 1.0]]
    }
}

/// Raw row-major 3×3 matrix; affine only when the last row is `[0, 0, 1]`.
impl Transform for [[f64; 3]; 3] {
    fn is_affine(&self) -> bool {
        self[2] == [0.0, 0.0, 1.0]
    }

    fn matrix(&self) -> [[f64; 3]; 3] {
        *self
    }
}

fn affine_rows(transform: &dyn Transform) -> Result<[[f64; 3]; 3]> {
    if !transform.is_affine() {
        return Err(RenderError::invalid("only affine transforms are handled"));
    }
    Ok(transform.matrix())
}
