//! Gouraud-shaded triangle meshes.

use tiny_skia::{Pixmap, PremultipliedColorU8};

use crate::affine::{AffineMatrix, Transform};
use crate::error::{RenderError, Result};
use crate::renderer::Renderer;

/// Triangles with one straight RGBA color per corner.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GouraudMesh {
    triangles: Vec<[[f64; 2]; 3]>,
    colors: Vec<[[f64; 4]; 3]>,
}

impl GouraudMesh {
    pub fn new(triangles: Vec<[[f64; 2]; 3]>, colors: Vec<[[f64; 4]; 3]>) -> Result<Self> {
        if triangles.len() != colors.len() {
            return Err(non_matching(&[triangles.len(), 3, 2], &[colors.len(), 3, 4]));
        }
        Ok(Self { triangles, colors })
    }

    /// Build from flat row-major arrays shaped `N×3×2` and `N×3×4`.
    pub fn from_arrays(
        triangles: &[f64],
        triangles_shape: [usize; 3],
        colors: &[f64],
        colors_shape: [usize; 3],
    ) -> Result<Self> {
        let [n, tv, tc] = triangles_shape;
        let [m, cv, cc] = colors_shape;
        if n != m || tv != 3 || tc != 2 || cv != 3 || cc != 4 {
            return Err(non_matching(&triangles_shape, &colors_shape));
        }
        if triangles.len() != n * 6 || colors.len() != n * 12 {
            return Err(RenderError::invalid(format!(
                "array sizes {} and {} do not match {n} triangles",
                triangles.len(),
                colors.len()
            )));
        }
        let triangles = triangles
            .chunks_exact(6)
            .map(|t| [[t[0], t[1]], [t[2], t[3]], [t[4], t[5]]])
            .collect();
        let colors = colors
            .chunks_exact(12)
            .map(|c| {
                [
                    [c[0], c[1], c[2], c[3]],
                    [c[4], c[5], c[6], c[7]],
                    [c[8], c[9], c[10], c[11]],
                ]
            })
            .collect();
        Ok(Self { triangles, colors })
    }

    pub fn len(&self) -> usize {
        self.triangles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }
}

fn non_matching(triangles: &[usize], colors: &[usize]) -> RenderError {
    RenderError::invalid(format!(
        "non-matching shapes: triangles {triangles:?}, colors {colors:?}"
    ))
}

/// Mesh gradient evaluated in pattern space.
///
/// `matrix` maps device points back into the mesh's coordinates. Later
/// patches paint over earlier ones where they overlap.
struct MeshPattern<'a> {
    mesh: &'a GouraudMesh,
    matrix: AffineMatrix,
}

impl MeshPattern<'_> {
    fn color_at(triangle: &[[f64; 2]; 3], colors: &[[f64; 4]; 3], p: [f64; 2]) -> Option<[f64; 4]> {
        let [a, b, c] = *triangle;
        let det = (b[1] - c[1]) * (a[0] - c[0]) + (c[0] - b[0]) * (a[1] - c[1]);
        if det == 0.0 || !det.is_finite() {
            return None;
        }
        let w0 = ((b[1] - c[1]) * (p[0] - c[0]) + (c[0] - b[0]) * (p[1] - c[1])) / det;
        let w1 = ((c[1] - a[1]) * (p[0] - c[0]) + (a[0] - c[0]) * (p[1] - c[1])) / det;
        let w2 = 1.0 - w0 - w1;
        const EPS: f64 = -1e-9;
        if w0 < EPS || w1 < EPS || w2 < EPS {
            return None;
        }
        let mut out = [0.0; 4];
        for (k, o) in out.iter_mut().enumerate() {
            *o = w0 * colors[0][k] + w1 * colors[1][k] + w2 * colors[2][k];
        }
        Some(out)
    }

    /// Paint every patch into `target`, one sample per pixel center.
    fn paint(&self, target: &mut Pixmap) -> Result<()> {
        let forward = self
            .matrix
            .invert()
            .ok_or_else(|| RenderError::invalid("mesh pattern matrix is not invertible"))?;
        let (w, h) = (target.width() as i64, target.height() as i64);
        let pixels = target.pixels_mut();
        for (triangle, colors) in self.mesh.triangles.iter().zip(&self.mesh.colors) {
            let corners = triangle.map(|v| forward.transform_point(v));
            if corners.iter().any(|p| !(p[0].is_finite() && p[1].is_finite())) {
                continue;
            }
            let min = |k: usize| corners.iter().map(|p| p[k]).fold(f64::INFINITY, f64::min);
            let max = |k: usize| corners.iter().map(|p| p[k]).fold(f64::NEG_INFINITY, f64::max);
            let x0 = (min(0).floor() as i64).max(0);
            let y0 = (min(1).floor() as i64).max(0);
            let x1 = (max(0).ceil() as i64).min(w);
            let y1 = (max(1).ceil() as i64).min(h);
            for y in y0..y1 {
                for x in x0..x1 {
                    let p = self.matrix.transform_point([x as f64 + 0.5, y as f64 + 0.5]);
                    if let Some(color) = Self::color_at(triangle, colors, p) {
                        pixels[(y * w + x) as usize] = premultiply(color);
                    }
                }
            }
        }
        Ok(())
    }
}

fn premultiply([r, g, b, a]: [f64; 4]) -> PremultipliedColorU8 {
    let a = a.clamp(0.0, 1.0);
    let channel = |c: f64| (c.clamp(0.0, 1.0) * a * 255.0).round() as u8;
    let alpha = (a * 255.0).round() as u8;
    PremultipliedColorU8::from_rgba(
        channel(r).min(alpha),
        channel(g).min(alpha),
        channel(b).min(alpha),
        alpha,
    )
    .unwrap_or(PremultipliedColorU8::TRANSPARENT)
}

impl Renderer {
    /// Fill `mesh` (source coordinates under `transform`) with per-corner color interpolation.
    ///
    /// The global alpha override does not apply to mesh colors.
    pub fn draw_gouraud_triangles(&self, mesh: &GouraudMesh, transform: &dyn Transform) -> Result<()> {
        let Some(mut ctx) = self.scope()? else {
            return Ok(());
        };
        let (width, height) = (ctx.surface().width(), ctx.surface().height());
        let matrix = AffineMatrix::from_transform(transform, height as f64)?;
        if mesh.is_empty() {
            return Ok(());
        }
        let pattern = MeshPattern {
            mesh,
            matrix: matrix
                .invert()
                .ok_or_else(|| RenderError::invalid("mesh transform is not invertible"))?,
        };
        let mut layer = Pixmap::new(width, height).ok_or_else(|| {
            RenderError::ResourceFailure(format!("cannot allocate a {width}x{height} mesh layer"))
        })?;
        pattern.paint(&mut layer)?;
        ctx.draw_pixmap(0, 0, layer.as_ref(), tiny_skia::Transform::identity());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shapes_are_checked() {
        let tri = [0.0; 12];
        let col = [0.0; 24];
        assert!(GouraudMesh::from_arrays(&tri, [2, 3, 2], &col, [2, 3, 4]).is_ok());
        assert!(matches!(
            GouraudMesh::from_arrays(&tri, [2, 3, 2], &col[..12], [1, 3, 4]),
            Err(RenderError::InvalidInput(_))
        ));
        assert!(GouraudMesh::from_arrays(&tri, [3, 2, 2], &col, [2, 3, 4]).is_err());
        assert!(GouraudMesh::from_arrays(&tri, [2, 3, 2], &col, [2, 4, 3]).is_err());
        assert!(GouraudMesh::from_arrays(&tri[..6], [2, 3, 2], &col, [2, 3, 4]).is_err());
        assert!(GouraudMesh::new(vec![[[0.0; 2]; 3]], vec![]).is_err());
    }

    #[test]
    fn barycentric_interpolation() {
        let tri = [[0.0, 0.0], [10.0, 0.0], [0.0, 10.0]];
        let colors = [
            [1.0, 0.0, 0.0, 1.0],
            [0.0, 1.0, 0.0, 1.0],
            [0.0, 0.0, 1.0, 1.0],
        ];
        let at_corner = MeshPattern::color_at(&tri, &colors, [0.0, 0.0]).unwrap();
        assert!((at_corner[0] - 1.0).abs() < 1e-12);
        let mid = MeshPattern::color_at(&tri, &colors, [5.0, 0.0]).unwrap();
        assert!((mid[0] - 0.5).abs() < 1e-12 && (mid[1] - 0.5).abs() < 1e-12);
        assert!(MeshPattern::color_at(&tri, &colors, [8.0, 8.0]).is_none());
    }

    #[test]
    fn premultiply_scales_channels() {
        let c = premultiply([1.0, 0.5, 0.0, 0.5]);
        assert_eq!((c.red(), c.green(), c.blue(), c.alpha()), (128, 64, 0, 128));
    }
}
