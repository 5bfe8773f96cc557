//! Vertex/code paths and their conversion into device-space segments.

use lyon_geom::{QuadraticBezierSegment, point};

use crate::affine::AffineMatrix;
use crate::error::{RenderError, Result};

/// Per-vertex path instruction.
///
/// `Curve3` and `Curve4` consume one and two extra vertices respectively.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum PathCode {
    Stop = 0,
    MoveTo = 1,
    LineTo = 2,
    Curve3 = 3,
    Curve4 = 4,
    ClosePoly = 79,
}

impl TryFrom<u8> for PathCode {
    type Error = RenderError;

    fn try_from(code: u8) -> Result<Self> {
        Ok(match code {
            0 => Self::Stop,
            1 => Self::MoveTo,
            2 => Self::LineTo,
            3 => Self::Curve3,
            4 => Self::Curve4,
            79 => Self::ClosePoly,
            other => return Err(RenderError::invalid(format!("unknown path code {other}"))),
        })
    }
}

/// Source-space path: vertices and an optional parallel code list.
///
/// Without codes the path is a polyline through every vertex.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Path {
    vertices: Vec<[f64; 2]>,
    codes: Option<Vec<PathCode>>,
}

impl Path {
    pub fn new(vertices: Vec<[f64; 2]>, codes: Option<Vec<PathCode>>) -> Result<Self> {
        if let Some(codes) = &codes {
            if codes.len() != vertices.len() {
                return Err(RenderError::invalid(format!(
                    "{} codes for {} vertices",
                    codes.len(),
                    vertices.len()
                )));
            }
        }
        Ok(Self { vertices, codes })
    }

    pub fn polyline(vertices: Vec<[f64; 2]>) -> Self {
        Self {
            vertices,
            codes: None,
        }
    }

    /// Build from raw numeric codes.
    pub fn from_raw(vertices: Vec<[f64; 2]>, codes: Option<&[u8]>) -> Result<Self> {
        let codes = codes
            .map(|raw| raw.iter().map(|&c| PathCode::try_from(c)).collect::<Result<Vec<_>>>())
            .transpose()?;
        Self::new(vertices, codes)
    }

    /// Closed unit circle centred on the origin, four cubic arcs.
    pub fn unit_circle() -> Self {
        const K: f64 = 0.552_284_749_830_793_4;
        let vertices = vec![
            [1.0, 0.0],
            [1.0, K],
            [K, 1.0],
            [0.0, 1.0],
            [-K, 1.0],
            [-1.0, K],
            [-1.0, 0.0],
            [-1.0, -K],
            [-K, -1.0],
            [0.0, -1.0],
            [K, -1.0],
            [1.0, -K],
            [1.0, 0.0],
            [1.0, 0.0],
        ];
        let mut codes = vec![PathCode::MoveTo];
        codes.extend(std::iter::repeat_n(PathCode::Curve4, 12));
        codes.push(PathCode::ClosePoly);
        Self {
            vertices,
            codes: Some(codes),
        }
    }

    /// Closed unit square with its lower-left corner on the origin.
    pub fn unit_rectangle() -> Self {
        Self {
            vertices: vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0], [0.0, 0.0]],
            codes: Some(vec![
                PathCode::MoveTo,
                PathCode::LineTo,
                PathCode::LineTo,
                PathCode::LineTo,
                PathCode::ClosePoly,
            ]),
        }
    }

    pub fn vertices(&self) -> &[[f64; 2]] {
        &self.vertices
    }

    pub fn codes(&self) -> Option<&[PathCode]> {
        self.codes.as_deref()
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn segments(&self, matrix: &AffineMatrix) -> Vec<PathSegment> {
        PathBuilder::build(&self.vertices, self.codes.as_deref(), matrix)
    }
}

/// Device-space path instruction.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PathSegment {
    MoveTo([f64; 2]),
    LineTo([f64; 2]),
    CurveTo([f64; 2], [f64; 2], [f64; 2]),
    Close,
    /// Ends the current subpath without closing it; the next point starts a new one.
    SubpathBreak,
}

/// Turns vertex/code lists into device-space segments.
pub struct PathBuilder;

impl PathBuilder {
    /// Convert a source path into device segments under `matrix`.
    ///
    /// Non-finite points never reach the output: a move, line or curve
    /// touching one becomes a [`PathSegment::SubpathBreak`]. A curve with no
    /// current point to start from is dropped the same way.
    pub fn build(
        vertices: &[[f64; 2]],
        codes: Option<&[PathCode]>,
        matrix: &AffineMatrix,
    ) -> Vec<PathSegment> {
        let Some(codes) = codes else {
            return Self::build_polyline(vertices, matrix);
        };

        let mut out = Vec::with_capacity(vertices.len());
        let mut current: Option<[f64; 2]> = None;
        // Where a close returns the pen.
        let mut start: Option<[f64; 2]> = None;
        let mut i = 0;
        while i < vertices.len() {
            let p = vertices[i];
            match codes[i] {
                PathCode::Stop => {}
                PathCode::MoveTo | PathCode::LineTo => {
                    if is_finite(p) {
                        let d = matrix.transform_point(p);
                        if codes[i] == PathCode::MoveTo || current.is_none() {
                            out.push(PathSegment::MoveTo(d));
                            start = Some(d);
                        } else {
                            out.push(PathSegment::LineTo(d));
                        }
                        current = Some(d);
                    } else {
                        out.push(PathSegment::SubpathBreak);
                        current = None;
                    }
                }
                PathCode::Curve3 => {
                    let end = vertices.get(i + 1).copied().filter(|&v| is_finite(v));
                    i += 1;
                    match (current, end) {
                        (Some(from), Some(end)) if is_finite(p) => {
                            let ctrl = matrix.transform_point(p);
                            let to = matrix.transform_point(end);
                            let cubic = QuadraticBezierSegment {
                                from: point(from[0], from[1]),
                                ctrl: point(ctrl[0], ctrl[1]),
                                to: point(to[0], to[1]),
                            }
                            .to_cubic();
                            out.push(PathSegment::CurveTo(
                                [cubic.ctrl1.x, cubic.ctrl1.y],
                                [cubic.ctrl2.x, cubic.ctrl2.y],
                                to,
                            ));
                            current = Some(to);
                        }
                        _ => {
                            out.push(PathSegment::SubpathBreak);
                            current = None;
                        }
                    }
                }
                PathCode::Curve4 => {
                    let c2 = vertices.get(i + 1).copied().filter(|&v| is_finite(v));
                    let end = vertices.get(i + 2).copied().filter(|&v| is_finite(v));
                    i += 2;
                    match (current, c2, end) {
                        (Some(_), Some(c2), Some(end)) if is_finite(p) => {
                            let to = matrix.transform_point(end);
                            out.push(PathSegment::CurveTo(
                                matrix.transform_point(p),
                                matrix.transform_point(c2),
                                to,
                            ));
                            current = Some(to);
                        }
                        _ => {
                            out.push(PathSegment::SubpathBreak);
                            current = None;
                        }
                    }
                }
                PathCode::ClosePoly => {
                    if current.is_some() {
                        out.push(PathSegment::Close);
                        current = start;
                    }
                }
            }
            i += 1;
        }
        out
    }

    /// One `LineTo` or `SubpathBreak` per vertex; a line with no current
    /// point starts a new subpath when lowered by [`to_skia_path`].
    fn build_polyline(vertices: &[[f64; 2]], matrix: &AffineMatrix) -> Vec<PathSegment> {
        vertices
            .iter()
            .map(|&p| {
                if is_finite(p) {
                    PathSegment::LineTo(matrix.transform_point(p))
                } else {
                    PathSegment::SubpathBreak
                }
            })
            .collect()
    }
}

fn is_finite(p: [f64; 2]) -> bool {
    p[0].is_finite() && p[1].is_finite()
}

/// Convert device segments into a tiny-skia path.
///
/// Returns `None` when nothing drawable remains.
pub fn to_skia_path(segments: &[PathSegment]) -> Option<tiny_skia::Path> {
    let mut pb = tiny_skia::PathBuilder::new();
    let mut has_current = false;
    for seg in segments {
        match *seg {
            PathSegment::MoveTo(p) => {
                pb.move_to(p[0] as f32, p[1] as f32);
                has_current = true;
            }
            PathSegment::LineTo(p) => {
                if has_current {
                    pb.line_to(p[0] as f32, p[1] as f32);
                } else {
                    pb.move_to(p[0] as f32, p[1] as f32);
                }
                has_current = true;
            }
            PathSegment::CurveTo(c1, c2, p) => {
                if !has_current {
                    pb.move_to(c1[0] as f32, c1[1] as f32);
                }
                pb.cubic_to(
                    c1[0] as f32,
                    c1[1] as f32,
                    c2[0] as f32,
                    c2[1] as f32,
                    p[0] as f32,
                    p[1] as f32,
                );
                has_current = true;
            }
            PathSegment::Close => {
                if has_current {
                    pb.close();
                }
            }
            PathSegment::SubpathBreak => has_current = false,
        }
    }
    pb.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: [f64; 2], b: [f64; 2]) -> bool {
        (a[0] - b[0]).abs() < 1e-9 && (a[1] - b[1]).abs() < 1e-9
    }

    #[test]
    fn polyline_emits_one_segment_per_vertex() {
        let verts = [[0.0, 0.0], [1.0, 2.0], [3.0, 1.0], [4.0, 4.0]];
        let segs = PathBuilder::build(&verts, None, &AffineMatrix::IDENTITY);
        assert_eq!(segs.len(), 4);
        assert!(segs.iter().all(|s| matches!(s, PathSegment::LineTo(_))));
    }

    #[test]
    fn polyline_lowers_to_one_subpath_per_run() {
        let verts = [[0.0, 0.0], [4.0, 0.0], [f64::NAN, 0.0], [0.0, 4.0], [4.0, 4.0]];
        let segs = PathBuilder::build(&verts, None, &AffineMatrix::IDENTITY);
        let path = to_skia_path(&segs).unwrap();
        let moves = path
            .segments()
            .filter(|s| matches!(s, tiny_skia::PathSegment::MoveTo(_)))
            .count();
        assert_eq!(moves, 2);
    }

    #[test]
    fn polyline_non_finite_vertex_breaks() {
        let verts = [[0.0, 0.0], [1.0, 1.0], [f64::INFINITY, 0.0], [2.0, 2.0], [3.0, 2.0]];
        let segs = PathBuilder::build(&verts, None, &AffineMatrix::IDENTITY);
        assert_eq!(
            segs,
            vec![
                PathSegment::LineTo([0.0, 0.0]),
                PathSegment::LineTo([1.0, 1.0]),
                PathSegment::SubpathBreak,
                PathSegment::LineTo([2.0, 2.0]),
                PathSegment::LineTo([3.0, 2.0]),
            ]
        );
    }

    #[test]
    fn nan_line_breaks_subpath() {
        let verts = [[0.0, 0.0], [1.0, 0.0], [f64::NAN, 1.0], [2.0, 0.0], [3.0, 0.0]];
        let codes = [PathCode::MoveTo, PathCode::LineTo, PathCode::LineTo, PathCode::LineTo, PathCode::LineTo];
        let segs = PathBuilder::build(&verts, Some(&codes), &AffineMatrix::IDENTITY);
        assert_eq!(
            segs,
            vec![
                PathSegment::MoveTo([0.0, 0.0]),
                PathSegment::LineTo([1.0, 0.0]),
                PathSegment::SubpathBreak,
                PathSegment::MoveTo([2.0, 0.0]),
                PathSegment::LineTo([3.0, 0.0]),
            ]
        );
        assert!(segs.iter().all(|s| match s {
            PathSegment::MoveTo(p) | PathSegment::LineTo(p) => p[0].is_finite() && p[1].is_finite(),
            _ => true,
        }));
    }

    #[test]
    fn quadratic_is_elevated_to_cubic() {
        let verts = [[0.0, 0.0], [3.0, 6.0], [6.0, 0.0]];
        let codes = [PathCode::MoveTo, PathCode::Curve3, PathCode::Curve3];
        let segs = PathBuilder::build(&verts, Some(&codes), &AffineMatrix::IDENTITY);
        assert_eq!(segs.len(), 2);
        let PathSegment::CurveTo(c1, c2, end) = segs[1] else {
            panic!("expected a cubic, got {:?}", segs[1]);
        };
        // (P0 + 2Q) / 3 and (2Q + P1) / 3
        assert!(close(c1, [2.0, 4.0]));
        assert!(close(c2, [4.0, 4.0]));
        assert!(close(end, [6.0, 0.0]));
    }

    #[test]
    fn close_returns_to_subpath_start() {
        let verts = [[0.0, 0.0], [10.0, 0.0], [10.0, 10.0], [0.0, 0.0], [5.0, 20.0], [0.0, 10.0]];
        let codes = [
            PathCode::MoveTo,
            PathCode::LineTo,
            PathCode::LineTo,
            PathCode::ClosePoly,
            PathCode::Curve3,
            PathCode::Curve3,
        ];
        let segs = PathBuilder::build(&verts, Some(&codes), &AffineMatrix::IDENTITY);
        assert_eq!(segs.len(), 5);
        assert_eq!(segs[3], PathSegment::Close);
        let PathSegment::CurveTo(c1, c2, end) = segs[4] else {
            panic!("expected a cubic, got {:?}", segs[4]);
        };
        // The quadratic starts from (0, 0), not from the last drawn (10, 10).
        assert!(close(c1, [10.0 / 3.0, 40.0 / 3.0]));
        assert!(close(c2, [10.0 / 3.0, 50.0 / 3.0]));
        assert!(close(end, [0.0, 10.0]));
    }

    #[test]
    fn curve_without_current_point_breaks() {
        let verts = [[0.0, 0.0], [1.0, 1.0], [2.0, 2.0], [3.0, 3.0], [4.0, 4.0]];
        let codes = [PathCode::Curve4, PathCode::Curve4, PathCode::Curve4, PathCode::MoveTo, PathCode::LineTo];
        let segs = PathBuilder::build(&verts, Some(&codes), &AffineMatrix::IDENTITY);
        assert_eq!(
            segs,
            vec![
                PathSegment::SubpathBreak,
                PathSegment::MoveTo([3.0, 3.0]),
                PathSegment::LineTo([4.0, 4.0]),
            ]
        );
    }

    #[test]
    fn non_finite_control_point_drops_curve() {
        let verts = [[0.0, 0.0], [f64::NAN, 1.0], [2.0, 0.0], [3.0, 0.0]];
        let codes = [PathCode::MoveTo, PathCode::Curve3, PathCode::Curve3, PathCode::LineTo];
        let segs = PathBuilder::build(&verts, Some(&codes), &AffineMatrix::IDENTITY);
        assert_eq!(
            segs,
            vec![
                PathSegment::MoveTo([0.0, 0.0]),
                PathSegment::SubpathBreak,
                PathSegment::MoveTo([3.0, 0.0]),
            ]
        );
    }

    #[test]
    fn truncated_cubic_breaks() {
        let verts = [[0.0, 0.0], [1.0, 1.0], [2.0, 2.0]];
        let codes = [PathCode::MoveTo, PathCode::Curve4, PathCode::Curve4];
        let segs = PathBuilder::build(&verts, Some(&codes), &AffineMatrix::IDENTITY);
        assert_eq!(segs, vec![PathSegment::MoveTo([0.0, 0.0]), PathSegment::SubpathBreak]);
    }

    #[test]
    fn stop_is_skipped_and_close_emitted() {
        let verts = [[0.0, 0.0], [0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]];
        let codes = [PathCode::MoveTo, PathCode::Stop, PathCode::LineTo, PathCode::LineTo, PathCode::ClosePoly];
        let segs = PathBuilder::build(&verts, Some(&codes), &AffineMatrix::IDENTITY);
        assert_eq!(segs.len(), 4);
        assert_eq!(segs[3], PathSegment::Close);
    }

    #[test]
    fn transform_is_applied() {
        let m = AffineMatrix::new(2.0, 0.0, 0.0, -1.0, 5.0, 10.0);
        let segs = PathBuilder::build(&[[1.0, 1.0]], None, &m);
        assert_eq!(segs, vec![PathSegment::LineTo([7.0, 9.0])]);
    }

    #[test]
    fn raw_codes_are_validated() {
        assert!(Path::from_raw(vec![[0.0, 0.0]], Some(&[1])).is_ok());
        assert!(Path::from_raw(vec![[0.0, 0.0]], Some(&[9])).is_err());
        assert!(Path::new(vec![[0.0, 0.0]], Some(vec![])).is_err());
    }

    #[test]
    fn unit_circle_converts_to_skia() {
        let segs = Path::unit_circle().segments(&AffineMatrix::scale(10.0, 10.0));
        let path = to_skia_path(&segs).unwrap();
        let b = path.bounds();
        assert!((b.left() + 10.0).abs() < 0.01 && (b.right() - 10.0).abs() < 0.01);
    }
}
