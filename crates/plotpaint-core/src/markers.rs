//! Marker stamping: one shape drawn at every vertex of an instance path.
//!
//! Three strategies, tried in order:
//! 1. solid circles collapse to round-capped zero-length subpaths stroked in one pass;
//! 2. a subpixel raster cache renders the marker once per fractional offset
//!    bucket and composites the nearest patch at each instance;
//! 3. direct fill-then-stroke per instance.
//!
//! Segment codes of the instance path are ignored; only vertex positions matter.

use log::debug;
use plotpaint_config::RenderConfig;
use tiny_skia::{FillRule, LineCap, Pixmap, Rect, Stroke, Transform as SkiaTransform};

use crate::affine::{AffineMatrix, Transform};
use crate::color::{ColorSpec, Rgba, solid_paint, with_alpha};
use crate::context::Context;
use crate::error::{RenderError, Result};
use crate::path::{Path, to_skia_path};
use crate::renderer::Renderer;

/// How a marker batch gets drawn.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MarkerStrategy {
    SolidCircles,
    SubpixelCache { buckets: u32 },
    Direct,
}

/// Inputs to the strategy decision.
#[derive(Clone, Copy, Debug)]
pub struct MarkerInfo {
    /// The marker is the environment's canonical unit circle.
    pub unit_circle: bool,
    /// Marker transform in device orientation (y flipped, no offset).
    pub matrix: AffineMatrix,
    /// Fill color with the alpha override applied.
    pub fill: Option<Rgba>,
    /// Stroke color with the alpha override applied.
    pub stroke: Rgba,
    pub instances: usize,
}

impl MarkerInfo {
    fn is_solid_circle(&self) -> bool {
        let m = &self.matrix;
        let Some(fill) = self.fill else {
            return false;
        };
        let same_color = fill.red == self.stroke.red
            && fill.green == self.stroke.green
            && fill.blue == self.stroke.blue
            && fill.alpha == self.stroke.alpha;
        // d == -a because of the y flip.
        self.unit_circle && m.d == -m.a && m.b == 0.0 && m.c == 0.0 && same_color && fill.alpha == 1.0
    }
}

/// Pick the cheapest strategy that is valid for `marker`.
pub fn choose_strategy(marker: &MarkerInfo, config: &RenderConfig) -> MarkerStrategy {
    if config.circle_fast_path && marker.is_solid_circle() {
        return MarkerStrategy::SolidCircles;
    }
    let threshold = config.simplify_threshold;
    if config.marker_cache && threshold.is_finite() && threshold >= 1.0 / 16.0 {
        let buckets = (1.0 / threshold).ceil() as usize;
        if buckets * buckets < marker.instances {
            return MarkerStrategy::SubpixelCache {
                buckets: buckets as u32,
            };
        }
    }
    MarkerStrategy::Direct
}

/// Whole-pixel box around everything a marker can paint, relative to its origin.
#[derive(Clone, Copy, Debug, PartialEq)]
struct InkExtents {
    x0: f64,
    y0: f64,
    width: f64,
    height: f64,
}

fn ink_extents(marker: &tiny_skia::Path, stroke: Option<&Stroke>) -> InkExtents {
    let mut b = marker.bounds();
    if let Some(outline) = stroke.and_then(|s| marker.stroke(s, 1.0)) {
        let o = outline.bounds();
        b = Rect::from_ltrb(
            b.left().min(o.left()),
            b.top().min(o.top()),
            b.right().max(o.right()),
            b.bottom().max(o.bottom()),
        )
        .unwrap_or(b);
    }
    // One pixel of slack on each side for antialiasing.
    let x0 = (b.left() as f64).floor() - 1.0;
    let y0 = (b.top() as f64).floor() - 1.0;
    InkExtents {
        x0,
        y0,
        width: (b.right() as f64).ceil() + 1.0 - x0,
        height: (b.bottom() as f64).ceil() + 1.0 - y0,
    }
}

struct MarkerPaint {
    fill: Option<Rgba>,
    stroke_color: Rgba,
    stroke: Option<Stroke>,
    anti_alias: bool,
}

impl MarkerPaint {
    fn draw_into(&self, target: &mut Pixmap, marker: &tiny_skia::Path, ts: SkiaTransform) {
        let mut target = target.as_mut();
        if let Some(fill) = self.fill {
            let paint = solid_paint(fill, self.anti_alias);
            target.fill_path(marker, &paint, FillRule::Winding, ts, None);
        }
        if let Some(stroke) = &self.stroke {
            let paint = solid_paint(self.stroke_color, self.anti_alias);
            target.stroke_path(marker, &paint, stroke, ts, None);
        }
    }
}

impl Renderer {
    /// Draw `marker_path` (under `marker_transform`) at every vertex of `path` (under `transform`).
    ///
    /// Pass [`crate::RenderEnv::unit_circle`] as the marker to make solid
    /// circles eligible for the one-pass fast path.
    pub fn draw_markers(
        &self,
        marker_path: &Path,
        marker_transform: &dyn Transform,
        path: &Path,
        transform: &dyn Transform,
        fill: Option<&ColorSpec>,
    ) -> Result<()> {
        let Some(mut ctx) = self.scope()? else {
            return Ok(());
        };
        let marker_matrix = AffineMatrix::from_transform(marker_transform, 0.0)?;
        let matrix = AffineMatrix::from_transform(transform, ctx.surface().height() as f64)?;
        let fill = fill
            .map(|c| c.to_rgba().map(|c| with_alpha(c, self.alpha())))
            .transpose()?;
        let positions: Vec<[f64; 2]> = path
            .vertices()
            .iter()
            .map(|&v| matrix.transform_point(v))
            .filter(|p| p[0].is_finite() && p[1].is_finite())
            .collect();

        let info = MarkerInfo {
            unit_circle: self.env().is_unit_circle(marker_path),
            matrix: marker_matrix,
            fill,
            stroke: self.source(&ctx),
            instances: positions.len(),
        };
        let strategy = choose_strategy(&info, self.config());
        debug!("drawing {} markers with {:?}", positions.len(), strategy);

        match strategy {
            MarkerStrategy::SolidCircles => {
                draw_circles(&mut ctx, &positions, marker_matrix.a.abs() * 2.0, info.stroke);
                Ok(())
            }
            MarkerStrategy::SubpixelCache { buckets } => {
                let Some(marker) = to_skia_path(&marker_path.segments(&marker_matrix)) else {
                    return Ok(());
                };
                stamp_cached(&mut ctx, &marker, &positions, fill, info.stroke, buckets)
            }
            MarkerStrategy::Direct => {
                let Some(marker) = to_skia_path(&marker_path.segments(&marker_matrix)) else {
                    return Ok(());
                };
                for p in &positions {
                    let Some(placed) = marker
                        .clone()
                        .transform(SkiaTransform::from_translate(p[0] as f32, p[1] as f32))
                    else {
                        continue;
                    };
                    if let Some(fill) = fill {
                        ctx.fill(&placed, fill);
                    }
                    ctx.stroke(&placed, info.stroke);
                }
                Ok(())
            }
        }
    }
}

fn draw_circles(ctx: &mut Context, positions: &[[f64; 2]], diameter: f64, color: Rgba) {
    let mut pb = tiny_skia::PathBuilder::new();
    for p in positions {
        pb.move_to(p[0] as f32, p[1] as f32);
        pb.close();
    }
    let Some(dots) = pb.finish() else {
        return;
    };
    let stroke = Stroke {
        width: diameter as f32,
        line_cap: LineCap::Round,
        dash: None,
        ..ctx.state().stroke()
    };
    ctx.stroke_with(&dots, color, &stroke);
}

fn stamp_cached(
    ctx: &mut Context,
    marker: &tiny_skia::Path,
    positions: &[[f64; 2]],
    fill: Option<Rgba>,
    stroke_color: Rgba,
    buckets: u32,
) -> Result<()> {
    let state = ctx.state();
    let stroke = Some(state.stroke()).filter(|s| s.width > 0.0);
    let paint = MarkerPaint {
        fill,
        stroke_color,
        stroke,
        anti_alias: state.antialias.is_enabled(),
    };
    let ink = ink_extents(marker, paint.stroke.as_ref());
    let (w, h) = ((ink.width + 1.0).ceil() as u32, (ink.height + 1.0).ceil() as u32);
    let n = buckets as usize;

    let mut patches = Vec::with_capacity(n * n);
    for i in 0..n {
        for j in 0..n {
            let mut patch = Pixmap::new(w, h).ok_or_else(|| {
                RenderError::ResourceFailure(format!("cannot allocate a {w}x{h} marker patch"))
            })?;
            let ts = SkiaTransform::from_translate(
                (-ink.x0 + i as f64 / n as f64) as f32,
                (-ink.y0 + j as f64 / n as f64) as f32,
            );
            paint.draw_into(&mut patch, marker, ts);
            patches.push(patch);
        }
    }

    for p in positions {
        let (tx, ty) = (p[0] + ink.x0, p[1] + ink.y0);
        let (ix, iy) = (tx.floor(), ty.floor());
        let bx = (((tx - ix) * n as f64) as usize).min(n - 1);
        let by = (((ty - iy) * n as f64) as usize).min(n - 1);
        let patch = &patches[bx * n + by];
        ctx.draw_pixmap(ix as i32, iy as i32, patch.as_ref(), SkiaTransform::identity());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info() -> MarkerInfo {
        let red = Rgba::new(1.0, 0.0, 0.0, 1.0);
        MarkerInfo {
            unit_circle: true,
            matrix: AffineMatrix::new(3.0, 0.0, 0.0, -3.0, 0.0, 0.0),
            fill: Some(red),
            stroke: red,
            instances: 10,
        }
    }

    #[test]
    fn solid_circle_fast_path() {
        assert_eq!(choose_strategy(&info(), &RenderConfig::default()), MarkerStrategy::SolidCircles);
    }

    #[test]
    fn fast_path_needs_matching_opaque_fill() {
        let config = RenderConfig::default();

        let mut other_color = info();
        other_color.fill = Some(Rgba::new(0.0, 0.0, 1.0, 1.0));
        assert_ne!(choose_strategy(&other_color, &config), MarkerStrategy::SolidCircles);

        let mut translucent = info();
        translucent.fill = Some(Rgba::new(1.0, 0.0, 0.0, 0.5));
        translucent.stroke = Rgba::new(1.0, 0.0, 0.0, 0.5);
        assert_ne!(choose_strategy(&translucent, &config), MarkerStrategy::SolidCircles);

        let mut unfilled = info();
        unfilled.fill = None;
        assert_ne!(choose_strategy(&unfilled, &config), MarkerStrategy::SolidCircles);
    }

    #[test]
    fn fast_path_rejects_skew_and_other_shapes() {
        let config = RenderConfig::default();

        let mut skewed = info();
        skewed.matrix.c = 0.5;
        assert_ne!(choose_strategy(&skewed, &config), MarkerStrategy::SolidCircles);

        let mut stretched = info();
        stretched.matrix.d = -4.0;
        assert_ne!(choose_strategy(&stretched, &config), MarkerStrategy::SolidCircles);

        let mut square = info();
        square.unit_circle = false;
        assert_ne!(choose_strategy(&square, &config), MarkerStrategy::SolidCircles);
    }

    #[test]
    fn cache_needs_enough_instances() {
        let config = RenderConfig {
            simplify_threshold: 0.25,
            ..RenderConfig::default()
        };
        let mut few = info();
        few.unit_circle = false;
        few.instances = 16;
        assert_eq!(choose_strategy(&few, &config), MarkerStrategy::Direct);
        few.instances = 17;
        assert_eq!(choose_strategy(&few, &config), MarkerStrategy::SubpixelCache { buckets: 4 });
    }

    #[test]
    fn cache_needs_coarse_enough_threshold() {
        let config = RenderConfig {
            simplify_threshold: 1.0 / 32.0,
            ..RenderConfig::default()
        };
        let mut many = info();
        many.unit_circle = false;
        many.instances = 100_000;
        assert_eq!(choose_strategy(&many, &config), MarkerStrategy::Direct);
    }

    #[test]
    fn infinite_threshold_skips_cache() {
        let config = RenderConfig {
            simplify_threshold: f64::INFINITY,
            ..RenderConfig::default()
        };
        let mut many = info();
        many.unit_circle = false;
        many.instances = 2;
        assert_eq!(choose_strategy(&many, &config), MarkerStrategy::Direct);
    }

    #[test]
    fn coarse_threshold_uses_one_bucket() {
        let config = RenderConfig {
            simplify_threshold: 4.0,
            ..RenderConfig::default()
        };
        let mut many = info();
        many.unit_circle = false;
        many.instances = 2;
        assert_eq!(choose_strategy(&many, &config), MarkerStrategy::SubpixelCache { buckets: 1 });
    }

    #[test]
    fn solid_circles_win_over_cache() {
        let config = RenderConfig {
            simplify_threshold: 0.25,
            ..RenderConfig::default()
        };
        let mut many = info();
        many.instances = 1000;
        assert_eq!(choose_strategy(&many, &config), MarkerStrategy::SolidCircles);
        many.fill = Some(Rgba::new(0.0, 0.0, 1.0, 1.0));
        assert_eq!(choose_strategy(&many, &config), MarkerStrategy::SubpixelCache { buckets: 4 });
    }

    #[test]
    fn switches_disable_strategies() {
        let config = RenderConfig {
            circle_fast_path: false,
            marker_cache: false,
            ..RenderConfig::default()
        };
        let mut many = info();
        many.instances = 100_000;
        assert_eq!(choose_strategy(&many, &config), MarkerStrategy::Direct);
    }

    #[test]
    fn ink_extents_cover_stroke() {
        let mut pb = tiny_skia::PathBuilder::new();
        pb.move_to(-2.0, -2.0);
        pb.line_to(2.0, -2.0);
        pb.line_to(2.0, 2.0);
        pb.close();
        let marker = pb.finish().unwrap();
        let stroke = Stroke {
            width: 2.0,
            ..Stroke::default()
        };
        let ink = ink_extents(&marker, Some(&stroke));
        assert!(ink.x0 <= -4.0 && ink.y0 <= -4.0);
        assert!(ink.x0 + ink.width >= 4.0 && ink.y0 + ink.height >= 4.0);
    }
}
