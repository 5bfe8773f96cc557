//! Text placement through the font and math layout collaborators.

use plotpaint_text::{CoverageRaster, FontStyle, TextExtents};
use tiny_skia::{IntSize, Pixmap, PremultipliedColorU8};

use crate::affine::AffineMatrix;
use crate::color::Rgba;
use crate::error::{RenderError, Result};
use crate::renderer::Renderer;

/// Tint a coverage raster with `color` into a premultiplied pixmap.
fn tinted(coverage: &CoverageRaster, color: Rgba) -> Result<Option<Pixmap>> {
    let Some(size) = IntSize::from_wh(coverage.width, coverage.height) else {
        return Ok(None);
    };
    let alpha = color.alpha.clamp(0.0, 1.0);
    let pixels: Vec<u8> = coverage
        .data
        .iter()
        .flat_map(|&c| {
            let a = alpha * c as f64 / 255.0;
            let a8 = (a * 255.0).round() as u8;
            let channel = |v: f64| ((v.clamp(0.0, 1.0) * a * 255.0).round() as u8).min(a8);
            let px = PremultipliedColorU8::from_rgba(channel(color.red), channel(color.green), channel(color.blue), a8)
                .unwrap_or(PremultipliedColorU8::TRANSPARENT);
            [px.red(), px.green(), px.blue(), px.alpha()]
        })
        .collect();
    Pixmap::from_vec(pixels, size)
        .map(Some)
        .ok_or_else(|| RenderError::ResourceFailure("cannot wrap text coverage".into()))
}

impl Renderer {
    /// Draw `text` anchored at source point `(x, y)`, rotated counter-clockwise by `angle` degrees.
    pub fn draw_text(
        &self,
        x: f64,
        y: f64,
        text: &str,
        style: &FontStyle,
        angle: f64,
        is_math: bool,
    ) -> Result<()> {
        let Some(mut ctx) = self.scope()? else {
            return Ok(());
        };
        let mut anchor = [x, ctx.surface().height() as f64 - y];
        let (coverage, left, top) = if is_math {
            let layout = self.env().math().layout(text, self.dpi(), style)?;
            // Axis-aligned math snaps to whole pixels.
            if angle % 90.0 == 0.0 {
                anchor = [anchor[0].round(), anchor[1].round()];
            }
            let top = layout.oy - layout.coverage.height as f64;
            (layout.coverage, layout.ox, top)
        } else {
            let font = self.env().fonts().resolve(style)?;
            let line = font.rasterize(text, self.points_to_pixels(style.size_pt) as f32);
            (line.coverage, line.left as f64, line.top as f64)
        };
        let Some(pixmap) = tinted(&coverage, self.source(&ctx))? else {
            return Ok(());
        };
        let matrix = AffineMatrix::translate(left, top)
            .then(&AffineMatrix::rotate(-angle.to_radians()))
            .then(&AffineMatrix::translate(anchor[0], anchor[1]));
        ctx.draw_pixmap(0, 0, pixmap.as_ref(), matrix.to_skia());
        Ok(())
    }

    /// Width, height and descent of `text` in pixels.
    pub fn text_width_height_descent(&self, text: &str, style: &FontStyle, is_math: bool) -> Result<TextExtents> {
        if is_math {
            let layout = self.env().math().layout(text, self.dpi(), style)?;
            return Ok(TextExtents {
                width: layout.width,
                height: layout.height,
                descent: layout.descent,
            });
        }
        let font = self.env().fonts().resolve(style)?;
        Ok(font.extents(text, self.points_to_pixels(style.size_pt) as f32))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tint_scales_by_coverage_and_alpha() {
        let coverage = CoverageRaster {
            width: 2,
            height: 1,
            data: vec![255, 0],
        };
        let pm = tinted(&coverage, Rgba::new(1.0, 0.0, 0.0, 1.0)).unwrap().unwrap();
        let p = pm.pixel(0, 0).unwrap();
        assert_eq!((p.red(), p.alpha()), (255, 255));
        assert_eq!(pm.pixel(1, 0).unwrap().alpha(), 0);
    }

    #[test]
    fn empty_coverage_is_skipped() {
        let pm = tinted(&CoverageRaster::default(), Rgba::new(0.0, 0.0, 0.0, 1.0)).unwrap();
        assert!(pm.is_none());
    }
}
