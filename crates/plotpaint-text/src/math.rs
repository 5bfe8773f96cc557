//! Math text layout capability.

use std::sync::Arc;

use crate::error::{Result, TextError};
use crate::raster::{CoverageRaster, GlyphInfo};
use crate::resolver::{FontResolver, FontStyle};

/// Geometry and coverage produced by a math layout pass.
///
/// The raster is composited with its bottom-left corner at `(ox, oy)`
/// relative to the text anchor, in y-down pixel coordinates.
#[derive(Clone, Debug, Default)]
pub struct MathLayout {
    pub ox: f64,
    pub oy: f64,
    pub width: f64,
    pub height: f64,
    pub descent: f64,
    pub coverage: CoverageRaster,
    pub glyphs: Vec<GlyphInfo>,
}

/// Capability: typeset a marked-up string at a given DPI.
pub trait MathLayoutEngine: Send + Sync {
    fn layout(&self, text: &str, dpi: f64, style: &FontStyle) -> Result<MathLayout>;
}

/// Minimal math layout: strips `$` delimiters and typesets the rest as one line.
pub struct PlainMathLayout {
    fonts: Arc<dyn FontResolver>,
}

impl PlainMathLayout {
    pub fn new(fonts: Arc<dyn FontResolver>) -> Self {
        Self { fonts }
    }
}

pub(crate) fn strip_math_delimiters(text: &str) -> String {
    text.chars().filter(|&c| c != '$').collect()
}

impl MathLayoutEngine for PlainMathLayout {
    fn layout(&self, text: &str, dpi: f64, style: &FontStyle) -> Result<MathLayout> {
        if !dpi.is_finite() || dpi <= 0.0 {
            return Err(TextError::Layout(format!("invalid dpi {dpi}")));
        }
        let body = strip_math_delimiters(text);
        let font = self.fonts.resolve(style)?;
        let size_px = (style.size_pt * dpi / 72.0) as f32;
        let line = font.rasterize(&body, size_px);
        let metrics = font.metrics(size_px);

        // Pad the ink raster to the full line box so the baseline sits
        // `descent` pixels above the bottom edge.
        let (ascent, descent) = metrics.line_box();
        let ascent = ascent.max(-line.top);
        let descent = descent.max(line.top + line.coverage.height as i32);
        let width = (line.advance.ceil() as i32).max(line.left + line.coverage.width as i32).max(0);
        let height = (ascent + descent).max(0);
        let mut coverage = CoverageRaster::new(width as u32, height as u32);
        for y in 0..line.coverage.height {
            for x in 0..line.coverage.width {
                let tx = line.left + x as i32;
                let ty = ascent + line.top + y as i32;
                if tx >= 0 && ty >= 0 && tx < width && ty < height {
                    coverage.data[(ty * width + tx) as usize] = line.coverage.get(x, y);
                }
            }
        }

        Ok(MathLayout {
            ox: 0.0,
            oy: 0.0,
            width: width as f64,
            height: height as f64,
            descent: descent as f64,
            coverage,
            glyphs: line.glyphs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::FontHandle;

    struct NoFonts;

    impl FontResolver for NoFonts {
        fn resolve(&self, style: &FontStyle) -> Result<FontHandle> {
            Err(TextError::FontNotFound(style.families.join(", ")))
        }
    }

    #[test]
    fn delimiters_are_removed() {
        assert_eq!(strip_math_delimiters("$x^2$ + $y$"), "x^2 + y");
    }

    #[test]
    fn resolver_failure_propagates() {
        let engine = PlainMathLayout::new(Arc::new(NoFonts));
        let err = engine.layout("$x$", 100.0, &FontStyle::new(10.0)).unwrap_err();
        assert!(matches!(err, TextError::FontNotFound(_)));
    }

    #[test]
    fn nonpositive_dpi_is_rejected() {
        let engine = PlainMathLayout::new(Arc::new(NoFonts));
        let err = engine.layout("$x$", 0.0, &FontStyle::new(10.0)).unwrap_err();
        assert!(matches!(err, TextError::Layout(_)));
    }
}
