use std::path::Path;
use std::sync::Arc;

use swash::scale::image::Image;
use swash::scale::{Render, ScaleContext, Source};
use swash::{FontRef, GlyphId, Metrics};

use crate::error::{Result, TextError};
use crate::font::{FontMetrics, ScaledFontMetrics};

/// One face of a font file, with the bytes it was parsed from.
#[derive(Debug, Clone)]
pub struct FontFace {
    data: Arc<[u8]>,
    offset: u32,
    key: swash::CacheKey,
    metrics: FontMetrics,
}

impl FontFace {
    /// Parse face `index` of `data`; collections hold several faces.
    pub fn from_bytes(data: Arc<[u8]>, index: usize) -> Result<Self> {
        let face = FontRef::from_index(&data, index).ok_or(TextError::InvalidFont)?;
        let Metrics {
            units_per_em,
            ascent,
            descent,
            leading,
            ..
        } = face.metrics(&[]);
        Ok(Self {
            offset: face.offset,
            key: face.key,
            metrics: FontMetrics {
                ascent,
                descent,
                line_gap: leading,
                units_per_em,
            },
            data,
        })
    }

    pub fn from_path(path: impl AsRef<Path>, index: usize) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(bytes.into(), index)
    }

    fn swash(&self) -> FontRef<'_> {
        FontRef {
            data: &self.data,
            offset: self.offset,
            key: self.key,
        }
    }

    pub fn metrics(&self) -> FontMetrics {
        self.metrics
    }

    pub fn scaled_metrics(&self, size_px: f32) -> ScaledFontMetrics {
        self.metrics.at_size(size_px)
    }

    pub fn glyph_id(&self, ch: char) -> GlyphId {
        self.swash().charmap().map(ch)
    }

    /// Horizontal advance of a glyph in pixels at `font_size`.
    pub fn advance(&self, glyph_id: GlyphId, font_size: f32) -> f32 {
        self.swash()
            .glyph_metrics(&[])
            .scale(font_size)
            .advance_width(glyph_id)
    }

    /// Render a glyph outline into an 8-bit coverage image.
    ///
    /// The returned placement is relative to the pen position on the
    /// baseline, y growing upward for `top`.
    pub fn render_glyph(
        &self,
        context: &mut ScaleContext,
        glyph_id: GlyphId,
        font_size: f32,
    ) -> Option<Image> {
        let mut scaler = context
            .builder(self.swash())
            .size(font_size)
            .hint(false)
            .build();
        Render::new(&[Source::Outline]).render(&mut scaler, glyph_id)
    }
}
