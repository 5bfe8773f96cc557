/// Vertical metrics of a face in font units; `descent` is positive below the baseline.
#[derive(Debug, Clone, Copy)]
pub struct FontMetrics {
    pub ascent: f32,
    pub descent: f32,
    pub line_gap: f32,
    pub units_per_em: u16,
}

impl FontMetrics {
    /// Metrics at `size_px` pixels per em. A face reporting zero units per em is left unscaled.
    pub fn at_size(&self, size_px: f32) -> ScaledFontMetrics {
        let scale = match self.units_per_em {
            0 => 1.0,
            upem => size_px / upem as f32,
        };
        ScaledFontMetrics {
            ascent: self.ascent * scale,
            descent: self.descent * scale,
            line_gap: self.line_gap * scale,
            font_size: size_px,
        }
    }
}

/// [`FontMetrics`] in pixels.
#[derive(Debug, Clone, Copy)]
pub struct ScaledFontMetrics {
    pub ascent: f32,
    pub descent: f32,
    pub line_gap: f32,
    pub font_size: f32,
}

impl ScaledFontMetrics {
    /// Ascent and descent rounded out to whole pixels.
    pub fn line_box(&self) -> (i32, i32) {
        (self.ascent.ceil() as i32, self.descent.ceil() as i32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(units_per_em: u16) -> FontMetrics {
        FontMetrics {
            ascent: 800.0,
            descent: 200.0,
            line_gap: 0.0,
            units_per_em,
        }
    }

    #[test]
    fn scales_by_units_per_em() {
        let px = metrics(1000).at_size(24.0);
        assert!((px.ascent - 19.2).abs() < 1e-4);
        assert!((px.descent - 4.8).abs() < 1e-4);
        assert_eq!(px.line_box(), (20, 5));
    }

    #[test]
    fn zero_units_per_em_is_unscaled() {
        assert_eq!(metrics(0).at_size(10.0).ascent, 800.0);
    }
}
