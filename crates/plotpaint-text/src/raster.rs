//! Single-line glyph layout into 8-bit coverage rasters.

use swash::scale::ScaleContext;

use crate::font::FontFace;

/// Tightly packed 8-bit coverage raster (one byte per pixel, row-major).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CoverageRaster {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl CoverageRaster {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; width as usize * height as usize],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn get(&self, x: u32, y: u32) -> u8 {
        if x >= self.width || y >= self.height {
            return 0;
        }
        self.data[(y * self.width + x) as usize]
    }

    /// Accumulate `src` (a `w`×`h` coverage block) at `(x, y)`, saturating.
    fn accumulate(&mut self, x: i32, y: i32, w: u32, h: u32, src: &[u8]) {
        for row in 0..h as i32 {
            let ty = y + row;
            if ty < 0 || ty >= self.height as i32 {
                continue;
            }
            for col in 0..w as i32 {
                let tx = x + col;
                if tx < 0 || tx >= self.width as i32 {
                    continue;
                }
                let s = src[(row as u32 * w + col as u32) as usize];
                let d = &mut self.data[(ty as u32 * self.width + tx as u32) as usize];
                *d = d.saturating_add(s);
            }
        }
    }
}

/// Per-glyph placement metadata produced alongside a raster.
#[derive(Clone, Debug, PartialEq)]
pub struct GlyphInfo {
    pub ch: char,
    /// Pen x position of the glyph origin, in pixels.
    pub x: f64,
    pub advance: f64,
}

/// A laid-out line of text.
///
/// `left`/`top` locate the raster's top-left pixel relative to the pen
/// origin on the baseline, in y-down pixel coordinates (`top` is usually
/// negative).
#[derive(Clone, Debug, Default)]
pub struct TextRaster {
    pub coverage: CoverageRaster,
    pub left: i32,
    pub top: i32,
    pub advance: f64,
    pub glyphs: Vec<GlyphInfo>,
}

/// Ink extents of a line: width, height and the part of the height below the baseline.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TextExtents {
    pub width: f64,
    pub height: f64,
    pub descent: f64,
}

struct PlacedGlyph {
    x: i32,
    y: i32,
    width: u32,
    height: u32,
    data: Vec<u8>,
}

fn place_glyphs(face: &FontFace, text: &str, size_px: f32) -> (Vec<PlacedGlyph>, Vec<GlyphInfo>, f64) {
    let mut context = ScaleContext::new();
    let mut placed = Vec::new();
    let mut infos = Vec::new();
    let mut pen = 0.0f32;
    for ch in text.chars() {
        let gid = face.glyph_id(ch);
        let advance = face.advance(gid, size_px);
        if let Some(img) = face.render_glyph(&mut context, gid, size_px) {
            let w = img.placement.width;
            let h = img.placement.height;
            if w > 0 && h > 0 && img.data.len() >= (w * h) as usize {
                placed.push(PlacedGlyph {
                    x: pen.round() as i32 + img.placement.left,
                    y: -img.placement.top,
                    width: w,
                    height: h,
                    data: img.data,
                });
            }
        }
        infos.push(GlyphInfo {
            ch,
            x: pen as f64,
            advance: advance as f64,
        });
        pen += advance;
    }
    (placed, infos, pen as f64)
}

fn ink_box(placed: &[PlacedGlyph]) -> Option<(i32, i32, i32, i32)> {
    placed.iter().fold(None, |acc, g| {
        let b = (g.x, g.y, g.x + g.width as i32, g.y + g.height as i32);
        Some(match acc {
            None => b,
            Some((x0, y0, x1, y1)) => (x0.min(b.0), y0.min(b.1), x1.max(b.2), y1.max(b.3)),
        })
    })
}

/// Lay out `text` on a single line and rasterize it into one coverage raster.
pub fn rasterize_line(face: &FontFace, text: &str, size_px: f32) -> TextRaster {
    let (placed, glyphs, advance) = place_glyphs(face, text, size_px);
    let Some((x0, y0, x1, y1)) = ink_box(&placed) else {
        return TextRaster {
            advance,
            glyphs,
            ..TextRaster::default()
        };
    };
    let mut coverage = CoverageRaster::new((x1 - x0) as u32, (y1 - y0) as u32);
    for g in &placed {
        coverage.accumulate(g.x - x0, g.y - y0, g.width, g.height, &g.data);
    }
    TextRaster {
        coverage,
        left: x0,
        top: y0,
        advance,
        glyphs,
    }
}

/// Ink extents of `text` without building the combined raster.
pub fn text_extents(face: &FontFace, text: &str, size_px: f32) -> TextExtents {
    let (placed, _, _) = place_glyphs(face, text, size_px);
    ink_box(&placed).map(extents_of).unwrap_or_default()
}

/// Extents of a baseline-relative ink box. Ink entirely above the baseline has a negative descent.
fn extents_of((x0, y0, x1, y1): (i32, i32, i32, i32)) -> TextExtents {
    TextExtents {
        width: (x1 - x0) as f64,
        height: (y1 - y0) as f64,
        descent: y1 as f64,
    }
}
