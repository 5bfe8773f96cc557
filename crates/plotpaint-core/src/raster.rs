//! Straight-alpha RGBA rasters and their compositing onto the surface.

use tiny_skia::{IntSize, Pixmap};

use crate::error::{RenderError, Result};
use crate::renderer::Renderer;

/// Straight (non-premultiplied) RGBA8 raster, row-major, rows tightly packed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RgbaRaster {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl RgbaRaster {
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize * 4;
        if data.len() != expected {
            return Err(RenderError::invalid(format!(
                "{} bytes for a {width}x{height} RGBA raster, expected {expected}",
                data.len()
            )));
        }
        Ok(Self { width, height, data })
    }

    /// Build from an array shaped `(rows, columns, 4)`.
    pub fn from_shape(data: Vec<u8>, shape: &[usize]) -> Result<Self> {
        let &[rows, cols, 4] = shape else {
            return Err(RenderError::invalid(format!(
                "RGBA array must have shape (m, n, 4), got {shape:?}"
            )));
        };
        let (Ok(height), Ok(width)) = (u32::try_from(rows), u32::try_from(cols)) else {
            return Err(RenderError::invalid(format!("RGBA array too large: {shape:?}")));
        };
        Self::new(width, height, data)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Premultiply into a pixmap.
    ///
    /// With an override the raster's own alpha is ignored: every pixel
    /// becomes opaque-times-`alpha`.
    pub(crate) fn to_premultiplied(&self, alpha: Option<f64>) -> Result<Option<Pixmap>> {
        let Some(size) = IntSize::from_wh(self.width, self.height) else {
            return Ok(None);
        };
        let mut out = Vec::with_capacity(self.data.len());
        match alpha {
            Some(alpha) => {
                let a = (alpha * 255.0) as u8;
                for px in self.data.chunks_exact(4) {
                    out.extend_from_slice(&[
                        (alpha * px[0] as f64) as u8,
                        (alpha * px[1] as f64) as u8,
                        (alpha * px[2] as f64) as u8,
                        a,
                    ]);
                }
            }
            None => {
                for px in self.data.chunks_exact(4) {
                    let a = px[3] as f64 / 255.0;
                    out.extend_from_slice(&[
                        (a * px[0] as f64) as u8,
                        (a * px[1] as f64) as u8,
                        (a * px[2] as f64) as u8,
                        px[3],
                    ]);
                }
            }
        }
        Pixmap::from_vec(out, size)
            .map(Some)
            .ok_or_else(|| RenderError::ResourceFailure("cannot wrap image data".into()))
    }
}

impl From<&image::RgbaImage> for RgbaRaster {
    fn from(img: &image::RgbaImage) -> Self {
        Self {
            width: img.width(),
            height: img.height(),
            data: img.as_raw().clone(),
        }
    }
}

impl Renderer {
    /// Composite `raster` with its first row just above source row `y` and its first column at `x`.
    ///
    /// Rows go upward in device space from `height - y`.
    pub fn draw_image(&self, x: f64, y: f64, raster: &RgbaRaster) -> Result<()> {
        let Some(mut ctx) = self.scope()? else {
            return Ok(());
        };
        let Some(pixmap) = raster.to_premultiplied(self.alpha())? else {
            return Ok(());
        };
        let height = ctx.surface().height() as f64;
        let ts = tiny_skia::Transform::from_row(1.0, 0.0, 0.0, -1.0, x as f32, (height - y) as f32);
        ctx.draw_pixmap(0, 0, pixmap.as_ref(), ts);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape_must_be_rgba() {
        assert!(RgbaRaster::from_shape(vec![0; 24], &[2, 3, 4]).is_ok());
        assert!(matches!(
            RgbaRaster::from_shape(vec![0; 18], &[2, 3, 3]),
            Err(RenderError::InvalidInput(_))
        ));
        assert!(RgbaRaster::from_shape(vec![0; 24], &[6, 4]).is_err());
        assert!(RgbaRaster::from_shape(vec![0; 20], &[2, 3, 4]).is_err());
    }

    #[test]
    fn premultiply_uses_own_alpha() {
        let raster = RgbaRaster::new(2, 1, vec![200, 100, 0, 255, 255, 255, 255, 0]).unwrap();
        let pm = raster.to_premultiplied(None).unwrap().unwrap();
        let p = pm.pixel(0, 0).unwrap();
        assert_eq!((p.red(), p.green(), p.blue(), p.alpha()), (200, 100, 0, 255));
        let q = pm.pixel(1, 0).unwrap();
        assert_eq!((q.red(), q.alpha()), (0, 0));
    }

    #[test]
    fn override_ignores_own_alpha() {
        let raster = RgbaRaster::new(1, 1, vec![255, 0, 0, 10]).unwrap();
        let pm = raster.to_premultiplied(Some(0.5)).unwrap().unwrap();
        let p = pm.pixel(0, 0).unwrap();
        assert_eq!((p.red(), p.alpha()), (127, 127));
    }

    #[test]
    fn empty_raster_yields_nothing() {
        let raster = RgbaRaster::new(0, 0, vec![]).unwrap();
        assert!(raster.to_premultiplied(None).unwrap().is_none());
    }

    #[test]
    fn converts_from_image_buffer() {
        let img = image::RgbaImage::from_pixel(2, 1, image::Rgba([1, 2, 3, 4]));
        let raster = RgbaRaster::from(&img);
        assert_eq!((raster.width(), raster.height()), (2, 1));
        assert_eq!(&raster.data()[4..], &[1, 2, 3, 4]);
    }
}
