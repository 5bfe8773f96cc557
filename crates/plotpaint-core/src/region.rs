//! Capture and restore of rectangular surface regions.

use std::sync::Arc;

use log::trace;

use crate::error::{RenderError, Result};
use crate::renderer::Renderer;
use crate::surface::DirtyRect;

/// Pixels copied out of a surface, 4 bytes per pixel with no row padding.
///
/// Clones share the same buffer.
#[derive(Clone, Debug)]
pub struct Region {
    rect: DirtyRect,
    data: Arc<[u8]>,
}

impl Region {
    pub fn rect(&self) -> DirtyRect {
        self.rect
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

impl Renderer {
    /// Copy `[x0, y0, x1, y1]` out of the surface.
    ///
    /// The box is in source coordinates (origin bottom-left). It is widened
    /// to whole pixels (floor of the low corner, ceil of the high one) and
    /// must satisfy `0 <= x0 <= x1 < width` and `0 <= y0 <= y1 < height`.
    /// The returned rect is in device rows, `height - y1 .. height - y0`.
    pub fn copy_from_bbox(&self, bbox: [f64; 4]) -> Result<Region> {
        let x0 = bbox[0].floor() as i64;
        let y0 = bbox[1].floor() as i64;
        let x1 = bbox[2].ceil() as i64;
        let y1 = bbox[3].ceil() as i64;
        let surface = self.surface();
        let (width, height) = surface.as_ref().map_or((0, 0), |s| (s.width(), s.height()));
        let valid = 0 <= x0 && x0 <= x1 && x1 < width as i64 && 0 <= y0 && y0 <= y1 && y1 < height as i64;
        let Some(surface) = surface.filter(|_| valid) else {
            return Err(RenderError::InvalidRegion {
                x0,
                y0,
                x1,
                y1,
                width,
                height,
            });
        };

        let rect = DirtyRect {
            x: x0 as u32,
            y: (height as i64 - y1) as u32,
            width: (x1 - x0) as u32,
            height: (y1 - y0) as u32,
        };
        let stride = surface.stride();
        let row_bytes = rect.width as usize * 4;
        let mut data = Vec::with_capacity(row_bytes * rect.height as usize);
        for y in rect.y..rect.y + rect.height {
            let start = y as usize * stride + rect.x as usize * 4;
            data.extend_from_slice(&surface.data()[start..start + row_bytes]);
        }
        trace!("captured region {rect:?}");
        Ok(Region {
            rect,
            data: data.into(),
        })
    }

    /// Write `region` back where it was captured and mark it dirty.
    pub fn restore_region(&self, region: &Region) -> Result<()> {
        let Some(mut surface) = self.surface_mut() else {
            return Ok(());
        };
        let r = region.rect;
        if r.x + r.width > surface.width() || r.y + r.height > surface.height() {
            return Err(RenderError::InvalidRegion {
                x0: r.x as i64,
                y0: r.y as i64,
                x1: (r.x + r.width) as i64,
                y1: (r.y + r.height) as i64,
                width: surface.width(),
                height: surface.height(),
            });
        }
        surface.flush();
        let stride = surface.stride();
        let row_bytes = r.width as usize * 4;
        let buf = surface.data_mut();
        for (row, src) in region.data.chunks_exact(row_bytes.max(1)).enumerate().take(r.height as usize) {
            let start = (r.y as usize + row) * stride + r.x as usize * 4;
            buf[start..start + row_bytes].copy_from_slice(&src[..row_bytes]);
        }
        surface.mark_dirty(r);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::testing;
    use plotpaint_config::RenderConfig;

    fn renderer() -> Renderer {
        let mut r = Renderer::new(testing::env(), RenderConfig::default());
        r.bind_new_surface(8, 6).unwrap();
        {
            let mut s = r.surface_mut().unwrap();
            for (i, b) in s.data_mut().iter_mut().enumerate() {
                *b = (i % 251) as u8;
            }
        }
        r
    }

    #[test]
    fn bbox_is_widened_to_pixels() {
        let r = renderer();
        let region = r.copy_from_bbox([1.5, 0.2, 3.1, 2.0]).unwrap();
        assert_eq!(region.rect(), DirtyRect { x: 1, y: 4, width: 3, height: 2 });
        assert_eq!(region.data().len(), 3 * 2 * 4);
        let s = r.surface().unwrap();
        let row4 = 4 * s.stride();
        let row5 = 5 * s.stride();
        assert_eq!(&region.data()[..4], &s.data()[row4 + 4..row4 + 8]);
        assert_eq!(&region.data()[12..16], &s.data()[row5 + 4..row5 + 8]);
    }

    #[test]
    fn source_origin_is_bottom_left() {
        let r = renderer();
        {
            let mut s = r.surface_mut().unwrap();
            let stride = s.stride();
            let data = s.data_mut();
            data.fill(0);
            data[4 * stride..].fill(0xff);
        }
        let region = r.copy_from_bbox([0.0, 0.0, 2.0, 2.0]).unwrap();
        assert_eq!(region.rect().y, 4);
        assert!(region.data().iter().all(|&b| b == 0xff));
    }

    #[test]
    fn out_of_bounds_bbox_is_rejected() {
        let r = renderer();
        for bbox in [[-1.0, 0.0, 2.0, 2.0], [0.0, 0.0, 8.0, 2.0], [0.0, 0.0, 2.0, 6.0], [3.0, 0.0, 2.0, 2.0]] {
            assert!(matches!(r.copy_from_bbox(bbox), Err(RenderError::InvalidRegion { .. })));
        }
    }

    #[test]
    fn unbound_capture_fails() {
        let r = Renderer::new(testing::env(), RenderConfig::default());
        assert!(r.copy_from_bbox([0.0, 0.0, 0.0, 0.0]).is_err());
        assert!(r.restore_region(&renderer().copy_from_bbox([0.0, 0.0, 1.0, 1.0]).unwrap()).is_ok());
    }

    #[test]
    fn restore_writes_back_and_marks_dirty() {
        let r = renderer();
        let before = r.surface().unwrap().data().to_vec();
        let region = r.copy_from_bbox([2.0, 1.0, 6.0, 4.0]).unwrap();
        r.surface_mut().unwrap().data_mut().fill(0);
        r.restore_region(&region).unwrap();

        let mut s = r.surface_mut().unwrap();
        assert_eq!(s.take_dirty(), vec![region.rect()]);
        // Source rows 1..4 are device rows 2..5.
        for y in 2..5 {
            let row = y * s.stride();
            assert_eq!(&s.data()[row + 8..row + 24], &before[row + 8..row + 24]);
            assert!(s.data()[row..row + 8].iter().all(|&b| b == 0));
        }
    }

    #[test]
    fn capture_then_restore_is_identity() {
        let r = renderer();
        let before = r.surface().unwrap().data().to_vec();
        let region = r.copy_from_bbox([0.0, 0.0, 7.0, 5.0]).unwrap();
        r.restore_region(&region).unwrap();
        assert_eq!(r.surface().unwrap().data(), &before[..]);
    }
}
