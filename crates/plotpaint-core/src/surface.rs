//! Pixel surface backed by a premultiplied RGBA pixmap.

use log::trace;
use tiny_skia::{Pixmap, PixmapMut};

use crate::error::{RenderError, Result};

/// Integer rectangle in device pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DirtyRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// In-memory drawing target.
///
/// Pixels are premultiplied RGBA8, row-major, `stride()` bytes per row.
pub struct Surface {
    pixmap: Pixmap,
    dirty: Vec<DirtyRect>,
}

impl Surface {
    pub fn new(width: u32, height: u32) -> Result<Self> {
        let pixmap = Pixmap::new(width, height).ok_or_else(|| {
            RenderError::ResourceFailure(format!("cannot allocate a {width}x{height} surface"))
        })?;
        Ok(Self {
            pixmap,
            dirty: Vec::new(),
        })
    }

    /// Wrap existing premultiplied RGBA8 data.
    pub fn from_data(data: Vec<u8>, width: u32, height: u32) -> Result<Self> {
        let size = tiny_skia::IntSize::from_wh(width, height)
            .ok_or_else(|| RenderError::invalid(format!("invalid surface size {width}x{height}")))?;
        let pixmap = Pixmap::from_vec(data, size).ok_or_else(|| {
            RenderError::invalid(format!("buffer does not match a {width}x{height} surface"))
        })?;
        Ok(Self {
            pixmap,
            dirty: Vec::new(),
        })
    }

    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    pub fn stride(&self) -> usize {
        self.pixmap.width() as usize * 4
    }

    pub fn data(&self) -> &[u8] {
        self.pixmap.data()
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        self.pixmap.data_mut()
    }

    /// Premultiplied pixel packed as `0xAARRGGBB`.
    pub fn argb32_at(&self, x: u32, y: u32) -> Option<u32> {
        let p = self.pixmap.pixel(x, y)?;
        Some(
            (p.alpha() as u32) << 24
                | (p.red() as u32) << 16
                | (p.green() as u32) << 8
                | p.blue() as u32,
        )
    }

    /// Straight-alpha RGBA copy of the surface, for encoders.
    pub fn to_rgba8(&self) -> Vec<u8> {
        self.pixmap
            .pixels()
            .iter()
            .flat_map(|p| {
                let c = p.demultiply();
                [c.red(), c.green(), c.blue(), c.alpha()]
            })
            .collect()
    }

    /// Make pending drawing visible to direct buffer access.
    ///
    /// Drawing is written through immediately, so this only records the
    /// call boundary.
    pub fn flush(&mut self) {
        trace!("flush {}x{} surface", self.width(), self.height());
    }

    /// Record that `rect` was changed behind the renderer's back.
    pub fn mark_dirty(&mut self, rect: DirtyRect) {
        trace!("dirty rect {rect:?}");
        self.dirty.push(rect);
    }

    /// Drain the rectangles marked dirty since the last call.
    pub fn take_dirty(&mut self) -> Vec<DirtyRect> {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    pub(crate) fn pixmap_mut(&mut self) -> PixmapMut<'_> {
        self.pixmap.as_mut()
    }
}

impl std::fmt::Debug for Surface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Surface")
            .field("width", &self.width())
            .field("height", &self.height())
            .field("dirty", &self.dirty.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_surface_is_transparent() {
        let s = Surface::new(4, 3).unwrap();
        assert_eq!(s.stride(), 16);
        assert_eq!(s.data().len(), 48);
        assert_eq!(s.argb32_at(3, 2), Some(0));
        assert_eq!(s.argb32_at(4, 0), None);
    }

    #[test]
    fn zero_size_fails() {
        assert!(matches!(Surface::new(0, 10), Err(RenderError::ResourceFailure(_))));
    }

    #[test]
    fn argb_packing() {
        let mut s = Surface::new(2, 1).unwrap();
        s.data_mut()[4..8].copy_from_slice(&[0x7f, 0x10, 0x00, 0x7f]);
        assert_eq!(s.argb32_at(1, 0), Some(0x7f7f_1000));
    }

    #[test]
    fn dirty_rects_drain() {
        let mut s = Surface::new(8, 8).unwrap();
        let r = DirtyRect { x: 1, y: 2, width: 3, height: 4 };
        s.mark_dirty(r);
        assert_eq!(s.take_dirty(), vec![r]);
        assert!(s.take_dirty().is_empty());
    }

    #[test]
    fn from_data_checks_length() {
        assert!(Surface::from_data(vec![0; 16], 2, 2).is_ok());
        assert!(Surface::from_data(vec![0; 15], 2, 2).is_err());
    }
}
