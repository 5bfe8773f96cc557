//! Shared drawing context: a surface plus its state stack.

use std::cell::RefMut;
use std::ops::{Deref, DerefMut};
use std::rc::Rc;

use tiny_skia::{FillRule, Mask, Paint, PixmapPaint, PixmapRef, Stroke, Transform};

use crate::color::{Rgba, solid_paint};
use crate::error::{RenderError, Result};
use crate::state::{Antialias, DrawState};
use crate::surface::Surface;

pub struct Context {
    surface: Surface,
    current: DrawState,
    saved: Vec<DrawState>,
}

impl Context {
    pub fn new(surface: Surface, antialias: Antialias) -> Self {
        Self {
            surface,
            current: DrawState::new(antialias),
            saved: Vec::new(),
        }
    }

    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut Surface {
        &mut self.surface
    }

    pub fn state(&self) -> &DrawState {
        &self.current
    }

    pub fn state_mut(&mut self) -> &mut DrawState {
        &mut self.current
    }

    /// Number of saved levels below the current state.
    pub fn depth(&self) -> usize {
        self.saved.len()
    }

    pub fn save(&mut self) {
        self.saved.push(self.current.clone());
    }

    /// Pop one level; the bottom state is never popped.
    pub fn restore(&mut self) {
        if let Some(state) = self.saved.pop() {
            self.current = state;
        }
    }

    pub(crate) fn restore_to(&mut self, depth: usize) {
        while self.saved.len() > depth {
            self.restore();
        }
    }

    fn anti_alias(&self) -> bool {
        self.current.antialias.is_enabled()
    }

    /// Intersect the clip with `path` (device space, nonzero winding).
    ///
    /// `None` stands for an empty path and clips everything out.
    pub(crate) fn clip(&mut self, path: Option<&tiny_skia::Path>) -> Result<()> {
        let (w, h) = (self.surface.width(), self.surface.height());
        let mut mask = Mask::new(w, h)
            .ok_or_else(|| RenderError::ResourceFailure(format!("cannot allocate a {w}x{h} clip")))?;
        if let Some(path) = path {
            mask.fill_path(path, FillRule::Winding, self.anti_alias(), Transform::identity());
        }
        if let Some(prev) = &self.current.clip {
            for (d, s) in mask.data_mut().iter_mut().zip(prev.data()) {
                *d = ((*d as u16 * *s as u16 + 127) / 255) as u8;
            }
        }
        self.current.clip = Some(Rc::new(mask));
        Ok(())
    }

    pub(crate) fn fill(&mut self, path: &tiny_skia::Path, color: Rgba) {
        let paint = solid_paint(color, self.anti_alias());
        self.fill_with(path, &paint);
    }

    pub(crate) fn fill_with(&mut self, path: &tiny_skia::Path, paint: &Paint) {
        self.surface.pixmap_mut().fill_path(
            path,
            paint,
            FillRule::Winding,
            Transform::identity(),
            self.current.clip.as_deref(),
        );
    }

    /// Stroke with the current line style and `color`.
    pub(crate) fn stroke(&mut self, path: &tiny_skia::Path, color: Rgba) {
        let stroke = self.current.stroke();
        self.stroke_with(path, color, &stroke);
    }

    pub(crate) fn stroke_with(&mut self, path: &tiny_skia::Path, color: Rgba, stroke: &Stroke) {
        if stroke.width <= 0.0 {
            return;
        }
        let paint = solid_paint(color, self.anti_alias());
        self.surface.pixmap_mut().stroke_path(
            path,
            &paint,
            stroke,
            Transform::identity(),
            self.current.clip.as_deref(),
        );
    }

    /// Composite `pixmap` (source-over, nearest sampling) through the clip.
    pub(crate) fn draw_pixmap(&mut self, x: i32, y: i32, pixmap: PixmapRef, transform: Transform) {
        self.surface.pixmap_mut().draw_pixmap(
            x,
            y,
            pixmap,
            &PixmapPaint::default(),
            transform,
            self.current.clip.as_deref(),
        );
    }
}

/// Saves on creation and restores to the saved depth when dropped.
pub(crate) struct Scoped<'a> {
    ctx: RefMut<'a, Context>,
    depth: usize,
}

impl<'a> Scoped<'a> {
    pub(crate) fn new(mut ctx: RefMut<'a, Context>) -> Self {
        let depth = ctx.depth();
        ctx.save();
        Self { ctx, depth }
    }
}

impl Deref for Scoped<'_> {
    type Target = Context;

    fn deref(&self) -> &Context {
        &self.ctx
    }
}

impl DerefMut for Scoped<'_> {
    fn deref_mut(&mut self) -> &mut Context {
        &mut self.ctx
    }
}

impl Drop for Scoped<'_> {
    fn drop(&mut self) {
        self.ctx.restore_to(self.depth);
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;

    fn context() -> Context {
        Context::new(Surface::new(10, 10).unwrap(), Antialias::Default)
    }

    #[test]
    fn restore_never_pops_bottom() {
        let mut ctx = context();
        ctx.state_mut().line_width = 7.0;
        ctx.restore();
        assert_eq!(ctx.state().line_width, 7.0);
        ctx.save();
        ctx.state_mut().line_width = 1.0;
        ctx.restore();
        assert_eq!(ctx.state().line_width, 7.0);
        assert_eq!(ctx.depth(), 0);
    }

    #[test]
    fn scoped_restores_on_drop() {
        let cell = RefCell::new(context());
        {
            let mut scope = Scoped::new(cell.borrow_mut());
            scope.state_mut().line_width = 9.0;
            scope.save();
            assert_eq!(scope.depth(), 2);
        }
        let ctx = cell.borrow();
        assert_eq!(ctx.depth(), 0);
        assert_eq!(ctx.state().line_width, 2.0);
    }

    #[test]
    fn clips_intersect() {
        let mut ctx = context();
        let left = tiny_skia::PathBuilder::from_rect(tiny_skia::Rect::from_xywh(0.0, 0.0, 6.0, 10.0).unwrap());
        let right = tiny_skia::PathBuilder::from_rect(tiny_skia::Rect::from_xywh(4.0, 0.0, 6.0, 10.0).unwrap());
        ctx.clip(Some(&left)).unwrap();
        ctx.clip(Some(&right)).unwrap();
        let full = tiny_skia::PathBuilder::from_rect(tiny_skia::Rect::from_xywh(0.0, 0.0, 10.0, 10.0).unwrap());
        ctx.fill(&full, Rgba::new(0.0, 0.0, 1.0, 1.0));
        assert_eq!(ctx.surface().argb32_at(1, 5), Some(0));
        assert_eq!(ctx.surface().argb32_at(5, 5), Some(0xff00_00ff));
        assert_eq!(ctx.surface().argb32_at(8, 5), Some(0));
    }
}
