//! The renderer facade: binding, handle management, state setters and path drawing.

use std::cell::{Ref, RefCell, RefMut};
use std::rc::Rc;
use std::sync::Arc;

use log::{trace, warn};
use plotpaint_config::RenderConfig;
use tiny_skia::{FillRule, FilterQuality, Paint, Pattern, Pixmap, SpreadMode, Stroke};

use crate::affine::{AffineMatrix, Transform};
use crate::color::{ColorSpec, Rgba, solid_paint, with_alpha};
use crate::context::{Context, Scoped};
use crate::env::RenderEnv;
use crate::error::{RenderError, Result};
use crate::path::{Path, to_skia_path};
use crate::state::{Antialias, Dash, DrawState, Hatch, LineCap, LineJoin};
use crate::surface::Surface;

/// A renderer handle onto a shared drawing context.
///
/// Handles created with [`Renderer::new_handle`] or
/// [`Renderer::copy_properties`] share the context of their origin and
/// push one state level; whatever levels a handle still holds are popped
/// when it is dropped.
///
/// Every setter and draw call on a handle with no bound surface is a no-op.
pub struct Renderer {
    ctx: Option<Rc<RefCell<Context>>>,
    levels: usize,
    dpi: f64,
    alpha: Option<f64>,
    env: Arc<RenderEnv>,
    config: RenderConfig,
}

impl Renderer {
    pub fn new(env: Arc<RenderEnv>, config: RenderConfig) -> Self {
        Self {
            ctx: None,
            levels: 0,
            dpi: config.dpi,
            alpha: None,
            env,
            config,
        }
    }

    /// Draw into `surface` from now on, dropping any previous binding.
    pub fn bind_surface(&mut self, surface: Surface) {
        self.release();
        let antialias = Antialias::from(self.config.antialias);
        self.ctx = Some(Rc::new(RefCell::new(Context::new(surface, antialias))));
    }

    /// Allocate a transparent surface and bind to it.
    pub fn bind_new_surface(&mut self, width: u32, height: u32) -> Result<()> {
        let surface = Surface::new(width, height)?;
        self.bind_surface(surface);
        Ok(())
    }

    pub fn is_bound(&self) -> bool {
        self.ctx.is_some()
    }

    pub fn surface(&self) -> Option<Ref<'_, Surface>> {
        self.ctx.as_ref().map(|ctx| Ref::map(ctx.borrow(), Context::surface))
    }

    pub fn surface_mut(&self) -> Option<RefMut<'_, Surface>> {
        self.ctx
            .as_ref()
            .map(|ctx| RefMut::map(ctx.borrow_mut(), Context::surface_mut))
    }

    pub fn width(&self) -> u32 {
        self.surface().map_or(0, |s| s.width())
    }

    pub fn height(&self) -> u32 {
        self.surface().map_or(0, |s| s.height())
    }

    pub fn canvas_width_height(&self) -> (u32, u32) {
        (self.width(), self.height())
    }

    pub fn dpi(&self) -> f64 {
        self.dpi
    }

    pub fn set_dpi(&mut self, dpi: f64) {
        self.dpi = dpi;
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn env(&self) -> &Arc<RenderEnv> {
        &self.env
    }

    pub fn alpha(&self) -> Option<f64> {
        self.alpha
    }

    pub fn points_to_pixels(&self, points: f64) -> f64 {
        points * self.dpi / 72.0
    }

    pub fn pixels_to_points(&self, pixels: f64) -> f64 {
        pixels / (self.dpi / 72.0)
    }

    /// New handle on the same context, one state level deeper.
    pub fn new_handle(&self) -> Renderer {
        let mut handle = Renderer {
            ctx: self.ctx.clone(),
            levels: 0,
            dpi: self.dpi,
            alpha: self.alpha,
            env: self.env.clone(),
            config: self.config.clone(),
        };
        handle.push_level();
        handle
    }

    /// Pop one state level pushed by this handle.
    pub fn restore(&mut self) {
        let Some(ctx) = &self.ctx else { return };
        if self.levels == 0 {
            trace!("restore without a matching save ignored");
            return;
        }
        ctx.borrow_mut().restore();
        self.levels -= 1;
    }

    /// Share `other`'s context, DPI and alpha override, one state level deeper.
    pub fn copy_properties(&mut self, other: &Renderer) {
        self.release();
        self.ctx = other.ctx.clone();
        self.dpi = other.dpi;
        self.alpha = other.alpha;
        self.push_level();
    }

    fn push_level(&mut self) {
        if let Some(ctx) = &self.ctx {
            ctx.borrow_mut().save();
            self.levels += 1;
        }
    }

    fn release(&mut self) {
        if let Some(ctx) = self.ctx.take() {
            if let Ok(mut ctx) = ctx.try_borrow_mut() {
                for _ in 0..self.levels {
                    ctx.restore();
                }
            }
        }
        self.levels = 0;
    }

    /// Saved state for the duration of one draw call; `None` when unbound.
    pub(crate) fn scope(&self) -> Result<Option<Scoped<'_>>> {
        let Some(ctx) = &self.ctx else {
            return Ok(None);
        };
        let ctx = ctx
            .try_borrow_mut()
            .map_err(|_| RenderError::ResourceFailure("drawing context is already in use".into()))?;
        Ok(Some(Scoped::new(ctx)))
    }

    fn with_state(&self, f: impl FnOnce(&mut DrawState)) {
        if let Some(ctx) = &self.ctx {
            f(ctx.borrow_mut().state_mut());
        }
    }

    fn state<R>(&self, f: impl FnOnce(&DrawState) -> R) -> Option<R> {
        self.ctx.as_ref().map(|ctx| f(ctx.borrow().state()))
    }

    /// Stroke and text color of `ctx` with this handle's alpha override applied.
    pub(crate) fn source(&self, ctx: &Context) -> Rgba {
        with_alpha(ctx.state().source, self.alpha)
    }

    /// Global alpha override; also replaces the alpha of the current color.
    pub fn set_alpha(&mut self, alpha: Option<f64>) {
        if self.ctx.is_none() {
            return;
        }
        self.alpha = alpha;
        if let Some(a) = alpha {
            self.with_state(|s| s.source.alpha = a);
        }
    }

    pub fn set_antialiased(&mut self, antialias: impl Into<Antialias>) {
        let antialias = antialias.into();
        self.with_state(|s| s.antialias = antialias);
    }

    /// `"butt"`, `"round"` or `"projecting"`.
    pub fn set_capstyle(&mut self, capstyle: &str) -> Result<()> {
        if self.ctx.is_none() {
            return Ok(());
        }
        let cap: LineCap = capstyle.parse()?;
        self.with_state(|s| s.cap = cap);
        Ok(())
    }

    /// `"miter"`, `"round"` or `"bevel"`.
    pub fn set_joinstyle(&mut self, joinstyle: &str) -> Result<()> {
        if self.ctx.is_none() {
            return Ok(());
        }
        let join: LineJoin = joinstyle.parse()?;
        self.with_state(|s| s.join = join);
        Ok(())
    }

    /// Line width in points.
    pub fn set_linewidth(&mut self, points: f64) {
        let px = self.points_to_pixels(points);
        self.with_state(|s| s.line_width = px);
    }

    /// Current line width in points.
    pub fn get_linewidth(&self) -> f64 {
        self.state(|s| s.line_width)
            .map_or(0.0, |px| self.pixels_to_points(px))
    }

    /// Dash lengths and offset in points; `None` lengths restores solid lines.
    pub fn set_dashes(&mut self, offset: Option<f64>, lengths: Option<&[f64]>) -> Result<()> {
        if self.ctx.is_none() {
            return Ok(());
        }
        let dash = Dash::from_points(offset, lengths, self.points_to_pixels(1.0))?;
        self.with_state(|s| s.dash = dash);
        Ok(())
    }

    pub fn set_foreground(&mut self, color: &ColorSpec) -> Result<()> {
        if self.ctx.is_none() {
            return Ok(());
        }
        let color = with_alpha(color.to_rgba()?, self.alpha);
        self.with_state(|s| s.source = color);
        Ok(())
    }

    pub fn set_hatch(&mut self, hatch: Option<Hatch>) {
        self.with_state(|s| s.hatch = hatch);
    }

    /// Current color with the alpha override substituted.
    pub fn get_rgba(&self) -> Rgba {
        let source = self
            .state(|s| s.source)
            .unwrap_or_else(|| Rgba::new(0.0, 0.0, 0.0, 1.0));
        with_alpha(source, self.alpha)
    }

    pub fn get_rgb(&self) -> [f64; 3] {
        let c = self.get_rgba();
        [c.red, c.green, c.blue]
    }

    /// Intersect the clip with `[x, y, width, height]` given in source coordinates.
    pub fn set_clip_rectangle(&mut self, rect: Option<[f64; 4]>) -> Result<()> {
        let (Some(ctx), Some([x, y, w, h])) = (&self.ctx, rect) else {
            return Ok(());
        };
        let mut ctx = ctx.borrow_mut();
        let top = ctx.surface().height() as f64 - h - y;
        let mut pb = tiny_skia::PathBuilder::new();
        pb.move_to(x as f32, top as f32);
        pb.line_to((x + w) as f32, top as f32);
        pb.line_to((x + w) as f32, (top + h) as f32);
        pb.line_to(x as f32, (top + h) as f32);
        pb.close();
        ctx.clip(pb.finish().as_ref())
    }

    /// Intersect the clip with `path` under `transform`.
    pub fn set_clip_path(&mut self, clip: Option<(&Path, &dyn Transform)>) -> Result<()> {
        let (Some(ctx), Some((path, transform))) = (&self.ctx, clip) else {
            return Ok(());
        };
        let mut ctx = ctx.borrow_mut();
        let matrix = AffineMatrix::from_transform(transform, ctx.surface().height() as f64)?;
        let device = to_skia_path(&path.segments(&matrix));
        ctx.clip(device.as_ref())
    }

    /// Fill with `fill` (if any), then hatch, then stroke with the current state.
    pub fn draw_path(&self, path: &Path, transform: &dyn Transform, fill: Option<&ColorSpec>) -> Result<()> {
        let Some(mut ctx) = self.scope()? else {
            return Ok(());
        };
        let matrix = AffineMatrix::from_transform(transform, ctx.surface().height() as f64)?;
        let fill = fill.map(|c| c.to_rgba()).transpose()?;
        self.paint_path(&mut ctx, path, &matrix, fill)
    }

    pub(crate) fn paint_path(
        &self,
        ctx: &mut Context,
        path: &Path,
        matrix: &AffineMatrix,
        fill: Option<Rgba>,
    ) -> Result<()> {
        let Some(device) = to_skia_path(&path.segments(matrix)) else {
            return Ok(());
        };
        if let Some(fill) = fill {
            ctx.fill(&device, with_alpha(fill, self.alpha));
        }
        if let Some(hatch) = ctx.state().hatch.clone() {
            self.paint_hatch(ctx, &device, &hatch)?;
        }
        let source = self.source(ctx);
        ctx.stroke(&device, source);
        Ok(())
    }

    fn paint_hatch(&self, ctx: &mut Context, device: &tiny_skia::Path, hatch: &Hatch) -> Result<()> {
        // One tile per inch, truncated to whole pixels.
        let size = self.dpi as u32;
        if size == 0 {
            warn!("dpi {} gives an empty hatch tile, skipping hatch", self.dpi);
            return Ok(());
        }
        let mut tile = Pixmap::new(size, size)
            .ok_or_else(|| RenderError::ResourceFailure(format!("cannot allocate a {size}px hatch tile")))?;
        let anti_alias = ctx.state().antialias.is_enabled();
        let side = size as f64;
        let matrix = AffineMatrix::new(side, 0.0, 0.0, -side, 0.0, side);
        if let Some(hatch_path) = to_skia_path(&hatch.path.segments(&matrix)) {
            let paint = solid_paint(hatch.color, anti_alias);
            let identity = tiny_skia::Transform::identity();
            tile.as_mut().fill_path(&hatch_path, &paint, FillRule::Winding, identity, None);
            let stroke = Stroke {
                width: self.points_to_pixels(hatch.linewidth_pt) as f32,
                ..Stroke::default()
            };
            if stroke.width > 0.0 {
                tile.as_mut().stroke_path(&hatch_path, &paint, &stroke, identity, None);
            }
        }
        let paint = Paint {
            shader: Pattern::new(
                tile.as_ref(),
                SpreadMode::Repeat,
                FilterQuality::Nearest,
                1.0,
                tiny_skia::Transform::identity(),
            ),
            anti_alias,
            ..Paint::default()
        };
        ctx.fill_with(device, &paint);
        Ok(())
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        self.release();
    }
}
