//! plotpaint-text: font resolution and glyph coverage rasters for the renderer.
//!
//! The renderer treats text as two opaque collaborators:
//! - [`FontResolver`]: style descriptor → loadable face + metrics
//! - [`MathLayoutEngine`]: marked-up string → geometry + 8-bit coverage raster
//!
//! Both are narrow traits so callers can swap in test doubles.

pub mod font;
pub mod math;
pub mod raster;
pub mod resolver;

mod error;

pub use error::{Result, TextError};
pub use font::{FontFace, FontMetrics, ScaledFontMetrics};
pub use math::{MathLayout, MathLayoutEngine, PlainMathLayout};
pub use raster::{CoverageRaster, GlyphInfo, TextExtents, TextRaster, rasterize_line, text_extents};
pub use resolver::{FontHandle, FontResolver, FontStyle, SystemFontResolver};
