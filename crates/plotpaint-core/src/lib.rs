//! plotpaint-core: a 2D vector renderer drawing onto an in-memory pixel surface.
//!
//! Callers set state on a [`Renderer`] (colors, line style, clip) and then
//! issue draw calls: paths, marker batches, path collections, Gouraud
//! meshes, images and text. Source coordinates have their origin at the
//! bottom-left; every draw call flips them onto the top-left device grid
//! of the bound [`Surface`].

pub mod affine;
pub mod collection;
pub mod color;
pub mod context;
pub mod env;
pub mod error;
pub mod markers;
pub mod mesh;
pub mod path;
pub mod raster;
pub mod region;
pub mod renderer;
pub mod state;
pub mod surface;
pub mod text;

pub use affine::{AffineMatrix, Transform};
pub use collection::{DashSpec, Instance, OffsetPosition, PathCollection, instance_plan};
pub use color::{ColorSpec, Rgba};
pub use env::RenderEnv;
pub use error::{RenderError, Result};
pub use raster::RgbaRaster;
pub use markers::{MarkerInfo, MarkerStrategy, choose_strategy};
pub use mesh::GouraudMesh;
pub use path::{Path, PathBuilder, PathCode, PathSegment};
pub use region::Region;
pub use renderer::Renderer;
pub use state::{Antialias, Dash, DrawState, Hatch, LineCap, LineJoin};
pub use surface::{DirtyRect, Surface};

pub use plotpaint_config::RenderConfig;
pub use plotpaint_text::{FontStyle, TextExtents};
