pub mod face;
pub mod metrics;

pub use face::FontFace;
pub use metrics::{FontMetrics, ScaledFontMetrics};
