//! Error types for the renderer.

use thiserror::Error;

/// Result type for renderer operations.
pub type Result<T> = std::result::Result<T, RenderError>;

/// Errors raised by draw and state calls.
///
/// Painting is not transactional: an error aborts the current call but
/// whatever was already painted stays on the surface.
#[derive(Error, Debug)]
pub enum RenderError {
    /// Caller supplied something the renderer cannot interpret.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Capture/restore rectangle does not fit the surface.
    #[error("invalid region ({x0}, {y0})-({x1}, {y1}) for a {width}x{height} surface")]
    InvalidRegion {
        x0: i64,
        y0: i64,
        x1: i64,
        y1: i64,
        width: u32,
        height: u32,
    },

    /// Allocation of a surface, mask or pattern failed.
    #[error("resource failure: {0}")]
    ResourceFailure(String),

    /// Font resolution or text layout failed.
    #[error("text error: {0}")]
    Text(#[from] plotpaint_text::TextError),
}

impl RenderError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}
