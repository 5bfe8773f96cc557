use thiserror::Error;

/// Result type for text operations.
pub type Result<T> = std::result::Result<T, TextError>;

/// Errors raised by font resolution and text layout.
#[derive(Error, Debug)]
pub enum TextError {
    /// No face matched the requested style and no fallback file is configured.
    #[error("no font found for {0}")]
    FontNotFound(String),

    /// Face data could not be parsed.
    #[error("invalid font data")]
    InvalidFont,

    #[error("font I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The layout engine rejected its input.
    #[error("text layout failed: {0}")]
    Layout(String),
}
