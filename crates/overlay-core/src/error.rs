use thiserror::Error;

/// Document-level failures. These are the only errors that reach the caller
/// of `compose`; everything element-scoped is logged and skipped instead.
#[derive(Error, Debug)]
pub enum OverlayError {
    #[error("Failed to parse PDF: {0}")]
    ParseError(String),

    #[error("PDF is encrypted and cannot be edited")]
    Encrypted,

    #[error("PDF operation failed: {0}")]
    OperationError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("No document loaded")]
    NoDocument,

    #[error("Document is in read-only preview mode")]
    ReadOnly,
}

/// Reasons a single text element is left out of a composed document.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ElementError {
    #[error("font size must be positive and finite, got {0}")]
    InvalidFontSize(f64),

    #[error("position ({x}, {y}) is not finite and non-negative")]
    InvalidPosition { x: f64, y: f64 },

    #[error("page number must be at least 1")]
    InvalidPage,

    #[error("page {page} is outside the document (1..={page_count})")]
    PageOutOfRange { page: u32, page_count: u32 },

    #[error("failed to draw element: {0}")]
    Draw(String),
}

impl From<serde_json::Error> for OverlayError {
    fn from(err: serde_json::Error) -> Self {
        OverlayError::SerializationError(err.to_string())
    }
}
