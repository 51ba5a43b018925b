// this_file: src/error.rs
//! Error types for the quotecard library

use thiserror::Error;

/// Main error type for quotecard operations
#[derive(Debug, Error)]
pub enum Error {
    /// Source photo could not be acquired (network, status, missing URL, missing file)
    #[error("Acquisition error: {0}")]
    Acquisition(String),

    /// Source bytes are not a decodable image
    #[error("Image decode error: {0}")]
    ImageDecode(String),

    /// Text measurement capability failed
    #[error("Measurement error: {0}")]
    Measurement(String),

    /// Font file loading or parsing error
    #[error("Font error: {0}")]
    Font(String),

    /// Rendering error
    #[error("Rendering error: {0}")]
    Rendering(String),

    /// JPEG encoding error
    #[error("Encode error: {0}")]
    Encode(String),

    /// Invalid configuration
    #[error("Config error: {0}")]
    Config(String),

    /// Invalid input parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// JSON parsing or validation error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO operation error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for quotecard operations
pub type Result<T> = std::result::Result<T, Error>;
