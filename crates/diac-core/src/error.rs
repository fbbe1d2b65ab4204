//! Error types for diacritics restoration.

use thiserror::Error;

/// Main error type for restoration operations.
#[derive(Error, Debug)]
pub enum DiacError {
    /// Model loading errors.
    #[error("Model error: {0}")]
    Model(String),

    /// Inference errors.
    #[error("Inference error: {0}")]
    Inference(String),

    /// Configuration errors.
    #[error("Config error: {0}")]
    Config(String),

    /// Character dictionary errors (missing file, schema violations).
    #[error("Dictionary error: {0}")]
    Dictionary(String),

    /// Subword tokenizer errors.
    #[error("Tokenizer error: {0}")]
    Tokenizer(String),

    /// Model bundle download errors.
    #[error("Download error: {0}")]
    Download(String),

    /// Malformed model version record.
    #[error("Version error: {0}")]
    Version(String),

    /// I/O errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Candle tensor errors.
    #[error("Tensor error: {0}")]
    Candle(#[from] candle_core::Error),

    /// JSON parsing errors.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for restoration operations.
pub type DiacResult<T> = Result<T, DiacError>;
