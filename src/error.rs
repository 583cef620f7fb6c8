//! Error types for the two failure classes of a transcription session.
//!
//! Both classes recover to a stable `Failed` state with a fixed user-facing
//! message; the variants here carry the underlying detail, which is only
//! ever logged for diagnostics.

use thiserror::Error;

/// Failure while acquiring or initializing a speech model.
#[derive(Debug, Error)]
pub enum ModelLoadError {
    #[error("model download failed: {0}")]
    Download(String),

    #[error("downloaded model failed validation: expected {expected} bytes, got {actual}")]
    SizeMismatch { expected: u64, actual: u64 },

    #[error("failed to initialize inference context: {0}")]
    Init(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Failure while processing one submitted audio file.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("audio decoding failed: {0}")]
    Decode(String),

    #[error("unsupported audio input: {0}")]
    UnsupportedInput(String),

    #[error("inference failed: {0}")]
    Inference(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
