// src/error.rs
//
// Error types for the spectrogram pipeline.

use thiserror::Error;

/// Top-level error type for the library API.
#[derive(Debug, Error)]
pub enum SpectrogramError {
    /// The transform model would not fit in the configured cache budget.
    #[error("insufficient memory for FFT model: {required_bytes} bytes needed, limit is {limit_bytes}")]
    TransformAllocation {
        required_bytes: u64,
        limit_bytes: u64,
    },

    /// A parameter was outside its valid range.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// No audio source is attached.
    #[error("no audio source attached")]
    NoSource,

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias so callers can write `Result<T>` instead of `Result<T, SpectrogramError>`.
pub type Result<T> = std::result::Result<T, SpectrogramError>;
