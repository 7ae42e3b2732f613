//! Error types for melscope

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the feature pipeline and the analysis engine.
#[derive(Error, Debug)]
pub enum Error {
    /// Signal is shorter than a single analysis frame
    #[error("Insufficient data: {len} samples, need at least {frame_size}")]
    InsufficientData { len: usize, frame_size: usize },

    /// Two pipeline stages disagree on a tensor dimension
    #[error("Dimension mismatch in {stage}: expected {expected}, got {actual}")]
    DimensionMismatch {
        stage: &'static str,
        expected: usize,
        actual: usize,
    },

    /// A zero-element tensor reached the normalizer
    #[error("Empty input: nothing to normalize")]
    EmptyInput,

    /// The audio buffer has no channels
    #[error("No audio channels found in the buffer")]
    NoChannels,

    /// Invalid pipeline or engine configuration
    #[error("Configuration error: {0}")]
    InvalidConfig(String),

    /// `analyze` called before `initialize`
    #[error("Analysis engine not initialized")]
    NotInitialized,

    /// Resampler failed while processing samples
    #[error("Resampling failed: {0}")]
    Resample(String),

    /// Model could not be loaded
    #[error("Failed to load model: {0}")]
    ModelLoad(String),

    /// Model invocation failed
    #[error("Inference error: {0}")]
    ModelInference(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// The input could not be analyzed (bad or too-short audio).
    pub fn is_data_error(&self) -> bool {
        matches!(
            self,
            Error::InsufficientData { .. } | Error::EmptyInput | Error::NoChannels
        )
    }

    /// The engine itself is unavailable (not initialized, model failures).
    pub fn is_engine_error(&self) -> bool {
        matches!(
            self,
            Error::NotInitialized | Error::ModelLoad(_) | Error::ModelInference(_)
        )
    }
}
