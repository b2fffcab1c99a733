//! Error handling for Neuramp
//!
//! All fallible operations live on the control/loader path. The real-time
//! processing path is infallible by construction and has no error type.

use thiserror::Error;

/// Result type alias for Neuramp operations
pub type Result<T> = std::result::Result<T, NeurampError>;

/// Main error type for Neuramp operations
///
/// Every variant is a load-time data error: a failed model load is
/// reported through one of these and leaves the previously active model
/// untouched.
#[derive(Error, Debug)]
pub enum NeurampError {
    #[error("Model document has no usable in_shape")]
    MissingInputShape,

    #[error("Unsupported model input width: {width} (only single-sample input is supported)")]
    UnsupportedInputWidth { width: i64 },

    #[error("Unsupported in_skip value: {value} (must be 0 or 1)")]
    UnsupportedInputSkip { value: i64 },

    #[error("Unable to identify a known model architecture")]
    UnknownArchitecture,

    #[error("Malformed model weights: {reason}")]
    MalformedWeights { reason: String },

    // I/O Errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization Errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl NeurampError {
    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            NeurampError::MissingInputShape => "MISSING_INPUT_SHAPE",
            NeurampError::UnsupportedInputWidth { .. } => "UNSUPPORTED_INPUT_WIDTH",
            NeurampError::UnsupportedInputSkip { .. } => "UNSUPPORTED_INPUT_SKIP",
            NeurampError::UnknownArchitecture => "UNKNOWN_ARCHITECTURE",
            NeurampError::MalformedWeights { .. } => "MALFORMED_WEIGHTS",
            NeurampError::Io(_) => "IO_ERROR",
            NeurampError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }
}
