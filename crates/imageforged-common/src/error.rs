//! Common error types used throughout imageforged.
//!
//! Covers the request-level input errors, per-item codec failures, retrieval
//! misses, and internal failures. Each variant maps to one HTTP status via
//! [`Error::http_status`].

/// Common error type for imageforged.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed request or a disallowed upload.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The requested output format is not one of the supported formats.
    #[error("Invalid output format: {0}")]
    UnsupportedFormat(String),

    /// Decoding or encoding of image content failed.
    #[error("Error processing image: {0}")]
    Codec(String),

    /// The caller has no batch bound to their session.
    #[error("No conversion found for this session")]
    NoSession,

    /// The requested batch or artifact does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The bound batch exists but holds no artifacts.
    #[error("No converted files available")]
    EmptyBatch,

    /// A write collided with existing state.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The request body exceeded the configured upload ceiling.
    #[error("Upload too large: limit is {limit} bytes")]
    PayloadTooLarge { limit: usize },

    /// An internal error occurred.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new InvalidInput error.
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a new UnsupportedFormat error.
    pub fn unsupported_format<S: Into<String>>(name: S) -> Self {
        Self::UnsupportedFormat(name.into())
    }

    /// Create a new Codec error.
    pub fn codec<S: Into<String>>(msg: S) -> Self {
        Self::Codec(msg.into())
    }

    /// Create a new NotFound error.
    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a new Conflict error.
    pub fn conflict<S: Into<String>>(msg: S) -> Self {
        Self::Conflict(msg.into())
    }

    /// Create a new Internal error.
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }

    /// HTTP status code this error should be reported with.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::InvalidInput(_) | Self::UnsupportedFormat(_) => 400,
            Self::NoSession | Self::NotFound(_) | Self::EmptyBatch => 404,
            Self::Conflict(_) => 409,
            Self::PayloadTooLarge { .. } => 413,
            Self::Codec(_) => 422,
            Self::Internal(_) => 500,
        }
    }

    /// Short machine-readable code used in JSON error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::UnsupportedFormat(_) => "unsupported_format",
            Self::Codec(_) => "codec_error",
            Self::NoSession => "no_session",
            Self::NotFound(_) => "not_found",
            Self::EmptyBatch => "empty_batch",
            Self::Conflict(_) => "conflict",
            Self::PayloadTooLarge { .. } => "payload_too_large",
            Self::Internal(_) => "internal_error",
        }
    }
}

/// Result type alias using the common Error type.
pub type Result<T> = std::result::Result<T, Error>;
