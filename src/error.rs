//! Error types for the background removal service

use thiserror::Error;

/// Result type alias for background removal operations
pub type Result<T> = std::result::Result<T, RemovalError>;

/// Error taxonomy for the request pipeline and model lifecycle
#[derive(Error, Debug)]
pub enum RemovalError {
    /// Input/output errors (model file missing, cache directory unwritable, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Image decoding or encoding errors from the `image` crate
    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    /// Uploaded or fetched payload exceeds the configured size cap
    #[error("File too large ({size} bytes, max {limit})")]
    TooLarge {
        /// Observed payload size in bytes
        size: usize,
        /// Configured cap in bytes
        limit: usize,
    },

    /// Remote image URL was unreachable or returned a non-success status
    #[error("Upstream fetch failed: {0}")]
    UpstreamFetch(String),

    /// Payload could not be decoded into an image (bad base64, bad bytes)
    #[error("Decode failed: {0}")]
    Decode(String),

    /// Model inference failed mid-request
    #[error("Processing failed: {0}")]
    Processing(String),

    /// Model loading, download, or session initialization errors
    #[error("Model error: {0}")]
    Model(String),

    /// Invalid configuration or parameters
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl RemovalError {
    /// Create a new upstream fetch error
    pub fn upstream_fetch<S: Into<String>>(msg: S) -> Self {
        Self::UpstreamFetch(msg.into())
    }

    /// Create a new decode error
    pub fn decode<S: Into<String>>(msg: S) -> Self {
        Self::Decode(msg.into())
    }

    /// Create a new processing error
    pub fn processing<S: Into<String>>(msg: S) -> Self {
        Self::Processing(msg.into())
    }

    /// Create a new model error
    pub fn model<S: Into<String>>(msg: S) -> Self {
        Self::Model(msg.into())
    }

    /// Create a new invalid configuration error
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a size-cap error
    #[must_use]
    pub fn too_large(size: usize, limit: usize) -> Self {
        Self::TooLarge { size, limit }
    }

    /// Create a configuration error with the valid range spelled out
    pub fn config_value_error<T: std::fmt::Display>(
        parameter: &str,
        value: T,
        valid_range: &str,
    ) -> Self {
        Self::InvalidConfig(format!(
            "Invalid {parameter}: {value} (valid range: {valid_range})"
        ))
    }
}
