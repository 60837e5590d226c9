// src/error.rs

//! Unified error handling for the snapshot application.

use std::fmt;

use thiserror::Error;

/// Result type alias for snapshot operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// Regex compilation failed
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    /// The remote source refused the request because the quota was exceeded.
    ///
    /// This is the only variant the extractor retries.
    #[error("Rate limited by remote source (retry after {retry_after_secs:?}s)")]
    RateLimited { retry_after_secs: Option<u64> },

    /// The remote source answered with a non-success status
    #[error("API error {status} for {url}")]
    Api { status: u16, url: String },

    /// Sort mode is not one of new, hot, rising, top, controversial
    #[error("Unsupported sort mode: {0}")]
    UnsupportedSortMode(String),

    /// Time window is not one of all, year, month, week, day, hour
    #[error("Unsupported time window: {0}")]
    UnsupportedTimeWindow(String),

    /// A column kept failing with rate-limit errors
    #[error("Max attempts of extracting {field} reached ({attempts} attempts)")]
    ExtractionExhausted { field: String, attempts: u32 },

    /// A field accessor failed for a reason other than rate limiting
    #[error("Extraction error for {field}: {message}")]
    Extraction { field: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

impl AppError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create an extraction error for a field.
    pub fn extraction(field: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Extraction {
            field: field.into(),
            message: message.to_string(),
        }
    }

    /// Whether the error is a transient rate-limit failure.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }
}
