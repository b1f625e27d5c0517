//! Error types for the page quality analyzer.
//!
//! This module provides structured error handling with:
//! - `AppError`: Domain-specific errors for analysis operations
//! - `Result<T>`: Type alias for Results using AppError

use thiserror::Error;

/// Domain-specific errors for analysis operations.
#[derive(Debug, Error)]
pub enum AppError {
    /// Invalid or malformed URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Network request failed
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Failed to parse HTML or service output
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Snapshot acquisition failed; nothing can be analyzed
    #[error("Snapshot acquisition failed: {0}")]
    AcquisitionFailed(String),

    /// External service error (markup validator, PageSpeed, etc.)
    #[error("Service error ({service}): {message}")]
    ServiceError { service: &'static str, message: String },

    /// Generic error with context
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Create a network error
    pub fn network(msg: impl Into<String>) -> Self {
        Self::NetworkError(msg.into())
    }

    /// Create a service error
    pub fn service(service: &'static str, msg: impl Into<String>) -> Self {
        Self::ServiceError { service, message: msg.into() }
    }

    /// Create an acquisition error
    pub fn acquisition(msg: impl Into<String>) -> Self {
        Self::AcquisitionFailed(msg.into())
    }
}

/// Result type alias using AppError.
pub type Result<T> = std::result::Result<T, AppError>;
