// src/error.rs

//! Unified error handling for the bookshelf library.

use std::fmt;

use thiserror::Error;

/// Result type alias for bookshelf operations.
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

    /// Search API answered with a non-success status
    #[error("Search API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Storage backend unavailable or failed
    #[error("Storage error in {backend}: {message}")]
    Storage { backend: String, message: String },

    /// A write violated a key constraint
    #[error("Constraint error: {0}")]
    Constraint(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

impl AppError {
    /// Create a search API error.
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Create a storage error for the named backend.
    pub fn storage(backend: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Storage {
            backend: backend.into(),
            message: message.to_string(),
        }
    }

    /// Create a key constraint error.
    pub fn constraint(message: impl Into<String>) -> Self {
        Self::Constraint(message.into())
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}
