//! Error types for usagebar-core
//!
//! Fetch failures are recoverable (the driver shows an error state and retries
//! on the next tick). A missing capability is fatal to activation.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for usagebar operations
#[derive(Error, Debug)]
pub enum CoreError {
    // ===================
    // IO Errors
    // ===================
    #[error("Failed to read file: {path}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ===================
    // Parse Errors
    // ===================
    #[error("Failed to parse JSON in {path}: {message}")]
    JsonParse {
        path: PathBuf,
        message: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid timestamp '{value}'")]
    InvalidTimestamp {
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("Failed to query database {path}")]
    Database {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Invalid access token: {reason}")]
    InvalidToken { reason: String },

    // ===================
    // Fetch Errors
    // ===================
    #[error("Failed to fetch {url}")]
    FetchFailed {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to fetch: {status} - {body}")]
    HttpStatus { status: u16, body: String },

    // ===================
    // Activation Errors
    // ===================
    #[error("Required capability not available: {capability}")]
    MissingCapability {
        capability: String,
        /// Actionable remedy shown to the user
        hint: String,
    },

    // ===================
    // Config Errors
    // ===================
    #[error("Config directory not found")]
    ConfigDirNotFound,
}

impl CoreError {
    /// Human-readable message suitable for a status tooltip
    pub fn display_message(&self) -> String {
        match self {
            CoreError::FetchFailed { source, .. } => format!("{}: {}", self, source),
            CoreError::FileRead { source, .. } => format!("{}: {}", self, source),
            CoreError::Database { source, .. } => format!("{}: {}", self, source),
            _ => self.to_string(),
        }
    }

    pub fn is_missing_capability(&self) -> bool {
        matches!(self, CoreError::MissingCapability { .. })
    }
}
