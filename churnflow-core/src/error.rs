//! Error types for the churnflow core library.
//!
//! Uses `thiserror` for public API error types, split by domain: artifact
//! storage and configuration loading.

use std::path::PathBuf;

/// Errors from the two-tier artifact store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A remote operation was requested but no remote store is configured.
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// The artifact is absent from every tier that was consulted.
    #[error("Artifact not found: {path}")]
    NotFound { path: String },

    #[error("Invalid logical path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    /// The local write succeeded but the remote upload did not.
    #[error("Remote upload of '{key}' failed (local copy kept at {}): {message}", local_path.display())]
    RemoteUpload {
        key: String,
        local_path: PathBuf,
        message: String,
    },

    #[error("Remote store error: {message}")]
    Remote { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound { path: path.into() }
    }

    pub fn remote(message: impl Into<String>) -> Self {
        Self::Remote {
            message: message.into(),
        }
    }

    /// Whether this error leaves a valid local artifact behind.
    pub fn is_partial_save(&self) -> bool {
        matches!(self, Self::RemoteUpload { .. })
    }
}

/// Errors from the configuration system.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Configuration parse error: {0}")]
    Parse(#[from] Box<figment::Error>),
}

/// A type alias for results using `StoreError`.
pub type StoreResult<T> = std::result::Result<T, StoreError>;
