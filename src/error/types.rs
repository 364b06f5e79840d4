//! Error types
//!
//! Defines the error kinds returned by file operations and by server startup.

use std::io;

use thiserror::Error;

/// Errors produced by path resolution and file operations.
///
/// Every variant maps to a fixed HTTP status in [`crate::error::handlers`].
#[derive(Debug, Error)]
pub enum StorageError {
    /// The path escapes the root directory.
    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Invalid name: {0}")]
    InvalidName(String),

    /// Refused to delete a directory that still has contents.
    #[error("Directory not empty: {0}")]
    NotEmpty(String),

    #[error("Not a directory: {0}")]
    NotADirectory(String),

    /// The operation is well formed but cannot apply to its target,
    /// e.g. moving a directory into itself.
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("Archive error: {0}")]
    Archive(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl From<zip::result::ZipError> for StorageError {
    fn from(error: zip::result::ZipError) -> Self {
        StorageError::Archive(error.to_string())
    }
}

/// Errors that stop the server from starting.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid root directory {path}: {reason}")]
    InvalidRoot { path: String, reason: String },

    #[error("Invalid bind address {0}")]
    InvalidAddress(String),

    #[error("TLS setup failed: {0}")]
    Tls(io::Error),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
