//! Storage result types
//!
//! Defines result structures returned by storage operations.

use serde::Serialize;

use crate::error::StorageError;

/// Outcome of one path in a bulk operation.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct BulkResult {
    pub path: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BulkResult {
    pub fn from_outcome(path: &str, outcome: Result<(), StorageError>) -> Self {
        match outcome {
            Ok(()) => Self {
                path: path.to_string(),
                success: true,
                error: None,
            },
            Err(e) => Self {
                path: path.to_string(),
                success: false,
                error: Some(e.to_string()),
            },
        }
    }
}
