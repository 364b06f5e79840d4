//! Result types for navigate operations

use serde::Serialize;

/// Snapshot of one directory entry at listing time.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DirEntry {
    pub name: String,
    /// Path relative to the root, forward-slash separated.
    pub path: String,
    pub is_dir: bool,
    /// Size in bytes, absent for directories.
    pub size: Option<u64>,
    /// Seconds since the Unix epoch.
    pub modified: f64,
    pub previewable: bool,
}

/// Result of a directory listing.
#[derive(Debug, Clone, Serialize)]
pub struct Listing {
    pub current_path: String,
    pub files: Vec<DirEntry>,
}
