//! File system helpers
//!
//! Small existence checks shared by the storage and transfer operations.

use std::fs;
use std::path::Path;

/// Name prefix of partially received uploads.
pub const UPLOAD_TEMP_PREFIX: &str = ".upload-";

/// True for in-flight upload files, which are never shown to clients.
pub fn is_upload_temp(name: &str) -> bool {
    name.starts_with(UPLOAD_TEMP_PREFIX)
}

/// True when anything (file, directory or dangling link) exists at `path`.
pub fn entry_exists(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

/// Check if file exists
pub fn file_exists(path: &Path) -> bool {
    path.is_file()
}

/// Check if directory exists
pub fn directory_exists(path: &Path) -> bool {
    path.is_dir()
}
