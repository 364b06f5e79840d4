//! Navigate module
//!
//! Handles directory listings for the file browser.

mod operations;
mod results;

// Re-export public types and functions
pub use operations::list_directory;
pub use results::{DirEntry, Listing};
