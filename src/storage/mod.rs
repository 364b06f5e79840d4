//! File system storage management
//!
//! Path confinement, content classification and file operations.

pub mod content_type;
pub mod filesystem;
pub mod operations;
pub mod results;
pub mod validation;

pub use content_type::{ContentType, classify};
pub use operations::{bulk_delete, bulk_move, create_directory, delete_one};
pub use results::BulkResult;
pub use validation::{ResolvedPath, Root, sanitize_filename};
