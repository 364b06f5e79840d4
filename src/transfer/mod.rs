//! Transfer module
//!
//! Handles streaming uploads, single file downloads and zip archives for
//! bulk downloads, including delayed removal of served archives.

pub mod archive;
pub mod cleanup;
pub mod file_ops;
pub mod results;

pub use archive::{ARCHIVE_NAME, ArchiveJob, build_zip};
pub use cleanup::CleanupQueue;
pub use file_ops::{StagedUpload, commit_upload, prepare_download, save_upload, stage_upload};
pub use results::{Disposition, DownloadPlan, UploadResult};
