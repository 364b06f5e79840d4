//! Transfer result types
//!
//! Defines result structures returned by transfer operations.

use std::path::PathBuf;

/// Result of a completed upload.
#[derive(Debug, Clone)]
pub struct UploadResult {
    pub file_path: PathBuf,
    /// Path relative to the root.
    pub virtual_path: String,
    pub bytes_written: u64,
}

/// How the browser should treat a downloaded file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    Inline,
    Attachment,
}

/// Everything the HTTP layer needs to stream a file back.
#[derive(Debug, Clone)]
pub struct DownloadPlan {
    pub file_path: PathBuf,
    pub file_name: String,
    pub mime: String,
    pub size: u64,
    pub disposition: Disposition,
}

impl DownloadPlan {
    /// Value for the `Content-Disposition` header.
    ///
    /// Carries an ASCII fallback name plus the RFC 5987 encoded original.
    pub fn content_disposition(&self) -> String {
        let kind = match self.disposition {
            Disposition::Inline => "inline",
            Disposition::Attachment => "attachment",
        };
        let fallback: String = self
            .file_name
            .chars()
            .map(|c| {
                if (c.is_ascii_graphic() && c != '"' && c != '\\') || c == ' ' {
                    c
                } else {
                    '_'
                }
            })
            .collect();

        format!(
            "{}; filename=\"{}\"; filename*=UTF-8''{}",
            kind,
            fallback,
            urlencoding::encode(&self.file_name)
        )
    }
}
