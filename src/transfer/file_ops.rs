//! Module `file_ops`
//!
//! Handles file upload and download. Uploads are streamed into a hidden
//! temporary file and renamed into place only once the whole body has been
//! received within the size limit.

use futures_util::{Stream, StreamExt};
use log::{debug, error, info, warn};
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::error::StorageError;
use crate::storage::content_type::classify;
use crate::storage::filesystem::{UPLOAD_TEMP_PREFIX, directory_exists, file_exists};
use crate::storage::validation::{ResolvedPath, Root, sanitize_filename};
use crate::transfer::results::{Disposition, DownloadPlan, UploadResult};

/// An upload body written to a hidden temporary file.
///
/// The temporary file is removed on drop unless the upload was committed.
#[derive(Debug)]
pub struct StagedUpload {
    temp_path: PathBuf,
    bytes: u64,
    committed: bool,
}

impl StagedUpload {
    pub fn temp_path(&self) -> &Path {
        &self.temp_path
    }

    pub fn bytes(&self) -> u64 {
        self.bytes
    }
}

impl Drop for StagedUpload {
    fn drop(&mut self) {
        if !self.committed {
            if let Err(e) = std::fs::remove_file(&self.temp_path) {
                if e.kind() != io::ErrorKind::NotFound {
                    warn!(
                        "Failed to remove staged upload {}: {}",
                        self.temp_path.display(),
                        e
                    );
                }
            }
        }
    }
}

/// Saves an uploaded file into `target_dir`.
///
/// The filename is sanitized first. Chunks are counted before they are
/// written, so a body over `max_bytes` never reaches the destination. An
/// existing file with the same name is replaced.
pub async fn save_upload<S, B, E>(
    root: &Root,
    target_dir: &ResolvedPath,
    filename: &str,
    body: S,
    max_bytes: u64,
) -> Result<UploadResult, StorageError>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: Into<StorageError>,
{
    // Reject before reading any of the body
    destination(root, target_dir, filename)?;

    let staged = stage_upload(target_dir, body, max_bytes).await?;
    commit_upload(root, staged, target_dir, filename).await
}

/// Streams an upload body into a hidden file inside `dir`.
///
/// The file is created exclusively under a random name, so concurrent
/// uploads into the same directory never share a temporary file.
pub async fn stage_upload<S, B, E>(
    dir: &ResolvedPath,
    body: S,
    max_bytes: u64,
) -> Result<StagedUpload, StorageError>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: Into<StorageError>,
{
    let (std_file, temp_path) = create_temp_file(dir.as_path())?;
    let mut temp_file = fs::File::from_std(std_file);

    let mut staged = StagedUpload {
        temp_path,
        bytes: 0,
        committed: false,
    };
    let mut body = std::pin::pin!(body);

    while let Some(chunk) = body.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => return Err(e.into()),
        };
        let chunk = chunk.as_ref();

        // Check the limit before writing (fail fast)
        staged.bytes += chunk.len() as u64;
        if staged.bytes > max_bytes {
            warn!(
                "Upload size limit exceeded: {} bytes > {} bytes",
                staged.bytes, max_bytes
            );
            return Err(StorageError::PayloadTooLarge(format!(
                "limit is {} bytes",
                max_bytes
            )));
        }

        temp_file.write_all(chunk).await?;
    }

    temp_file.flush().await?;
    temp_file.sync_all().await?;
    debug!(
        "Staged {} bytes in {}",
        staged.bytes,
        staged.temp_path.display()
    );
    Ok(staged)
}

fn create_temp_file(dir: &Path) -> Result<(std::fs::File, PathBuf), StorageError> {
    let mut builder = tempfile::Builder::new();
    builder.prefix(UPLOAD_TEMP_PREFIX);
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        // Same mode as a plain create, still subject to the umask
        builder.permissions(std::fs::Permissions::from_mode(0o666));
    }

    let named = builder.tempfile_in(dir).map_err(|e| {
        error!("Failed to create temporary file in {}: {}", dir.display(), e);
        StorageError::Io(e)
    })?;
    // Removal is handled by StagedUpload from here on
    named.keep().map_err(|e| StorageError::Io(e.error))
}

/// Moves a staged upload to `target_dir` under its sanitized name.
pub async fn commit_upload(
    root: &Root,
    mut staged: StagedUpload,
    target_dir: &ResolvedPath,
    filename: &str,
) -> Result<UploadResult, StorageError> {
    let final_path = destination(root, target_dir, filename)?;
    let virtual_path = root.relative_display(&final_path);

    match fs::rename(&staged.temp_path, &final_path).await {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            fs::copy(&staged.temp_path, &final_path).await?;
        }
        Err(e) => {
            error!(
                "Failed to rename {} to {}: {}",
                staged.temp_path.display(),
                final_path.display(),
                e
            );
            return Err(StorageError::Io(e));
        }
    }

    // A cross-device copy leaves the staged file behind for Drop to remove
    staged.committed = !staged.temp_path.exists();

    info!(
        "Upload completed: {} ({} bytes)",
        virtual_path, staged.bytes
    );

    Ok(UploadResult {
        file_path: final_path,
        virtual_path,
        bytes_written: staged.bytes,
    })
}

fn destination(
    root: &Root,
    target_dir: &ResolvedPath,
    filename: &str,
) -> Result<PathBuf, StorageError> {
    let file_name = sanitize_filename(filename).ok_or_else(|| {
        warn!("Rejected upload filename {:?}", filename);
        StorageError::InvalidName(filename.to_string())
    })?;

    if !directory_exists(target_dir.as_path()) {
        return Err(StorageError::NotFound(root.relative_to_root(target_dir)));
    }

    let final_path = target_dir.as_path().join(&file_name);
    if directory_exists(&final_path) {
        return Err(StorageError::AlreadyExists(root.relative_display(&final_path)));
    }
    Ok(final_path)
}

/// Prepares a file for download.
///
/// Previewable files are served inline unless the caller asks for an
/// attachment; everything else is always an attachment.
pub fn prepare_download(
    root: &Root,
    resolved: &ResolvedPath,
    as_attachment: bool,
) -> Result<DownloadPlan, StorageError> {
    if !file_exists(resolved.as_path()) {
        return Err(StorageError::NotFound(root.relative_to_root(resolved)));
    }

    let metadata = std::fs::metadata(resolved.as_path())?;
    let file_name = resolved.file_name();
    let content_type = classify(&file_name);

    let disposition = if !as_attachment && content_type.previewable {
        Disposition::Inline
    } else {
        Disposition::Attachment
    };

    Ok(DownloadPlan {
        file_path: resolved.as_path().to_path_buf(),
        file_name,
        mime: content_type.mime,
        size: metadata.len(),
        disposition,
    })
}
