//! Storage operations
//!
//! Handles directory creation, deletion and moves, single and bulk. Every
//! operation takes paths already confined by the [`Root`]. Deletes and moves
//! act on a final symlink itself, never on what it points to.

use log::{error, info};
use std::fs;
use std::io;
use std::path::PathBuf;

use crate::error::StorageError;
use crate::storage::filesystem::{directory_exists, entry_exists};
use crate::storage::results::BulkResult;
use crate::storage::validation::{ResolvedPath, Root, validate_directory_name};

/// Creates a directory named `name` inside `parent`.
pub fn create_directory(
    root: &Root,
    parent: &ResolvedPath,
    name: &str,
) -> Result<PathBuf, StorageError> {
    let name = validate_directory_name(name)?;

    if !directory_exists(parent.as_path()) {
        return Err(StorageError::NotFound(root.relative_to_root(parent)));
    }

    let target = parent.as_path().join(name);
    let virtual_path = root.relative_display(&target);
    if entry_exists(&target) {
        return Err(StorageError::AlreadyExists(virtual_path));
    }

    fs::create_dir_all(&target).map_err(|e| match e.kind() {
        io::ErrorKind::AlreadyExists => StorageError::AlreadyExists(virtual_path.clone()),
        _ => {
            error!("Failed to create directory {}: {}", target.display(), e);
            StorageError::Io(e)
        }
    })?;

    info!("Created directory {} (real: {})", virtual_path, target.display());
    Ok(target)
}

/// Deletes a file, or a directory only when it is empty.
pub fn delete_one(root: &Root, resolved: &ResolvedPath) -> Result<(), StorageError> {
    let virtual_path = root.relative_to_root(resolved);
    if resolved.as_path() == root.path() {
        return Err(StorageError::InvalidOperation(
            "cannot delete the root directory".into(),
        ));
    }

    let metadata = match fs::symlink_metadata(resolved.as_path()) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(StorageError::NotFound(virtual_path));
        }
        Err(e) => return Err(StorageError::Io(e)),
    };

    let result = if metadata.is_dir() {
        fs::remove_dir(resolved.as_path())
    } else {
        fs::remove_file(resolved.as_path())
    };

    match result {
        Ok(()) => {
            info!(
                "Deleted {} (real: {})",
                virtual_path,
                resolved.as_path().display()
            );
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Err(StorageError::NotFound(virtual_path)),
        Err(e) if e.kind() == io::ErrorKind::DirectoryNotEmpty => {
            Err(StorageError::NotEmpty(virtual_path))
        }
        Err(e) => {
            error!("Failed to delete {}: {}", resolved.as_path().display(), e);
            Err(StorageError::Io(e))
        }
    }
}

/// Deletes every path independently, reporting one result per input in order.
pub fn bulk_delete(root: &Root, paths: &[String]) -> Vec<BulkResult> {
    let results: Vec<BulkResult> = paths
        .iter()
        .map(|path| {
            let outcome = root
                .resolve_entry(path)
                .and_then(|resolved| delete_one(root, &resolved));
            BulkResult::from_outcome(path, outcome)
        })
        .collect();

    info!(
        "Bulk delete: {}/{} succeeded",
        results.iter().filter(|r| r.success).count(),
        results.len()
    );
    results
}

/// Moves every source path into `target`, keeping base names.
///
/// The target is checked once; if it is unusable the whole call fails.
/// Source failures only affect their own entry.
pub fn bulk_move(
    root: &Root,
    paths: &[String],
    target: &str,
) -> Result<Vec<BulkResult>, StorageError> {
    let target_dir = root.resolve(target)?;
    if !directory_exists(target_dir.as_path()) {
        return Err(StorageError::NotADirectory(target.to_string()));
    }

    let results: Vec<BulkResult> = paths
        .iter()
        .map(|path| {
            let outcome = root
                .resolve_entry(path)
                .and_then(|source| move_into(root, &source, &target_dir));
            BulkResult::from_outcome(path, outcome)
        })
        .collect();

    info!(
        "Bulk move into {}: {}/{} succeeded",
        root.relative_to_root(&target_dir),
        results.iter().filter(|r| r.success).count(),
        results.len()
    );
    Ok(results)
}

fn move_into(
    root: &Root,
    source: &ResolvedPath,
    target_dir: &ResolvedPath,
) -> Result<(), StorageError> {
    let virtual_source = root.relative_to_root(source);
    if source.as_path() == root.path() {
        return Err(StorageError::InvalidOperation(
            "cannot move the root directory".into(),
        ));
    }
    if target_dir.as_path().starts_with(source.as_path()) {
        return Err(StorageError::InvalidOperation(format!(
            "cannot move {} into itself",
            virtual_source
        )));
    }

    let name = source.as_path().file_name().ok_or_else(|| {
        StorageError::InvalidOperation(format!("{} has no file name", virtual_source))
    })?;
    let destination = target_dir.as_path().join(name);
    if entry_exists(&destination) {
        return Err(StorageError::AlreadyExists(root.relative_display(&destination)));
    }

    match fs::rename(source.as_path(), &destination) {
        Ok(()) => {
            info!(
                "Moved {} to {}",
                virtual_source,
                root.relative_display(&destination)
            );
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Err(StorageError::NotFound(virtual_source)),
        Err(e) => {
            error!(
                "Failed to move {} to {}: {}",
                source.as_path().display(),
                destination.display(),
                e
            );
            Err(StorageError::Io(e))
        }
    }
}
