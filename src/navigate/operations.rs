//! Navigation operations implementation

use log::{debug, info};
use std::fs;
use std::time::UNIX_EPOCH;

use crate::error::StorageError;
use crate::navigate::results::{DirEntry, Listing};
use crate::storage::content_type::is_previewable;
use crate::storage::filesystem::is_upload_temp;
use crate::storage::validation::{ResolvedPath, Root};

/// Lists the direct children of a directory.
///
/// Entries that cannot be stat'ed (vanished, permission denied, dangling
/// links) are skipped rather than failing the whole listing, and uploads
/// still in flight are hidden. Order follows
/// the directory enumeration.
pub fn list_directory(root: &Root, dir: &ResolvedPath) -> Result<Listing, StorageError> {
    let current_path = root.relative_to_root(dir);
    if !dir.as_path().is_dir() {
        return Err(StorageError::NotFound(current_path));
    }

    let entries = fs::read_dir(dir.as_path()).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => StorageError::NotFound(current_path.clone()),
        _ => StorageError::Io(e),
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                debug!("Skipping unreadable entry in {}: {}", current_path, e);
                continue;
            }
        };

        let name = entry.file_name().to_string_lossy().to_string();
        if is_upload_temp(&name) {
            continue;
        }

        let entry_path = entry.path();
        let metadata = match fs::metadata(&entry_path) {
            Ok(metadata) => metadata,
            Err(e) => {
                debug!("Skipping {}: {}", entry_path.display(), e);
                continue;
            }
        };

        let is_dir = metadata.is_dir();
        let modified = metadata
            .modified()
            .ok()
            .and_then(|time| time.duration_since(UNIX_EPOCH).ok())
            .map(|dur| dur.as_secs_f64())
            .unwrap_or(0.0);

        files.push(DirEntry {
            path: root.relative_display(&entry_path),
            is_dir,
            size: if is_dir { None } else { Some(metadata.len()) },
            modified,
            previewable: !is_dir && is_previewable(&name),
            name,
        });
    }

    info!(
        "Listed directory {:?} (real: {}) - {} entries",
        current_path,
        dir.as_path().display(),
        files.len()
    );

    Ok(Listing {
        current_path,
        files,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup() -> (TempDir, Root) {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("docs/sub")).unwrap();
        fs::write(dir.path().join("docs/report.txt"), b"quarterly").unwrap();
        fs::write(dir.path().join("docs/tool.bin"), b"\x00\x01").unwrap();
        let root = Root::new(dir.path()).unwrap();
        (dir, root)
    }

    fn find<'a>(listing: &'a Listing, name: &str) -> &'a DirEntry {
        listing.files.iter().find(|e| e.name == name).unwrap()
    }

    #[test]
    fn test_list_directory_entries() {
        let (_dir, root) = setup();
        let listing = list_directory(&root, &root.resolve("docs").unwrap()).unwrap();

        assert_eq!(listing.current_path, "docs");
        assert_eq!(listing.files.len(), 3);

        let report = find(&listing, "report.txt");
        assert_eq!(report.path, "docs/report.txt");
        assert!(!report.is_dir);
        assert_eq!(report.size, Some(9));
        assert!(report.previewable);
        assert!(report.modified > 0.0);

        let sub = find(&listing, "sub");
        assert!(sub.is_dir);
        assert_eq!(sub.size, None);
        assert!(!sub.previewable);

        assert!(!find(&listing, "tool.bin").previewable);
    }

    #[test]
    fn test_list_root_has_empty_current_path() {
        let (_dir, root) = setup();
        let listing = list_directory(&root, &root.resolve("").unwrap()).unwrap();
        assert_eq!(listing.current_path, "");
        assert_eq!(find(&listing, "docs").path, "docs");
    }

    #[test]
    fn test_list_file_is_not_found() {
        let (_dir, root) = setup();
        let file = root.resolve("docs/report.txt").unwrap();
        assert!(matches!(
            list_directory(&root, &file),
            Err(StorageError::NotFound(_))
        ));
    }

    #[test]
    fn test_in_flight_uploads_are_hidden() {
        let (dir, root) = setup();
        fs::write(dir.path().join("docs/.upload-x7Kq2p"), b"partial").unwrap();
        fs::write(dir.path().join("docs/.profile"), b"kept").unwrap();

        let listing = list_directory(&root, &root.resolve("docs").unwrap()).unwrap();
        assert_eq!(listing.files.len(), 4);
        assert!(listing.files.iter().all(|e| !e.name.starts_with(".upload-")));
        assert_eq!(find(&listing, ".profile").size, Some(4));
    }

    #[cfg(unix)]
    #[test]
    fn test_unstatable_entries_are_skipped() {
        let (dir, root) = setup();
        std::os::unix::fs::symlink(
            dir.path().join("docs/gone"),
            dir.path().join("docs/dangling"),
        )
        .unwrap();

        let listing = list_directory(&root, &root.resolve("docs").unwrap()).unwrap();
        assert_eq!(listing.files.len(), 3);
        assert!(listing.files.iter().all(|e| e.name != "dangling"));
    }
}
