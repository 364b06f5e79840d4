//! Zip archive assembly for bulk downloads
//!
//! Each archive lives alone in a private temporary directory so that
//! concurrent requests never share files.

use log::{debug, info};
use std::collections::HashSet;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::StorageError;
use crate::storage::filesystem::file_exists;
use crate::storage::validation::Root;

/// Filename clients receive for bulk downloads.
pub const ARCHIVE_NAME: &str = "download.zip";

/// A built archive and the temporary directory that holds it.
#[derive(Debug)]
pub struct ArchiveJob {
    dir: TempDir,
    zip_path: PathBuf,
    entries: Vec<String>,
}

impl ArchiveJob {
    pub fn zip_path(&self) -> &Path {
        &self.zip_path
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    /// Entry names in the order they were written.
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Removes the temporary directory and the archive inside it.
    pub fn cleanup(self) -> io::Result<()> {
        self.dir.close()
    }
}

/// Builds a zip of the given files.
///
/// Paths that fail to resolve, do not exist or are directories are left out.
/// Entries are named by their path relative to the root so files from
/// different directories never collide.
pub fn build_zip(root: &Root, paths: &[String]) -> Result<ArchiveJob, StorageError> {
    let dir = tempfile::Builder::new()
        .prefix("pi-file-server-")
        .tempdir()?;
    let zip_path = dir.path().join(ARCHIVE_NAME);

    let mut zip = ZipWriter::new(BufWriter::new(File::create(&zip_path)?));
    let mut seen = HashSet::new();
    let mut entries = Vec::new();

    for path in paths {
        let resolved = match root.resolve(path) {
            Ok(resolved) => resolved,
            Err(e) => {
                debug!("Leaving {:?} out of archive: {}", path, e);
                continue;
            }
        };
        if !file_exists(resolved.as_path()) {
            debug!("Leaving {:?} out of archive: not a file", path);
            continue;
        }

        let entry_name = root.relative_to_root(&resolved);
        if !seen.insert(entry_name.clone()) {
            continue;
        }

        let mut source = match File::open(resolved.as_path()) {
            Ok(file) => file,
            Err(e) => {
                debug!("Leaving {:?} out of archive: {}", path, e);
                continue;
            }
        };
        let size = source.metadata().map(|m| m.len()).unwrap_or(0);
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .large_file(size >= u64::from(u32::MAX));

        zip.start_file(entry_name.as_str(), options)?;
        io::copy(&mut source, &mut zip)?;
        entries.push(entry_name);
    }

    let mut writer = zip.finish()?;
    writer.flush()?;

    info!(
        "Built archive {} with {}/{} requested files",
        zip_path.display(),
        entries.len(),
        paths.len()
    );

    Ok(ArchiveJob {
        dir,
        zip_path,
        entries,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Read;
    use zip::ZipArchive;

    fn setup() -> (TempDir, Root) {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("docs")).unwrap();
        fs::create_dir_all(dir.path().join("photos")).unwrap();
        fs::write(dir.path().join("docs/notes.txt"), b"from docs").unwrap();
        fs::write(dir.path().join("photos/notes.txt"), b"from photos").unwrap();
        let root = Root::new(dir.path()).unwrap();
        (dir, root)
    }

    fn read_entries(path: &Path) -> Vec<(String, String)> {
        let mut archive = ZipArchive::new(File::open(path).unwrap()).unwrap();
        (0..archive.len())
            .map(|i| {
                let mut entry = archive.by_index(i).unwrap();
                let mut content = String::new();
                entry.read_to_string(&mut content).unwrap();
                (entry.name().to_string(), content)
            })
            .collect()
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_archive_skips_missing_and_directories() {
        let (_dir, root) = setup();
        let job = build_zip(&root, &strings(&["docs/notes.txt", "docs/missing.txt", "photos"])).unwrap();

        assert_eq!(job.entries(), ["docs/notes.txt".to_string()]);
        assert_eq!(
            read_entries(job.zip_path()),
            vec![("docs/notes.txt".to_string(), "from docs".to_string())]
        );
    }

    #[test]
    fn test_archive_keeps_relative_paths() {
        let (_dir, root) = setup();
        let job = build_zip(
            &root,
            &strings(&["docs/notes.txt", "photos/notes.txt", "docs/notes.txt"]),
        )
        .unwrap();

        let entries = read_entries(job.zip_path());
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].0, "docs/notes.txt");
        assert_eq!(entries[1], ("photos/notes.txt".to_string(), "from photos".to_string()));
    }

    #[test]
    fn test_archive_ignores_escapes() {
        let (_dir, root) = setup();
        let job = build_zip(&root, &strings(&["../etc/passwd", "/etc/passwd"])).unwrap();
        assert!(job.entries().is_empty());
        assert!(read_entries(job.zip_path()).is_empty());
    }

    #[test]
    fn test_archive_jobs_are_private_and_removable() {
        let (_dir, root) = setup();
        let first = build_zip(&root, &strings(&["docs/notes.txt"])).unwrap();
        let second = build_zip(&root, &strings(&["docs/notes.txt"])).unwrap();
        assert_ne!(first.dir(), second.dir());
        assert_eq!(first.zip_path().file_name().unwrap(), ARCHIVE_NAME);

        let dir = first.dir().to_path_buf();
        first.cleanup().unwrap();
        assert!(!dir.exists());
        assert!(second.zip_path().exists());
    }
}
