//! Path validation
//!
//! Resolves client-supplied relative paths against the root directory and
//! rejects anything that would land outside of it.

use log::{debug, warn};
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use crate::error::StorageError;

/// Characters never allowed in a directory name created by a client.
const FORBIDDEN_NAME_CHARS: [char; 9] = ['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// The directory every operation is confined to.
///
/// Holds a canonical absolute path. Built once at startup and shared
/// read-only between requests.
#[derive(Debug, Clone)]
pub struct Root {
    path: PathBuf,
}

/// A confined path: the root itself or one of its descendants.
///
/// Only [`Root::resolve`] and [`Root::resolve_entry`] can produce one. The
/// path is canonical, except that `resolve_entry` keeps a final symlink
/// unresolved under its canonical parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    path: PathBuf,
}

impl ResolvedPath {
    pub fn as_path(&self) -> &Path {
        &self.path
    }

    /// Base name of the path, empty for the filesystem root.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default()
    }
}

impl AsRef<Path> for ResolvedPath {
    fn as_ref(&self) -> &Path {
        &self.path
    }
}

impl Root {
    /// Canonicalize `path` and make sure it is an existing directory.
    pub fn new(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "root directory cannot be empty",
            ));
        }

        let canonical = path.canonicalize()?;
        if !canonical.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::NotADirectory,
                format!("{} is not a directory", canonical.display()),
            ));
        }

        Ok(Self { path: canonical })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Resolve a relative path into a confined canonical path.
    ///
    /// An empty path is the root itself. Absolute paths are refused outright.
    /// A path that does not exist reports `NotFound` only when its parent is
    /// an existing directory inside the root, and `AccessDenied` otherwise.
    pub fn resolve(&self, relative: &str) -> Result<ResolvedPath, StorageError> {
        if relative.is_empty() {
            return Ok(ResolvedPath {
                path: self.path.clone(),
            });
        }

        reject_injection(relative)?;

        let joined = self.path.join(relative);
        match joined.canonicalize() {
            Ok(canonical) => {
                if self.contains(&canonical) {
                    Ok(ResolvedPath { path: canonical })
                } else {
                    warn!(
                        "Path {:?} resolved to {} outside of root",
                        relative,
                        canonical.display()
                    );
                    Err(StorageError::AccessDenied(relative.to_string()))
                }
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                if self.parent_is_confined_dir(&joined) {
                    Err(StorageError::NotFound(relative.to_string()))
                } else {
                    debug!("Unresolvable path {:?}: {}", relative, e);
                    Err(StorageError::AccessDenied(relative.to_string()))
                }
            }
            Err(e) => {
                debug!("Failed to canonicalize {:?}: {}", relative, e);
                Err(StorageError::AccessDenied(relative.to_string()))
            }
        }
    }

    /// Resolve a path naming an entry to act on rather than read through.
    ///
    /// When the last component is a symlink whose parent lies inside the
    /// root, the link itself is returned, whatever it points to. Everything
    /// else resolves as in [`Root::resolve`].
    pub fn resolve_entry(&self, relative: &str) -> Result<ResolvedPath, StorageError> {
        if relative.is_empty() {
            return self.resolve(relative);
        }
        reject_injection(relative)?;

        match self.confined_link(relative) {
            Some(link) => {
                debug!("Path {:?} names link {}", relative, link.path.display());
                Ok(link)
            }
            None => self.resolve(relative),
        }
    }

    fn confined_link(&self, relative: &str) -> Option<ResolvedPath> {
        let joined = self.path.join(relative);
        let metadata = fs::symlink_metadata(&joined).ok()?;
        if !metadata.file_type().is_symlink() {
            return None;
        }

        let name = joined.file_name()?;
        let parent = joined.parent()?.canonicalize().ok()?;
        if !self.contains(&parent) {
            return None;
        }
        Some(ResolvedPath {
            path: parent.join(name),
        })
    }

    /// Render a resolved path relative to the root with forward slashes.
    ///
    /// The root itself renders as an empty string.
    pub fn relative_to_root(&self, resolved: &ResolvedPath) -> String {
        self.relative_display(resolved.as_path())
    }

    /// Same as [`Root::relative_to_root`] for paths known to live under the root.
    pub fn relative_display(&self, path: &Path) -> String {
        match path.strip_prefix(&self.path) {
            Ok(rel) => rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/"),
            Err(_) => String::new(),
        }
    }

    /// Component-wise containment, so `/data-secret` is not inside `/data`.
    fn contains(&self, canonical: &Path) -> bool {
        canonical.starts_with(&self.path)
    }

    fn parent_is_confined_dir(&self, joined: &Path) -> bool {
        joined
            .parent()
            .and_then(|parent| parent.canonicalize().ok())
            .is_some_and(|parent| self.contains(&parent) && parent.is_dir())
    }
}

/// Absolute paths, drive prefixes and NUL bytes never name anything in the root.
fn reject_injection(relative: &str) -> Result<(), StorageError> {
    let injected = relative.contains('\0')
        || Path::new(relative)
            .components()
            .any(|c| matches!(c, Component::RootDir | Component::Prefix(_)));
    if injected {
        warn!("Rejected absolute path injection: {:?}", relative);
        return Err(StorageError::AccessDenied(relative.to_string()));
    }
    Ok(())
}

/// Validate a directory name supplied by a client and return it trimmed.
pub fn validate_directory_name(name: &str) -> Result<&str, StorageError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(StorageError::InvalidName("name cannot be empty".into()));
    }
    if trimmed == "." || trimmed == ".." {
        return Err(StorageError::InvalidName(trimmed.to_string()));
    }
    if trimmed.contains(FORBIDDEN_NAME_CHARS) || trimmed.chars().any(char::is_control) {
        return Err(StorageError::InvalidName(trimmed.to_string()));
    }
    Ok(trimmed)
}

/// Sanitize an uploaded filename.
///
/// Drops any directory components, replaces whitespace with `_`, keeps only
/// alphanumerics, `.`, `-` and `_`, and trims leading/trailing dots and
/// underscores. Returns `None` when nothing usable is left.
pub fn sanitize_filename(filename: &str) -> Option<String> {
    let base = filename.rsplit(['/', '\\']).next().unwrap_or_default();

    let cleaned: String = base
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, '.' | '-' | '_'))
        .collect();

    let cleaned = cleaned.trim_matches(|c| c == '.' || c == '_');
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn setup() -> (TempDir, Root) {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("docs/nested")).unwrap();
        fs::write(dir.path().join("docs/readme.txt"), b"hello").unwrap();
        let root = Root::new(dir.path()).unwrap();
        (dir, root)
    }

    #[test]
    fn test_empty_path_is_root() {
        let (_dir, root) = setup();
        let resolved = root.resolve("").unwrap();
        assert_eq!(resolved.as_path(), root.path());
        assert_eq!(root.relative_to_root(&resolved), "");
    }

    #[test]
    fn test_resolves_nested_paths() {
        let (_dir, root) = setup();
        let resolved = root.resolve("docs/readme.txt").unwrap();
        assert_eq!(resolved.as_path(), root.path().join("docs/readme.txt"));
        assert_eq!(root.relative_to_root(&resolved), "docs/readme.txt");
    }

    #[test]
    fn test_dot_dot_inside_root_is_canonicalized() {
        let (_dir, root) = setup();
        let resolved = root.resolve("docs/nested/../readme.txt").unwrap();
        assert_eq!(resolved.as_path(), root.path().join("docs/readme.txt"));
    }

    #[test]
    fn test_rejects_parent_escape() {
        let (_dir, root) = setup();
        assert!(matches!(
            root.resolve(".."),
            Err(StorageError::AccessDenied(_))
        ));
        assert!(matches!(
            root.resolve("docs/../../"),
            Err(StorageError::AccessDenied(_))
        ));
    }

    #[test]
    fn test_rejects_absolute_injection() {
        let (_dir, root) = setup();
        assert!(matches!(
            root.resolve("/etc/passwd"),
            Err(StorageError::AccessDenied(_))
        ));
        let inside = root.path().join("docs").to_string_lossy().to_string();
        assert!(matches!(
            root.resolve(&inside),
            Err(StorageError::AccessDenied(_))
        ));
    }

    #[test]
    fn test_rejects_sibling_with_shared_prefix() {
        let parent = TempDir::new().unwrap();
        fs::create_dir(parent.path().join("data")).unwrap();
        fs::create_dir(parent.path().join("data-secret")).unwrap();
        fs::write(parent.path().join("data-secret/key"), b"k").unwrap();
        let root = Root::new(parent.path().join("data")).unwrap();

        assert!(matches!(
            root.resolve("../data-secret/key"),
            Err(StorageError::AccessDenied(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_rejects_symlink_escape() {
        let outside = TempDir::new().unwrap();
        fs::write(outside.path().join("secret.txt"), b"s").unwrap();
        let (dir, root) = setup();
        std::os::unix::fs::symlink(outside.path(), dir.path().join("escape")).unwrap();

        assert!(matches!(
            root.resolve("escape/secret.txt"),
            Err(StorageError::AccessDenied(_))
        ));
        assert!(matches!(
            root.resolve("escape"),
            Err(StorageError::AccessDenied(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_inside_root_resolves_to_target() {
        let (dir, root) = setup();
        std::os::unix::fs::symlink(dir.path().join("docs"), dir.path().join("alias")).unwrap();
        let resolved = root.resolve("alias/readme.txt").unwrap();
        assert_eq!(resolved.as_path(), root.path().join("docs/readme.txt"));
    }

    #[cfg(unix)]
    #[test]
    fn test_resolve_entry_keeps_final_link() {
        let outside = TempDir::new().unwrap();
        let (dir, root) = setup();
        std::os::unix::fs::symlink(
            dir.path().join("docs/readme.txt"),
            dir.path().join("docs/link.txt"),
        )
        .unwrap();
        std::os::unix::fs::symlink(outside.path(), dir.path().join("escape")).unwrap();
        std::os::unix::fs::symlink(dir.path().join("gone"), dir.path().join("dangling")).unwrap();

        let link = root.resolve_entry("docs/link.txt").unwrap();
        assert_eq!(link.as_path(), root.path().join("docs/link.txt"));
        assert_eq!(root.relative_to_root(&link), "docs/link.txt");

        let escape = root.resolve_entry("escape").unwrap();
        assert_eq!(escape.as_path(), root.path().join("escape"));
        let dangling = root.resolve_entry("dangling").unwrap();
        assert_eq!(dangling.as_path(), root.path().join("dangling"));

        // Links in the middle of a path are still followed and checked
        assert!(matches!(
            root.resolve_entry("escape/anything"),
            Err(StorageError::AccessDenied(_))
        ));
    }

    #[test]
    fn test_resolve_entry_matches_resolve_for_plain_paths() {
        let (_dir, root) = setup();
        assert_eq!(
            root.resolve_entry("docs/readme.txt").unwrap(),
            root.resolve("docs/readme.txt").unwrap()
        );
        assert_eq!(root.resolve_entry("").unwrap().as_path(), root.path());
        assert!(matches!(
            root.resolve_entry("/etc/passwd"),
            Err(StorageError::AccessDenied(_))
        ));
        assert!(matches!(
            root.resolve_entry(".."),
            Err(StorageError::AccessDenied(_))
        ));
        assert!(matches!(
            root.resolve_entry("docs/missing.txt"),
            Err(StorageError::NotFound(_))
        ));
    }

    #[test]
    fn test_missing_leaf_is_not_found() {
        let (_dir, root) = setup();
        assert!(matches!(
            root.resolve("docs/missing.txt"),
            Err(StorageError::NotFound(_))
        ));
    }

    #[test]
    fn test_missing_intermediate_is_denied() {
        let (_dir, root) = setup();
        assert!(matches!(
            root.resolve("nope/deeper/file.txt"),
            Err(StorageError::AccessDenied(_))
        ));
    }

    #[test]
    fn test_root_must_be_directory() {
        let (dir, _root) = setup();
        assert!(Root::new(dir.path().join("docs/readme.txt")).is_err());
        assert!(Root::new("").is_err());
        assert!(Root::new(dir.path().join("absent")).is_err());
    }

    #[test]
    fn test_validate_directory_name() {
        assert_eq!(validate_directory_name("  photos ").unwrap(), "photos");
        assert!(matches!(
            validate_directory_name("a/b"),
            Err(StorageError::InvalidName(_))
        ));
        assert!(matches!(
            validate_directory_name(""),
            Err(StorageError::InvalidName(_))
        ));
        assert!(matches!(
            validate_directory_name("   "),
            Err(StorageError::InvalidName(_))
        ));
        for bad in ["a\\b", "c:d", "what?", "x*", "\"q\"", "<a>", "p|q", "..", "tab\there"] {
            assert!(validate_directory_name(bad).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("report.txt").as_deref(), Some("report.txt"));
        assert_eq!(sanitize_filename("../../etc/passwd").as_deref(), Some("passwd"));
        assert_eq!(
            sanitize_filename("C:\\Users\\me\\My File.pdf").as_deref(),
            Some("My_File.pdf")
        );
        assert_eq!(sanitize_filename(".bashrc").as_deref(), Some("bashrc"));
        assert_eq!(sanitize_filename("a<b>c|d.txt").as_deref(), Some("abcd.txt"));
        assert_eq!(sanitize_filename("../.."), None);
        assert_eq!(sanitize_filename(""), None);
    }
}
