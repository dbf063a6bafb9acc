//! Whole-file reads and writes plus directory-tree helpers.
//!
//! Every handle is scoped to a single call, so a caller never holds a file
//! open across steps.

use std::fs;
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} is not valid UTF-8 text")]
    NotUtf8 { path: PathBuf },

    #[error("failed to walk {root}: {source}")]
    Walk {
        root: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> StoreError + '_ {
    move |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}

pub fn read_bytes(path: &Path) -> Result<Vec<u8>, StoreError> {
    fs::read(path).map_err(io_error(path))
}

pub fn read_text(path: &Path) -> Result<String, StoreError> {
    String::from_utf8(read_bytes(path)?).map_err(|_| StoreError::NotUtf8 {
        path: path.to_path_buf(),
    })
}

/// Create `path` and its parents; an existing directory is not an error.
pub fn ensure_dir(path: &Path) -> Result<(), StoreError> {
    fs::create_dir_all(path).map_err(io_error(path))
}

/// Atomic file write: tempfile + fsync + rename.
///
/// The full content is buffered by the caller, so a reader never observes a
/// truncated or half-written file. Parent directories are created as needed
/// and an existing file keeps its permissions.
pub fn write_atomic(path: &Path, content: &[u8]) -> Result<(), StoreError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    ensure_dir(parent)?;

    let mut temp = tempfile::NamedTempFile::new_in(parent).map_err(io_error(parent))?;
    temp.write_all(content).map_err(io_error(path))?;
    temp.as_file().sync_all().map_err(io_error(path))?;

    match fs::metadata(path) {
        Ok(existing) => {
            fs::set_permissions(temp.path(), existing.permissions()).map_err(io_error(path))?;
        }
        Err(_) => set_default_permissions(temp.path())?,
    }

    temp.persist(path).map_err(|e| StoreError::Io {
        path: path.to_path_buf(),
        source: e.error,
    })?;
    Ok(())
}

#[cfg(unix)]
fn set_default_permissions(path: &Path) -> Result<(), StoreError> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o644)).map_err(io_error(path))
}

#[cfg(not(unix))]
fn set_default_permissions(_path: &Path) -> Result<(), StoreError> {
    Ok(())
}

/// Copy a single file, creating the destination's parent directories.
pub fn copy_file(from: &Path, to: &Path) -> Result<(), StoreError> {
    if let Some(parent) = to.parent() {
        ensure_dir(parent)?;
    }
    fs::copy(from, to).map_err(io_error(from))?;
    Ok(())
}

/// Merge-copy the tree under `from` into `to`, overwriting existing files.
///
/// Returns the relative paths of the files copied, in lexicographic order.
pub fn copy_tree(from: &Path, to: &Path) -> Result<Vec<PathBuf>, StoreError> {
    copy_tree_filtered(from, to, |_| true)
}

/// [`copy_tree`] restricted to entries whose relative path passes `keep`.
///
/// A rejected directory is pruned with everything below it.
pub fn copy_tree_filtered(
    from: &Path,
    to: &Path,
    keep: impl Fn(&Path) -> bool,
) -> Result<Vec<PathBuf>, StoreError> {
    ensure_dir(to)?;
    let mut copied = Vec::new();
    for entry in walk(from, &keep) {
        let entry = entry.map_err(|source| StoreError::Walk {
            root: from.to_path_buf(),
            source,
        })?;
        let Ok(relative) = entry.path().strip_prefix(from) else {
            continue;
        };
        let target = to.join(relative);

        if entry.file_type().is_dir() {
            ensure_dir(&target)?;
        } else if is_regular_file(&entry) {
            fs::copy(entry.path(), &target).map_err(io_error(entry.path()))?;
            copied.push(relative.to_path_buf());
        } else {
            warn!(path = %entry.path().display(), "skipping non-regular file");
        }
    }
    debug!(from = %from.display(), to = %to.display(), files = copied.len(), "copied tree");
    Ok(copied)
}

fn walk<'a, F: Fn(&Path) -> bool>(
    root: &'a Path,
    keep: &'a F,
) -> impl Iterator<Item = walkdir::Result<walkdir::DirEntry>> + 'a {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(move |entry| match entry.path().strip_prefix(root) {
            Ok(relative) => relative.as_os_str().is_empty() || keep(relative),
            Err(_) => true,
        })
}

/// Delete a directory tree. Returns `false` if nothing was there.
pub fn remove_tree(path: &Path) -> Result<bool, StoreError> {
    if !path.exists() {
        return Ok(false);
    }
    fs::remove_dir_all(path).map_err(io_error(path))?;
    debug!(path = %path.display(), "removed tree");
    Ok(true)
}

/// Relative paths of every regular file under `root`, in lexicographic order.
///
/// A missing root yields an empty list.
pub fn list_files(root: &Path) -> Result<Vec<PathBuf>, StoreError> {
    list_files_filtered(root, |_| true)
}

/// [`list_files`] restricted to entries whose relative path passes `keep`.
pub fn list_files_filtered(
    root: &Path,
    keep: impl Fn(&Path) -> bool,
) -> Result<Vec<PathBuf>, StoreError> {
    if !root.is_dir() {
        return Ok(Vec::new());
    }
    let mut files = Vec::new();
    for entry in walk(root, &keep) {
        let entry = entry.map_err(|source| StoreError::Walk {
            root: root.to_path_buf(),
            source,
        })?;
        if !is_regular_file(&entry) {
            continue;
        }
        if let Ok(relative) = entry.path().strip_prefix(root) {
            files.push(relative.to_path_buf());
        }
    }
    Ok(files)
}

// Symlinks to files count as files: their content is what gets copied.
fn is_regular_file(entry: &walkdir::DirEntry) -> bool {
    entry.file_type().is_file() || (entry.path_is_symlink() && entry.path().is_file())
}

/// Render a relative path with `/` separators regardless of platform.
pub fn to_posix(relative: &Path) -> String {
    relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_atomic_creates_parents() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("a/b/c.txt");
        write_atomic(&path, b"content").unwrap();
        assert_eq!(read_text(&path).unwrap(), "content");
    }

    #[test]
    fn test_write_atomic_replaces_content() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("file.txt");
        fs::write(&path, "a much longer previous body\n").unwrap();
        write_atomic(&path, b"short\n").unwrap();
        assert_eq!(read_text(&path).unwrap(), "short\n");
    }

    #[test]
    #[cfg(unix)]
    fn test_write_atomic_keeps_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("run.sh");
        fs::write(&path, "#!/bin/sh\n").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();

        write_atomic(&path, b"#!/bin/sh\necho hi\n").unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }

    #[test]
    fn test_read_text_rejects_binary() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("blob.bin");
        fs::write(&path, [0xff, 0xfe, 0x00]).unwrap();
        assert!(matches!(read_text(&path), Err(StoreError::NotUtf8 { .. })));
    }

    #[test]
    fn test_copy_tree_merges() {
        let temp_dir = tempfile::tempdir().unwrap();
        let from = temp_dir.path().join("from");
        let to = temp_dir.path().join("to");
        fs::create_dir_all(from.join("nested")).unwrap();
        fs::create_dir_all(&to).unwrap();
        fs::write(from.join("nested/one.txt"), "new").unwrap();
        fs::write(to.join("keep.txt"), "kept").unwrap();

        let copied = copy_tree(&from, &to).unwrap();
        assert_eq!(copied, vec![PathBuf::from("nested/one.txt")]);
        assert_eq!(read_text(&to.join("nested/one.txt")).unwrap(), "new");
        assert_eq!(read_text(&to.join("keep.txt")).unwrap(), "kept");
    }

    #[test]
    fn test_list_files_is_sorted_and_relative() {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("b")).unwrap();
        fs::write(root.join("c.txt"), "").unwrap();
        fs::write(root.join("b/z.txt"), "").unwrap();
        fs::write(root.join("a.txt"), "").unwrap();

        let files = list_files(root).unwrap();
        assert_eq!(
            files,
            vec![
                PathBuf::from("a.txt"),
                PathBuf::from("b/z.txt"),
                PathBuf::from("c.txt")
            ]
        );
    }

    #[test]
    fn test_filtered_walk_prunes_rejected_directories() {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path().join("root");
        fs::create_dir_all(root.join(".git/objects")).unwrap();
        fs::write(root.join(".git/objects/ab"), "blob").unwrap();
        fs::write(root.join("kept.txt"), "kept").unwrap();
        let not_git = |relative: &Path| !relative.starts_with(".git");

        let files = list_files_filtered(&root, not_git).unwrap();
        assert_eq!(files, vec![PathBuf::from("kept.txt")]);

        let to = temp_dir.path().join("to");
        let copied = copy_tree_filtered(&root, &to, not_git).unwrap();
        assert_eq!(copied, vec![PathBuf::from("kept.txt")]);
        assert!(!to.join(".git").exists());
    }

    #[test]
    fn test_list_files_missing_root() {
        let temp_dir = tempfile::tempdir().unwrap();
        assert!(list_files(&temp_dir.path().join("nope")).unwrap().is_empty());
    }

    #[test]
    fn test_remove_tree_is_idempotent() {
        let temp_dir = tempfile::tempdir().unwrap();
        let dir = temp_dir.path().join("gone");
        fs::create_dir_all(dir.join("inner")).unwrap();
        assert!(remove_tree(&dir).unwrap());
        assert!(!remove_tree(&dir).unwrap());
    }

    #[test]
    fn test_to_posix() {
        let path: PathBuf = ["src", "app", "main.py"].iter().collect();
        assert_eq!(to_posix(&path), "src/app/main.py");
    }
}
