/// Filesystem primitives for the regeneration pipeline
///
/// Every failure carries the path it happened on so the binary can report it
/// without further context.
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use walkdir::WalkDir;

use crate::error::{PrepareError, Result};

/// Totals gathered while copying a tree
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CopyStats {
    pub file_count: usize,
    pub dir_count: usize,
    pub size_bytes: u64,
}

/// Content digest of a directory tree
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeDigest {
    /// SHA-256 over every relative path and file content, in path order
    pub hash: String,
    /// Per-file SHA-256 keyed by `/`-separated relative path
    pub files: BTreeMap<String, String>,
    pub size_bytes: u64,
}

/// Create `path` and any missing parents. An existing directory is fine.
pub fn ensure_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path).map_err(|e| PrepareError::io(path, e))
}

/// Remove `path` recursively. Returns whether anything was removed.
pub fn remove_dir_if_exists(path: &Path) -> Result<bool> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(PrepareError::io(path, e)),
    }
}

/// Create a single new directory. Its parent must exist and it must not.
pub fn create_fresh_dir(path: &Path) -> Result<()> {
    match fs::create_dir(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::AlreadyExists => Err(PrepareError::DirectoryExists {
            path: path.to_path_buf(),
        }),
        Err(e) => Err(PrepareError::io(path, e)),
    }
}

/// Recursively copy `src` to `dst`, preserving structure.
///
/// `src` must be an existing directory and `dst` must not exist yet.
/// Missing parents of `dst` are created.
pub fn copy_tree(src: &Path, dst: &Path) -> Result<CopyStats> {
    if !src.is_dir() {
        return Err(PrepareError::SourceMissing {
            path: src.to_path_buf(),
        });
    }
    if dst.symlink_metadata().is_ok() {
        return Err(PrepareError::DestinationExists {
            path: dst.to_path_buf(),
        });
    }

    if let Some(parent) = dst.parent() {
        if !parent.as_os_str().is_empty() {
            ensure_dir(parent)?;
        }
    }
    create_fresh_dir(dst)?;

    let mut stats = CopyStats::default();

    for entry in WalkDir::new(src)
        .min_depth(1)
        .follow_links(true)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| walk_error(src, e))?;
        let Ok(relative) = entry.path().strip_prefix(src) else {
            continue;
        };
        let target = dst.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir(&target).map_err(|e| PrepareError::io(&target, e))?;
            stats.dir_count += 1;
        } else {
            let copied =
                fs::copy(entry.path(), &target).map_err(|e| PrepareError::io(entry.path(), e))?;
            stats.file_count += 1;
            stats.size_bytes += copied;
        }
    }

    Ok(stats)
}

/// Compute a deterministic digest of every file under `root`.
pub fn tree_digest(root: &Path) -> Result<TreeDigest> {
    if !root.is_dir() {
        return Err(PrepareError::SourceMissing {
            path: root.to_path_buf(),
        });
    }

    let mut hasher = Sha256::new();
    let mut digest = TreeDigest::default();

    for entry in WalkDir::new(root)
        .min_depth(1)
        .follow_links(true)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| walk_error(root, e))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let relative = relative_key(root, entry.path());
        let content = fs::read(entry.path()).map_err(|e| PrepareError::io(entry.path(), e))?;

        hasher.update(relative.as_bytes());
        hasher.update([0u8]);
        hasher.update(&content);

        digest.size_bytes += content.len() as u64;
        digest
            .files
            .insert(relative, hex::encode(Sha256::digest(&content)));
    }

    digest.hash = hex::encode(hasher.finalize());
    Ok(digest)
}

fn relative_key(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn walk_error(root: &Path, err: walkdir::Error) -> PrepareError {
    let path = err
        .path()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| root.to_path_buf());
    let source = err
        .into_io_error()
        .unwrap_or_else(|| std::io::Error::other("filesystem loop detected"));
    PrepareError::Io { path, source }
}
