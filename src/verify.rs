/// Comparison of a freshly generated query cache against the committed one
use std::path::Path;

use crate::error::{PrepareError, Result};
use crate::workspace_fs::{tree_digest, TreeDigest};

/// Per-file differences between two query caches
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeDiff {
    /// Generated but not committed
    pub added: Vec<String>,
    /// Committed but no longer generated
    pub removed: Vec<String>,
    pub changed: Vec<String>,
}

impl TreeDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }

    pub fn between(generated: &TreeDigest, committed: &TreeDigest) -> Self {
        let mut diff = TreeDiff::default();

        for (path, hash) in &generated.files {
            match committed.files.get(path) {
                None => diff.added.push(path.clone()),
                Some(other) if other != hash => diff.changed.push(path.clone()),
                Some(_) => {}
            }
        }
        for path in committed.files.keys() {
            if !generated.files.contains_key(path) {
                diff.removed.push(path.clone());
            }
        }

        diff
    }

    pub fn into_error(self) -> PrepareError {
        PrepareError::OutOfDate {
            added: self.added,
            removed: self.removed,
            changed: self.changed,
        }
    }
}

/// Compare `generated` with `committed`. A missing `committed` directory
/// counts as empty; a missing `generated` directory is an error.
pub fn compare(generated: &Path, committed: &Path) -> Result<(TreeDigest, TreeDiff)> {
    let generated_digest = tree_digest(generated)?;
    let committed_digest = if committed.is_dir() {
        tree_digest(committed)?
    } else {
        TreeDigest::default()
    };

    let diff = TreeDiff::between(&generated_digest, &committed_digest);
    Ok((generated_digest, diff))
}
