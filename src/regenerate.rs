/// Offline query cache regeneration
///
/// Drives cargo through a clean/check cycle with the sqlx macros pointed at a
/// scratch directory, then moves the result into the prepared directory:
///
/// 1. `cargo clean`
/// 2. ensure the target directory exists
/// 3. remove the build and prepare directories
/// 4. recreate the build directory empty
/// 5. point `SQLX_OFFLINE_DIR` at it for the check child
/// 6. `cargo check --workspace`
/// 7. copy the build directory to the prepare directory
///
/// In verify mode step 7 compares instead of copying and the prepare
/// directory is left untouched.
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::cargo::{CargoRunner, CheckEnv, CommandOutcome};
use crate::config::{Layout, PrepareConfig};
use crate::error::{PrepareError, Result};
use crate::logging::steps;
use crate::verify::{self, TreeDiff};
use crate::workspace_fs::{self, CopyStats, TreeDigest};

/// What to do with the generated cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Replace the prepare directory with the generated cache
    #[default]
    Replace,
    /// Compare the generated cache with the prepare directory
    Verify,
}

/// Summary of a finished run
#[derive(Debug, Clone)]
pub struct Report {
    pub clean: CommandOutcome,
    pub check: CommandOutcome,
    /// Set in replace mode
    pub copied: Option<CopyStats>,
    /// Set in verify mode
    pub diff: Option<TreeDiff>,
    /// Digest of the generated cache
    pub digest: TreeDigest,
    pub layout: Layout,
}

pub struct Regenerator {
    config: PrepareConfig,
    layout: Layout,
    cargo: CargoRunner,
}

impl Regenerator {
    pub fn new(config: PrepareConfig) -> Self {
        let layout = config.layout.resolve(&config.root);
        let cargo = CargoRunner::new(&config.cargo, config.root.clone());
        Self {
            config,
            layout,
            cargo,
        }
    }

    /// Layout with every path joined onto the workspace root
    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn root(&self) -> &Path {
        &self.config.root
    }

    pub fn run(&self, mode: Mode) -> Result<Report> {
        self.config.layout.check_safe(&self.config.root)?;
        let layout = &self.layout;

        // Clean failures never abort the run.
        let clean = self.cargo.clean(self.config.clean_scope);
        if !clean.success() && clean.spawned {
            warn!(step = steps::CLEAN, "clean failed, continuing");
        }

        info!(
            step = steps::PREPARE_DIRS,
            path = %layout.target_dir.display(),
            "ensuring target directory"
        );
        workspace_fs::ensure_dir(&layout.target_dir)?;

        if workspace_fs::remove_dir_if_exists(&layout.build_dir)? {
            info!(
                step = steps::PREPARE_DIRS,
                path = %layout.build_dir.display(),
                "removed stale build cache"
            );
        }
        if mode == Mode::Replace && workspace_fs::remove_dir_if_exists(&layout.prepare_dir)? {
            info!(
                step = steps::PREPARE_DIRS,
                path = %layout.prepare_dir.display(),
                "removed prepared cache"
            );
        }

        if let Some(parent) = non_empty_parent(&layout.build_dir) {
            workspace_fs::ensure_dir(parent)?;
        }
        workspace_fs::create_fresh_dir(&layout.build_dir)?;

        let env = CheckEnv::online(&layout.build_dir);
        let check = self.cargo.check(&self.config.check_args, &env);
        if !check.success() {
            if self.config.strict {
                return Err(PrepareError::CommandFailed {
                    command: check.command,
                    code: check.exit_code,
                });
            }
            warn!(step = steps::CHECK, "check failed, query cache may be incomplete");
        }

        match mode {
            Mode::Replace => {
                let stats = workspace_fs::copy_tree(&layout.build_dir, &layout.prepare_dir)?;
                let digest = workspace_fs::tree_digest(&layout.prepare_dir)?;
                info!(
                    step = steps::FINALIZE,
                    path = %layout.prepare_dir.display(),
                    file_count = stats.file_count,
                    size_bytes = stats.size_bytes,
                    "prepared query cache written"
                );
                Ok(Report {
                    clean,
                    check,
                    copied: Some(stats),
                    diff: None,
                    digest,
                    layout: layout.clone(),
                })
            }
            Mode::Verify => {
                let (digest, diff) = verify::compare(&layout.build_dir, &layout.prepare_dir)?;
                if diff.is_empty() {
                    info!(
                        step = steps::VERIFY,
                        path = %layout.prepare_dir.display(),
                        file_count = digest.files.len(),
                        "prepared query cache is up to date"
                    );
                } else {
                    warn!(
                        step = steps::VERIFY,
                        path = %layout.prepare_dir.display(),
                        added = diff.added.len(),
                        removed = diff.removed.len(),
                        changed = diff.changed.len(),
                        "prepared query cache is out of date"
                    );
                }
                Ok(Report {
                    clean,
                    check,
                    copied: None,
                    diff: Some(diff),
                    digest,
                    layout: layout.clone(),
                })
            }
        }
    }
}

fn non_empty_parent(path: &Path) -> Option<&Path> {
    path.parent().filter(|p| !p.as_os_str().is_empty())
}

/// Workspace root to use when none is given
pub fn default_root() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}
