use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::cargo::CleanScope;
use crate::error::PrepareError;

/// Name of the config file looked up in the workspace root
pub const CONFIG_FILE_NAME: &str = "sqlx-prepare.toml";

/// Configuration loaded from `sqlx-prepare.toml`
#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    /// Cargo program to invoke
    #[serde(default)]
    pub cargo: Option<String>,

    /// Fail when `cargo check` exits unsuccessfully
    #[serde(default)]
    pub strict: Option<bool>,

    #[serde(default)]
    pub clean_scope: Option<CleanScope>,

    /// Arguments passed to `cargo check`
    #[serde(default)]
    pub check_args: Option<Vec<String>>,

    #[serde(default)]
    pub layout: LayoutConfig,
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LayoutConfig {
    pub target_dir: Option<PathBuf>,
    pub build_dir: Option<PathBuf>,
    pub prepare_dir: Option<PathBuf>,
}

impl FileConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: FileConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;

        Ok(config)
    }

    /// Load `explicit` if given, otherwise `sqlx-prepare.toml` in `root` if present
    pub fn load(explicit: Option<&Path>, root: &Path) -> Result<Option<Self>> {
        if let Some(path) = explicit {
            return Ok(Some(Self::from_file(path)?));
        }

        let discovered = root.join(CONFIG_FILE_NAME);
        if discovered.is_file() {
            tracing::info!(path = %discovered.display(), "using config");
            Ok(Some(Self::from_file(&discovered)?))
        } else {
            Ok(None)
        }
    }
}

/// The three directories the regenerator owns, relative to the workspace root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    pub target_dir: PathBuf,
    pub build_dir: PathBuf,
    pub prepare_dir: PathBuf,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            target_dir: PathBuf::from("target"),
            build_dir: PathBuf::from("target/sqlx"),
            prepare_dir: PathBuf::from(".sqlx"),
        }
    }
}

impl Layout {
    /// Join relative paths onto `root`; absolute paths are kept.
    /// `.` and `..` are folded lexically.
    pub fn resolve(&self, root: &Path) -> Layout {
        Layout {
            target_dir: normalize(&root.join(&self.target_dir)),
            build_dir: normalize(&root.join(&self.build_dir)),
            prepare_dir: normalize(&root.join(&self.prepare_dir)),
        }
    }

    /// Reject layouts whose removal steps would delete the workspace root,
    /// the target directory, or one of the other owned directories.
    pub fn check_safe(&self, root: &Path) -> std::result::Result<(), PrepareError> {
        // A relative root cannot be compared against `..` lexically.
        let root = if root.is_absolute() {
            normalize(root)
        } else {
            let cwd = std::env::current_dir().map_err(|e| PrepareError::io(root, e))?;
            normalize(&cwd.join(root))
        };
        let resolved = self.resolve(&root);
        let invalid = |reason: String| Err(PrepareError::InvalidLayout { reason });

        for (name, dir) in [
            ("Build directory", &resolved.build_dir),
            ("Prepare directory", &resolved.prepare_dir),
        ] {
            if root.starts_with(dir) {
                return invalid(format!(
                    "{} ({}) must not be or contain the workspace root",
                    name,
                    dir.display()
                ));
            }
            if resolved.target_dir.starts_with(dir) {
                return invalid(format!(
                    "{} ({}) must not be or contain the target directory ({})",
                    name,
                    dir.display(),
                    resolved.target_dir.display()
                ));
            }
        }

        if resolved.build_dir == resolved.prepare_dir {
            return invalid(format!(
                "Build directory and prepare directory must differ: {}",
                resolved.build_dir.display()
            ));
        }
        if resolved.prepare_dir.starts_with(&resolved.build_dir)
            || resolved.build_dir.starts_with(&resolved.prepare_dir)
        {
            return invalid(format!(
                "Build directory ({}) and prepare directory ({}) must not be nested",
                resolved.build_dir.display(),
                resolved.prepare_dir.display()
            ));
        }

        Ok(())
    }
}

/// Fold `.` and `..` components without touching the filesystem
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Fully merged settings for one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrepareConfig {
    pub root: PathBuf,
    pub cargo: String,
    pub strict: bool,
    pub clean_scope: CleanScope,
    pub check_args: Vec<String>,
    pub layout: Layout,
}

impl Default for PrepareConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            cargo: "cargo".to_string(),
            strict: false,
            clean_scope: CleanScope::All,
            check_args: vec!["--workspace".to_string()],
            layout: Layout::default(),
        }
    }
}

impl PrepareConfig {
    /// Reject settings that would make the pipeline destroy its own output
    /// or anything outside the directories it owns
    pub fn validate(&self) -> Result<()> {
        if self.cargo.trim().is_empty() {
            anyhow::bail!("Cargo program must not be empty");
        }

        self.layout.check_safe(&self.root)?;

        Ok(())
    }
}
