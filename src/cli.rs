use clap::Parser;
use std::path::PathBuf;

use crate::cargo::CleanScope;
use crate::config::{FileConfig, Layout, PrepareConfig};

/// sqlx-prepare - regenerate the offline sqlx query cache
///
/// Runs `cargo clean` and `cargo check --workspace` with the sqlx macros
/// writing query metadata into `target/sqlx`, then replaces `.sqlx` with it.
/// Run from the workspace root; no arguments are needed.
#[derive(Parser, Debug, Default)]
#[command(name = "sqlx-prepare")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Regenerate the offline sqlx query cache", long_about = None)]
pub struct Cli {
    /// Workspace root (defaults to the current directory)
    #[arg(long, env = "SQLX_PREPARE_ROOT")]
    pub root: Option<PathBuf>,

    /// Config file path (defaults to sqlx-prepare.toml in the root)
    #[arg(short = 'c', long, env = "SQLX_PREPARE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Cargo program to run
    #[arg(long, env = "SQLX_PREPARE_CARGO")]
    pub cargo: Option<String>,

    /// Top-level build output directory
    #[arg(long)]
    pub target_dir: Option<PathBuf>,

    /// Scratch directory the sqlx macros write into
    #[arg(long)]
    pub build_dir: Option<PathBuf>,

    /// Committed prepared query directory
    #[arg(long)]
    pub prepare_dir: Option<PathBuf>,

    /// Which artefacts to clean before checking
    #[arg(long, value_enum)]
    pub clean_scope: Option<CleanScope>,

    /// Fail if `cargo check` exits unsuccessfully
    #[arg(long)]
    pub strict: bool,

    /// Verify the prepared directory is up to date instead of replacing it
    #[arg(long)]
    pub check: bool,

    /// Arguments for `cargo check` (default: --workspace)
    #[arg(last = true)]
    pub check_args: Vec<String>,
}

impl Cli {
    /// Merge CLI > env (handled by clap) > config file > defaults
    pub fn merge(&self, root: PathBuf, file: Option<FileConfig>) -> PrepareConfig {
        let file = file.unwrap_or_default();
        let defaults = PrepareConfig::default();
        let default_layout = Layout::default();

        PrepareConfig {
            root,
            cargo: self
                .cargo
                .clone()
                .or(file.cargo)
                .unwrap_or(defaults.cargo),
            strict: self.strict || file.strict.unwrap_or(defaults.strict),
            clean_scope: self
                .clean_scope
                .or(file.clean_scope)
                .unwrap_or(defaults.clean_scope),
            check_args: if self.check_args.is_empty() {
                file.check_args.unwrap_or(defaults.check_args)
            } else {
                self.check_args.clone()
            },
            layout: Layout {
                target_dir: self
                    .target_dir
                    .clone()
                    .or(file.layout.target_dir)
                    .unwrap_or(default_layout.target_dir),
                build_dir: self
                    .build_dir
                    .clone()
                    .or(file.layout.build_dir)
                    .unwrap_or(default_layout.build_dir),
                prepare_dir: self
                    .prepare_dir
                    .clone()
                    .or(file.layout.prepare_dir)
                    .unwrap_or(default_layout.prepare_dir),
            },
        }
    }
}
