// Library interface for sqlx-prepare
// This allows integration tests and other tools to drive the regenerator

pub mod cargo;
pub mod cli;
pub mod cli_utils;
pub mod config;
pub mod error;
pub mod logging;
pub mod regenerate;
pub mod verify;
pub mod workspace_fs;

// Re-export commonly used types
pub use cargo::{CargoRunner, CheckEnv, CleanScope, CommandOutcome};
pub use config::{FileConfig, Layout, PrepareConfig};
pub use error::PrepareError;
pub use regenerate::{Mode, Regenerator, Report};
