use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the regeneration pipeline
///
/// Subprocess exit codes are not errors unless strict mode asks for it.
#[derive(Error, Debug)]
pub enum PrepareError {
    #[error("Directory already exists: {}", path.display())]
    DirectoryExists { path: PathBuf },

    #[error("Source directory not found: {} (cargo check produced no query cache)", path.display())]
    SourceMissing { path: PathBuf },

    #[error("Destination already exists: {}", path.display())]
    DestinationExists { path: PathBuf },

    #[error("Invalid layout: {reason}")]
    InvalidLayout { reason: String },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Command `{command}` failed with exit code {}", code.map(|c| c.to_string()).unwrap_or_else(|| "unknown".to_string()))]
    CommandFailed { command: String, code: Option<i32> },

    #[error(
        "Prepared query cache is out of date ({} added, {} removed, {} changed)",
        added.len(),
        removed.len(),
        changed.len()
    )]
    OutOfDate {
        added: Vec<String>,
        removed: Vec<String>,
        changed: Vec<String>,
    },
}

impl PrepareError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PrepareError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, PrepareError>;
