/// Cargo invocation
///
/// Spawns `cargo clean`, `cargo metadata` and `cargo check` as child processes
/// in the workspace root. Exit codes are observed and reported, never turned
/// into errors here; the caller decides what a failed command means.
use serde::Deserialize;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use tracing::{debug, info, warn};

use crate::logging::steps;

/// Variable telling the sqlx macros whether to use the offline cache
pub const SQLX_OFFLINE_VAR: &str = "SQLX_OFFLINE";
/// Variable telling the sqlx macros where to write query metadata
pub const SQLX_OFFLINE_DIR_VAR: &str = "SQLX_OFFLINE_DIR";

/// Which build artefacts `cargo clean` removes before the check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CleanScope {
    /// Clean the whole target directory
    #[default]
    All,
    /// Clean only the packages that belong to this workspace
    Workspace,
    /// Skip cleaning
    None,
}

/// What happened when a cargo subcommand was run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutcome {
    pub command: String,
    /// False if the process could not be started at all
    pub spawned: bool,
    /// None if not spawned or terminated by a signal
    pub exit_code: Option<i32>,
}

impl CommandOutcome {
    pub fn success(&self) -> bool {
        self.spawned && self.exit_code == Some(0)
    }

    fn skipped(command: String) -> Self {
        Self {
            command,
            spawned: false,
            exit_code: None,
        }
    }
}

/// Environment handed to the `cargo check` child only
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckEnv {
    pub offline: String,
    pub offline_dir: PathBuf,
}

impl CheckEnv {
    /// Online query validation, metadata written to `offline_dir`
    pub fn online(offline_dir: impl Into<PathBuf>) -> Self {
        Self {
            offline: "false".to_string(),
            offline_dir: offline_dir.into(),
        }
    }

    pub fn vars(&self) -> [(&'static str, OsString); 2] {
        [
            (SQLX_OFFLINE_VAR, OsString::from(&self.offline)),
            (SQLX_OFFLINE_DIR_VAR, self.offline_dir.clone().into_os_string()),
        ]
    }
}

#[derive(Debug, Deserialize)]
struct Metadata {
    packages: Vec<MetadataPackage>,
}

#[derive(Debug, Deserialize)]
struct MetadataPackage {
    name: String,
}

/// Runs cargo subcommands from a fixed working directory
#[derive(Debug, Clone)]
pub struct CargoRunner {
    program: PathBuf,
    name: String,
    workdir: PathBuf,
}

impl CargoRunner {
    /// Resolve `program` from PATH, falling back to the name as given
    pub fn new(program: &str, workdir: impl Into<PathBuf>) -> Self {
        let resolved = which::which(program).unwrap_or_else(|e| {
            debug!(
                command = program,
                "could not resolve in PATH ({}), trying as-is", e
            );
            PathBuf::from(program)
        });

        Self {
            program: resolved,
            name: program.to_string(),
            workdir: workdir.into(),
        }
    }

    /// Run `cargo clean` for the requested scope
    pub fn clean(&self, scope: CleanScope) -> CommandOutcome {
        match scope {
            CleanScope::None => {
                info!(step = steps::CLEAN, "cleaning disabled, skipping");
                CommandOutcome::skipped(self.describe(&["clean".to_string()]))
            }
            CleanScope::All => self.run(&["clean".to_string()], &[]),
            CleanScope::Workspace => match self.workspace_packages() {
                Some(packages) if !packages.is_empty() => {
                    let mut args = vec!["clean".to_string()];
                    for package in packages {
                        args.push("-p".to_string());
                        args.push(package);
                    }
                    self.run(&args, &[])
                }
                _ => {
                    warn!(
                        step = steps::CLEAN,
                        "could not list workspace packages, cleaning everything"
                    );
                    self.run(&["clean".to_string()], &[])
                }
            },
        }
    }

    /// Run `cargo check <args>` with the sqlx variables set on the child
    pub fn check(&self, args: &[String], env: &CheckEnv) -> CommandOutcome {
        let mut full = vec!["check".to_string()];
        full.extend(args.iter().cloned());
        self.run(&full, &env.vars())
    }

    /// Names of the packages that are members of this workspace
    pub fn workspace_packages(&self) -> Option<Vec<String>> {
        let output = Command::new(&self.program)
            .args(["metadata", "--no-deps", "--format-version", "1"])
            .current_dir(&self.workdir)
            .stdin(Stdio::null())
            .stderr(Stdio::inherit())
            .output();

        let output = match output {
            Ok(output) if output.status.success() => output,
            Ok(output) => {
                warn!(
                    command = %self.describe(&["metadata".to_string()]),
                    exit_code = ?output.status.code(),
                    "cargo metadata failed"
                );
                return None;
            }
            Err(e) => {
                warn!(command = %self.name, "failed to spawn cargo metadata: {}", e);
                return None;
            }
        };

        match parse_package_names(&output.stdout) {
            Ok(names) => Some(names),
            Err(e) => {
                warn!("unreadable cargo metadata output: {}", e);
                None
            }
        }
    }

    fn run(&self, args: &[String], envs: &[(&'static str, OsString)]) -> CommandOutcome {
        let command = self.describe(args);
        info!(command = %command, "running");

        let mut cmd = Command::new(&self.program);
        cmd.args(args)
            .current_dir(&self.workdir)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());
        for (key, value) in envs {
            debug!(command = %command, "{}={}", key, value.to_string_lossy());
            cmd.env(key, value);
        }

        match cmd.status() {
            Ok(status) => {
                let exit_code = status.code();
                if status.success() {
                    info!(command = %command, exit_code = 0, "finished");
                } else {
                    warn!(command = %command, exit_code = ?exit_code, "exited unsuccessfully");
                }
                CommandOutcome {
                    command,
                    spawned: true,
                    exit_code,
                }
            }
            Err(e) => {
                warn!(command = %command, "failed to spawn: {}", e);
                CommandOutcome::skipped(command)
            }
        }
    }

    fn describe(&self, args: &[String]) -> String {
        let mut parts = vec![self.name.clone()];
        parts.extend(args.iter().cloned());
        parts.join(" ")
    }
}

fn parse_package_names(stdout: &[u8]) -> serde_json::Result<Vec<String>> {
    let metadata: Metadata = serde_json::from_slice(stdout)?;
    Ok(metadata.packages.into_iter().map(|p| p.name).collect())
}
