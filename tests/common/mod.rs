// Common test utilities shared across acceptance tests
//
// Each test gets its own workspace directory and its own fake `cargo`, a
// shell script that:
// - appends every invocation (with the sqlx variables it saw) to calls.log
// - answers `cargo metadata` with a fixed two-package workspace
// - on `cargo check`, writes one query file per configured query into
//   $SQLX_OFFLINE_DIR
//
// Nothing outside the two temp directories is touched.

use assert_cmd::Command;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub struct FakeCargo {
    pub queries: Vec<String>,
    pub clean_exit: i32,
    pub check_exit: i32,
}

impl Default for FakeCargo {
    fn default() -> Self {
        Self {
            queries: Vec::new(),
            clean_exit: 0,
            check_exit: 0,
        }
    }
}

impl FakeCargo {
    pub fn with_queries(queries: &[&str]) -> Self {
        Self {
            queries: queries.iter().map(|q| q.to_string()).collect(),
            ..Self::default()
        }
    }
}

pub struct TestWorkspace {
    root: TempDir,
    tools: TempDir,
    cargo: PathBuf,
}

impl TestWorkspace {
    pub fn new(fake: FakeCargo) -> Self {
        let root = TempDir::new().expect("Failed to create workspace dir");
        let tools = TempDir::new().expect("Failed to create tools dir");
        let cargo = write_fake_cargo(tools.path(), &fake);

        Self { root, tools, cargo }
    }

    pub fn path(&self) -> &Path {
        self.root.path()
    }

    /// The sqlx-prepare binary, isolated from the caller's environment
    pub fn sqlx_prepare(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_sqlx-prepare"));
        cmd.current_dir(self.path())
            .env_remove("SQLX_OFFLINE")
            .env_remove("SQLX_OFFLINE_DIR")
            .env_remove("SQLX_PREPARE_ROOT")
            .env_remove("SQLX_PREPARE_CONFIG")
            .env("SQLX_PREPARE_CARGO", &self.cargo)
            .env("SQLX_PREPARE_LOG_FORMAT", "compact");
        cmd
    }

    pub fn create_file(&self, path: &str, content: &str) {
        let file_path = self.path().join(path);
        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(file_path, content).unwrap();
    }

    pub fn read_file(&self, path: &str) -> String {
        fs::read_to_string(self.path().join(path)).unwrap()
    }

    pub fn assert_exists(&self, path: &str) {
        assert!(self.path().join(path).exists(), "Should exist: {}", path);
    }

    pub fn assert_missing(&self, path: &str) {
        assert!(!self.path().join(path).exists(), "Should not exist: {}", path);
    }

    /// Sorted file names directly inside `dir`
    pub fn list(&self, dir: &str) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(self.path().join(dir))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    /// Every cargo invocation, one per line
    pub fn calls(&self) -> Vec<String> {
        fs::read_to_string(self.tools.path().join("calls.log"))
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }
}

fn write_fake_cargo(dir: &Path, fake: &FakeCargo) -> PathBuf {
    let script = dir.join("cargo");
    let mut emit = String::new();
    for query in &fake.queries {
        emit.push_str(&format!(
            "    printf '{{\"describe\":\"{q}\"}}' > \"$SQLX_OFFLINE_DIR/query-{q}.json\"\n",
            q = query
        ));
    }

    let body = format!(
        r#"#!/bin/sh
echo "$* | offline=${{SQLX_OFFLINE-unset}} dir=${{SQLX_OFFLINE_DIR-unset}}" >> "{log}"
case "$1" in
  metadata)
    echo '{{"packages":[{{"name":"alpha"}},{{"name":"beta"}}],"version":1}}'
    exit 0 ;;
  clean)
    exit {clean_exit} ;;
  check)
{emit}    exit {check_exit} ;;
esac
exit 0
"#,
        log = dir.join("calls.log").display(),
        clean_exit = fake.clean_exit,
        check_exit = fake.check_exit,
        emit = emit,
    );

    fs::write(&script, body).unwrap();
    fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();
    script
}
