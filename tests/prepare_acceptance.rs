#![cfg(unix)]
/// Acceptance tests for sqlx-prepare
///
/// These drive the built binary against a scratch workspace and a fake cargo.
mod common;

use common::{FakeCargo, TestWorkspace};
use predicates::prelude::*;
use serial_test::serial;

#[test]
#[serial]
fn test_empty_workspace() {
    let ws = TestWorkspace::new(FakeCargo::default());

    ws.sqlx_prepare()
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote 0 query file(s)"));

    ws.assert_exists("target");
    ws.assert_exists("target/sqlx");
    ws.assert_exists(".sqlx");
    assert!(ws.list(".sqlx").is_empty());
}

#[test]
#[serial]
fn test_queries_copied_to_prepared_dir() {
    let ws = TestWorkspace::new(FakeCargo::with_queries(&["select_user", "insert_reading"]));

    ws.sqlx_prepare().assert().success();

    assert_eq!(
        ws.list(".sqlx"),
        vec!["query-insert_reading.json", "query-select_user.json"]
    );
    assert_eq!(ws.list(".sqlx"), ws.list("target/sqlx"));
    assert_eq!(
        ws.read_file(".sqlx/query-select_user.json"),
        ws.read_file("target/sqlx/query-select_user.json")
    );
}

#[test]
#[serial]
fn test_stale_prepared_files_removed() {
    let ws = TestWorkspace::new(FakeCargo::default());
    ws.create_file(".sqlx/stale.json", "{}");

    ws.sqlx_prepare().assert().success();

    ws.assert_missing(".sqlx/stale.json");
    assert!(ws.list(".sqlx").is_empty());
}

#[test]
#[serial]
fn test_unrelated_target_contents_preserved() {
    let ws = TestWorkspace::new(FakeCargo::with_queries(&["q"]));
    ws.create_file("target/debug/build.log", "keep me");
    ws.create_file("target/sqlx/leftover.json", "{}");

    ws.sqlx_prepare().assert().success();

    assert_eq!(ws.read_file("target/debug/build.log"), "keep me");
    ws.assert_missing("target/sqlx/leftover.json");
    ws.assert_missing(".sqlx/leftover.json");
}

#[test]
#[serial]
fn test_sqlx_env_only_reaches_check() {
    let ws = TestWorkspace::new(FakeCargo::default());

    ws.sqlx_prepare().assert().success();

    let calls = ws.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0], "clean | offline=unset dir=unset");
    let expected_dir = ws.path().canonicalize().unwrap().join("target/sqlx");
    assert_eq!(
        calls[1],
        format!(
            "check --workspace | offline=false dir={}",
            expected_dir.display()
        )
    );
}

#[test]
#[serial]
fn test_subprocess_failures_do_not_change_exit_status() {
    let ws = TestWorkspace::new(FakeCargo {
        queries: vec!["partial".to_string()],
        clean_exit: 1,
        check_exit: 101,
    });

    ws.sqlx_prepare()
        .assert()
        .success()
        .stdout(predicate::str::contains("cargo clean: exit 1"))
        .stdout(predicate::str::contains("exit 101"));

    ws.assert_exists(".sqlx/query-partial.json");
}

#[test]
#[serial]
fn test_strict_fails_on_check_failure() {
    let ws = TestWorkspace::new(FakeCargo {
        check_exit: 101,
        ..FakeCargo::default()
    });
    ws.create_file(".sqlx/old.json", "{}");

    ws.sqlx_prepare()
        .arg("--strict")
        .assert()
        .failure()
        .stderr(predicate::str::contains("exit code 101"));

    ws.assert_missing(".sqlx");
}

#[test]
#[serial]
fn test_idempotent() {
    let ws = TestWorkspace::new(FakeCargo::with_queries(&["a", "b"]));

    ws.sqlx_prepare().assert().success();
    let first = ws.read_file(".sqlx/query-a.json");
    ws.create_file(".sqlx/sentinel", "x");

    ws.sqlx_prepare().assert().success();

    ws.assert_missing(".sqlx/sentinel");
    assert_eq!(ws.read_file(".sqlx/query-a.json"), first);
    assert_eq!(ws.list(".sqlx"), vec!["query-a.json", "query-b.json"]);
}

#[test]
#[serial]
fn test_check_mode_up_to_date() {
    let ws = TestWorkspace::new(FakeCargo::with_queries(&["a"]));
    ws.sqlx_prepare().assert().success();

    ws.sqlx_prepare()
        .arg("--check")
        .assert()
        .success()
        .stdout(predicate::str::contains("is up to date"));
}

#[test]
#[serial]
fn test_check_mode_out_of_date_leaves_prepared_dir() {
    let ws = TestWorkspace::new(FakeCargo::with_queries(&["a"]));
    ws.create_file(".sqlx/stale.json", "{}");

    ws.sqlx_prepare()
        .arg("--check")
        .assert()
        .failure()
        .stdout(predicate::str::contains("+ query-a.json"))
        .stdout(predicate::str::contains("- stale.json"))
        .stderr(predicate::str::contains("out of date"));

    ws.assert_exists(".sqlx/stale.json");
    ws.assert_missing(".sqlx/query-a.json");
}

#[test]
#[serial]
fn test_workspace_clean_scope_cleans_members() {
    let ws = TestWorkspace::new(FakeCargo::default());

    ws.sqlx_prepare()
        .args(["--clean-scope", "workspace"])
        .assert()
        .success();

    let calls = ws.calls();
    assert!(calls[0].starts_with("metadata --no-deps --format-version 1"));
    assert!(calls[1].starts_with("clean -p alpha -p beta |"));
}

#[test]
#[serial]
fn test_config_file_and_check_args() {
    let ws = TestWorkspace::new(FakeCargo::with_queries(&["q"]));
    ws.create_file(
        "sqlx-prepare.toml",
        r#"
clean_scope = "none"

[layout]
build_dir = "target/sqlx-scratch"
prepare_dir = "db/.sqlx"
"#,
    );

    ws.sqlx_prepare()
        .args(["--", "-p", "ui-backend"])
        .assert()
        .success();

    ws.assert_exists("db/.sqlx/query-q.json");
    ws.assert_exists("target/sqlx-scratch/query-q.json");
    ws.assert_missing(".sqlx");

    let calls = ws.calls();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].starts_with("check -p ui-backend | offline=false"));
}

#[test]
#[serial]
fn test_invalid_layout_rejected() {
    let ws = TestWorkspace::new(FakeCargo::default());

    ws.sqlx_prepare()
        .args(["--prepare-dir", "target/sqlx"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid configuration"));

    assert!(ws.calls().is_empty());
}

#[test]
#[serial]
fn test_layout_covering_workspace_rejected() {
    let ws = TestWorkspace::new(FakeCargo::default());
    ws.create_file("Cargo.toml", "[workspace]\n");
    ws.create_file("target/debug/keep.bin", "bin");

    ws.sqlx_prepare()
        .args(["--prepare-dir", "."])
        .assert()
        .failure()
        .stderr(predicate::str::contains("workspace root"));

    ws.sqlx_prepare()
        .args(["--build-dir", "target"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("target directory"));

    ws.assert_exists("Cargo.toml");
    ws.assert_exists("target/debug/keep.bin");
    assert!(ws.calls().is_empty());
}
