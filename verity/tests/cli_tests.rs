// verity/tests/cli_tests.rs
//
// End-to-end coverage of the CLI surface against a small, self-contained
// project fixture (no dependency on any path under the reference pack).

use assert_cmd::prelude::*;
use predicates::str::contains;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

struct TestProject {
    _tmp: TempDir,
    root: PathBuf,
}

impl TestProject {
    fn new() -> Self {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().to_path_buf();

        fs::write(
            root.join("verity_project_conf.yaml"),
            "name: demo\nversion: \"1.0\"\n",
        )
        .unwrap();

        fs::create_dir_all(root.join("models")).unwrap();
        fs::write(
            root.join("models/stg_orders.sql"),
            "SELECT 1 AS order_id, 100 AS amount",
        )
        .unwrap();
        fs::write(
            root.join("models/revenue.sql"),
            "SELECT order_id, amount FROM {{ ref('stg_orders') }}",
        )
        .unwrap();

        fs::write(
            root.join("schema.yml"),
            r#"
models:
  - name: revenue
    config:
      materialized: table
    columns:
      - name: order_id
        tests: [not_null, unique]
"#,
        )
        .unwrap();

        TestProject { _tmp: tmp, root }
    }

    fn verity(&self) -> Command {
        let mut cmd = Command::cargo_bin("verity").unwrap();
        cmd.current_dir(&self.root);
        cmd
    }

    fn path(&self, rel: &str) -> PathBuf {
        self.root.join(rel)
    }
}

fn has_file_containing(dir: &Path, needle: &str) -> bool {
    walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .any(|e| e.file_name().to_string_lossy().contains(needle))
}

#[test]
fn list_shows_discovered_models() {
    let project = TestProject::new();
    project
        .verity()
        .arg("list")
        .assert()
        .success()
        .stdout(contains("revenue"))
        .stdout(contains("stg_orders"));
}

#[test]
fn plan_classifies_models_never_run_before_as_create() {
    let project = TestProject::new();
    project
        .verity()
        .arg("plan")
        .assert()
        .success()
        .stdout(contains("Create"));
}

#[test]
fn deps_text_format_shows_the_ref_edge() {
    let project = TestProject::new();
    project
        .verity()
        .args(["deps", "--format", "text"])
        .assert()
        .success()
        .stdout(contains("revenue -> stg_orders"));
}

#[test]
fn run_all_creates_the_warehouse_file_and_state() {
    let project = TestProject::new();
    project.verity().arg("run-all").assert().success();

    assert!(has_file_containing(&project.path("."), "duckdb"));
    assert!(project.path("target/.state").exists());
}

#[test]
fn validate_runs_declared_column_tests() {
    let project = TestProject::new();
    project.verity().arg("run-all").assert().success();
    project
        .verity()
        .arg("validate")
        .assert()
        .success()
        .stdout(contains("test(s) run"));
}

#[test]
fn run_without_models_is_rejected_by_the_parser() {
    let project = TestProject::new();
    project.verity().arg("run").assert().failure();
}

#[test]
fn second_run_with_no_changes_reports_no_changes_in_the_plan() {
    let project = TestProject::new();
    project.verity().arg("run-all").assert().success();

    project
        .verity()
        .arg("plan")
        .assert()
        .success()
        .stdout(contains("NoChange"));
}
