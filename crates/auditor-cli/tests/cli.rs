#![allow(deprecated)]

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;

fn auditor() -> Command {
    let mut cmd = Command::cargo_bin("auditor").unwrap();
    cmd.env_remove("AUDITOR_BACKEND")
        .env_remove("AUDITOR_OUT")
        .env_remove("AUDITOR_COLLECTOR_TIMEOUT")
        .env("RUST_LOG", "warn");
    cmd
}

#[test]
fn version_prints_package_version() {
    auditor()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn unparsable_config_exits_with_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = dir.path().join("audit.yaml");
    fs::write(&cfg, "goals: [unterminated\n").unwrap();

    auditor()
        .args(["run", "--repo", ".", "--report", "r.pdf", "--config"])
        .arg(&cfg)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("config error"));
}

#[test]
fn both_sources_missing_exits_with_run_failure() {
    let dir = tempfile::tempdir().unwrap();
    let missing_repo = dir.path().join("no-such-repo");
    let missing_doc = dir.path().join("no-such-report.pdf");

    auditor()
        .args(["run", "--clone-timeout", "10", "--repo"])
        .arg(&missing_repo)
        .arg("--report")
        .arg(&missing_doc)
        .arg("--out")
        .arg(dir.path().join("run.json"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("no source could be acquired"));

    assert!(!dir.path().join("run.json").exists());
}

#[test]
fn run_then_inspect_round_trip() {
    let repo = tempfile::tempdir().unwrap();
    fs::create_dir_all(repo.path().join("src")).unwrap();
    fs::write(repo.path().join("src/state.py"), "x = 1\n").unwrap();

    let work = tempfile::tempdir().unwrap();
    let report = work.path().join("report.txt");
    fs::write(&report, "see src/state.py for details").unwrap();
    let out = work.path().join("reports/run.json");

    for backend in ["direct", "auto"] {
        let assert = auditor()
            .args(["run", "--goal", "git_forensic_analysis", "--backend", backend])
            .arg("--repo")
            .arg(repo.path())
            .arg("--report")
            .arg(&report)
            .arg("--out")
            .arg(&out)
            .assert()
            .success();

        let summary: serde_json::Value =
            serde_json::from_slice(&assert.get_output().stdout).unwrap();
        assert_eq!(summary["total_evidences"], 2, "backend {backend}");
        assert_eq!(summary["fell_back"], false);
    }

    auditor()
        .arg("inspect")
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("git_forensic_analysis"))
        .stdout(predicate::str::contains("total_evidences: 2"));
}

#[test]
fn inspect_rejects_missing_artifact() {
    auditor()
        .args(["inspect", "/definitely/missing/run.json"])
        .assert()
        .code(2);
}

#[test]
fn goal_and_rubric_are_mutually_exclusive() {
    auditor()
        .args([
            "run", "--repo", ".", "--report", "r", "--goal", "a", "--rubric", "r.yaml",
        ])
        .assert()
        .code(2);
}
