//! End-to-end CLI tests for the full analysis pipeline
#![allow(deprecated)] // suppress assert_cmd::Command::cargo_bin deprecation in tests

use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Create a run folder with one page timing record, pausing so directory
/// mtimes order the runs the way they were created
fn write_run(root: &Path, name: &str, url: &str, elapsed: f64) {
    let dir = root.join(name);
    fs::create_dir(&dir).unwrap();
    fs::write(
        dir.join("crawl_metrics.csv"),
        format!("url,timeTaken\n{url},{elapsed}\n"),
    )
    .unwrap();
    std::thread::sleep(std::time::Duration::from_millis(20));
}

#[test]
fn test_cli_help() {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("centinela");
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage"));
}

#[test]
fn test_missing_results_dir_is_fatal() {
    let tmp = TempDir::new().unwrap();
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("centinela");
    cmd.arg("--results-dir")
        .arg(tmp.path().join("nope"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("no run folders found"));
}

#[test]
fn test_results_dir_with_only_reserved_folders_is_fatal() {
    let tmp = TempDir::new().unwrap();
    fs::create_dir(tmp.path().join("visual_diffs")).unwrap();
    fs::create_dir(tmp.path().join("charts")).unwrap();

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("centinela");
    cmd.arg("--results-dir")
        .arg(tmp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("no run folders found"));
}

#[test]
fn test_three_run_regression_end_to_end() {
    let tmp = TempDir::new().unwrap();
    // Averages oldest -> newest: 10, 10, 50
    write_run(tmp.path(), "run_1", "https://home.example", 10.0);
    write_run(tmp.path(), "run_2", "https://home.example", 10.0);
    write_run(tmp.path(), "run_3", "https://home.example", 50.0);

    let out_path = tmp.path().join("insights.json");
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("centinela");
    let assert = cmd
        .arg("--results-dir")
        .arg(tmp.path())
        .arg("--format")
        .arg("json")
        .arg("--output")
        .arg(&out_path)
        .assert()
        .success();

    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    let payload: serde_json::Value = serde_json::from_str(&stdout).unwrap();

    assert_eq!(payload["runId"], "run_3");

    // Baseline is the immediately-prior run with data, not the oldest
    let run_level = &payload["performanceAnomalies"]["runLevel"][0];
    assert_eq!(run_level["previousRunId"], "run_2");
    assert_eq!(run_level["previousAvg"], 10.0);
    assert_eq!(run_level["latestAvg"], 50.0);
    assert_eq!(run_level["percentChange"], 400.0);
    assert_eq!(run_level["alertFlag"], true);

    // The single page regressed 400% as well
    let per_page = payload["performanceAnomalies"]["perPage"].as_array().unwrap();
    assert_eq!(per_page.len(), 1);
    assert_eq!(per_page[0]["reason"], "percent_increase");
    assert_eq!(per_page[0]["pctChange"], 400.0);

    assert_eq!(payload["summary"]["source"], "local");
    let text = payload["summary"]["text"].as_str().unwrap();
    assert!(text.contains("Investigate overall performance regressions"));

    // Payload persisted to the requested location
    let saved: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&out_path).unwrap()).unwrap();
    assert_eq!(saved["runId"], "run_3");
}

#[test]
fn test_visual_floor_end_to_end() {
    let tmp = TempDir::new().unwrap();
    write_run(tmp.path(), "run_1", "https://home.example", 2.0);

    let diffs_dir = tmp.path().join("visual_diffs");
    fs::create_dir(&diffs_dir).unwrap();
    fs::write(
        diffs_dir.join("visual_diff_summary.json"),
        r#"[
            {"url": "https://a.example", "diffPercent": 0.0},
            {"url": "https://b.example", "diffPercent": 0.0},
            {"url": "https://c.example", "diffPercent": 0.0},
            {"url": "https://d.example", "diffPercent": 0.0},
            {"url": "https://changed.example", "diffPercent": 1.0}
        ]"#,
    )
    .unwrap();

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("centinela");
    let assert = cmd
        .arg("--results-dir")
        .arg(tmp.path())
        .arg("--format")
        .arg("json")
        .arg("--no-save")
        .assert()
        .success();

    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    let payload: serde_json::Value = serde_json::from_str(&stdout).unwrap();

    // Threshold is max(1.0, mean + 2*stdev) = 1.0; only the 1.0 diff is at it
    let visual = payload["visualAnomalies"].as_array().unwrap();
    assert_eq!(visual.len(), 1);
    assert_eq!(visual[0]["url"], "https://changed.example");
    assert_eq!(visual[0]["reason"], "high_diff");
}

#[test]
fn test_stable_single_run_text_output() {
    let tmp = TempDir::new().unwrap();
    write_run(tmp.path(), "run_1", "https://home.example", 2.0);

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("centinela");
    cmd.arg("--results-dir")
        .arg(tmp.path())
        .arg("--no-save")
        .assert()
        .success()
        .stdout(predicate::str::contains("=== Crawl Insight Summary ==="))
        .stdout(predicate::str::contains("Run:       run_1"))
        .stdout(predicate::str::contains("No significant anomalies detected"))
        .stdout(predicate::str::contains("Recommendations:"));
}

#[test]
fn test_external_summary_command_success() {
    let tmp = TempDir::new().unwrap();
    write_run(tmp.path(), "run_1", "https://home.example", 2.0);

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("centinela");
    let assert = cmd
        .arg("--results-dir")
        .arg(tmp.path())
        .arg("--format")
        .arg("json")
        .arg("--no-save")
        .arg("--summary-cmd")
        .arg("echo polished external summary")
        .assert()
        .success();

    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    let payload: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(payload["summary"]["source"], "external");
    assert_eq!(payload["summary"]["text"], "polished external summary");
}

#[test]
fn test_external_summary_command_failure_falls_back_to_local() {
    let tmp = TempDir::new().unwrap();
    write_run(tmp.path(), "run_1", "https://home.example", 2.0);

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("centinela");
    let assert = cmd
        .arg("--results-dir")
        .arg(tmp.path())
        .arg("--format")
        .arg("json")
        .arg("--no-save")
        .arg("--summary-cmd")
        .arg("false")
        .assert()
        .success();

    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    let payload: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(payload["summary"]["source"], "local");
    assert!(payload["summary"]["text"]
        .as_str()
        .unwrap()
        .contains("Recommendations:"));
}

#[test]
fn test_no_save_skips_insights_file() {
    let tmp = TempDir::new().unwrap();
    write_run(tmp.path(), "run_1", "https://home.example", 2.0);

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("centinela");
    cmd.arg("--results-dir")
        .arg(tmp.path())
        .arg("--no-save")
        .assert()
        .success();

    assert!(!tmp.path().join("ai_insights.json").exists());
}

#[test]
fn test_insights_file_written_by_default() {
    let tmp = TempDir::new().unwrap();
    write_run(tmp.path(), "run_1", "https://home.example", 2.0);

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("centinela");
    cmd.arg("--results-dir").arg(tmp.path()).assert().success();

    let saved: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(tmp.path().join("ai_insights.json")).unwrap())
            .unwrap();
    assert_eq!(saved["runId"], "run_1");
    assert!(saved["timestamp"].as_str().unwrap().ends_with('Z'));
}

#[test]
fn test_run_with_json_fallback_metrics_only() {
    let tmp = TempDir::new().unwrap();
    // Older-tool run: summary.json only
    let dir = tmp.path().join("run_legacy");
    fs::create_dir(&dir).unwrap();
    fs::write(
        dir.join("summary.json"),
        r#"[
            {"url": "https://a.example", "timeTaken": 1.5},
            {"url": "https://b.example", "timeTaken": "oops"}
        ]"#,
    )
    .unwrap();

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("centinela");
    let assert = cmd
        .arg("--results-dir")
        .arg(tmp.path())
        .arg("--format")
        .arg("json")
        .arg("--no-save")
        .assert()
        .success();

    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    let payload: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(payload["runId"], "run_legacy");
    // One coercible record, no comparison baseline: nothing to flag
    assert_eq!(
        payload["performanceAnomalies"]["perPage"].as_array().unwrap().len(),
        0
    );
    assert_eq!(
        payload["performanceAnomalies"]["runLevel"].as_array().unwrap().len(),
        0
    );
}
