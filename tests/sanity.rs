use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::PathBuf;

// Use the dev-dependency crate for helpers
use test_helpers::*;

fn touch_track() -> Command {
    let mut cmd = Command::cargo_bin("touch-track").unwrap();
    cmd.env("RUST_LOG", "warn");
    cmd
}

/// Writes `words` to a per-test file in the temp dir and returns its path.
fn write_blob(name: &str, words: &[u32]) -> PathBuf {
    let path = std::env::temp_dir().join(format!("touch-track-{}-{name}.json", std::process::id()));
    fs::write(&path, serde_json::to_string(words).unwrap()).expect("Failed to write config blob");
    path
}

/// First JSON document found in `stderr`.
fn stats_document(stderr: &[u8]) -> Value {
    let text = String::from_utf8_lossy(stderr);
    let start = text.find('{').expect("No JSON statistics on stderr");
    serde_json::Deserializer::from_str(&text[start..])
        .into_iter::<Value>()
        .next()
        .expect("Empty statistics document")
        .expect("Malformed statistics document")
}

#[test]
fn single_touch_with_config_blob() {
    let path = write_blob("single", &legacy_blob(1024, 600));
    let input = frames_jsonl(&[frame(&[(512, 320)], 0)]);

    let output = touch_track().arg("--config").arg(&path).write_stdin(input).output().unwrap();
    let _ = fs::remove_file(&path);

    assert!(output.status.success(), "Command exited with non-zero status: {:?}", output.status);
    let reports = parse_reports(&output.stdout);
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0]["finger_num"], 1);
    assert_eq!(reports[0]["id"][0], 1);
    assert_eq!(reports[0]["x"][0], 512);
    assert_eq!(reports[0]["y"][0], 300);
    assert_eq!(reports[0]["reset_mask"], 0);
    assert_eq!(reports[0]["near"], false);
}

#[test]
fn default_config_scales_to_800x480() {
    let input = frames_jsonl(&[frame(&[(512, 320)], 0)]);
    let output = touch_track().write_stdin(input).output().unwrap();
    assert!(output.status.success());
    let reports = parse_reports(&output.stdout);
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0]["x"][0], 400);
    assert_eq!(reports[0]["y"][0], 240);
}

#[test]
fn one_report_per_frame_and_blank_lines_skipped() {
    let frames = [
        frame(&[(100, 100)], 0),
        frame(&[(100, 100), (600, 400)], 0),
        frame(&[], 0),
    ];
    let mut input = frames_jsonl(&frames);
    input.insert(0, '\n');
    input.push('\n');

    let output = touch_track().write_stdin(input).output().unwrap();
    assert!(output.status.success());
    let reports = parse_reports(&output.stdout);
    let counts: Vec<_> = reports.iter().map(|r| r["finger_num"].as_u64()).collect();
    assert_eq!(counts, vec![Some(1), Some(2), Some(0)]);
}

#[test]
fn stats_json_reports_frame_counts() {
    let frames = [frame(&[(100, 100)], 0), frame(&[(100, 100)], 0), frame(&[], 0)];
    let output = touch_track()
        .arg("--stats-json")
        .write_stdin(frames_jsonl(&frames))
        .output()
        .unwrap();
    assert!(output.status.success());

    let doc = stats_document(&output.stderr);
    assert_eq!(doc["stats"]["frames_processed"], 3);
    assert_eq!(doc["stats"]["frames_with_touch"], 2);
    assert_eq!(doc["stats"]["points_emitted"], 2);
    assert_eq!(doc["meta"]["config_source"], "<default>");
    assert_eq!(doc["meta"]["layout"]["kind"], "default");
}

#[test]
fn human_stats_on_stderr() {
    touch_track()
        .write_stdin(frames_jsonl(&[frame(&[(100, 100)], 0)]))
        .assert()
        .success()
        .stderr(predicate::str::contains("--- Overall Statistics ---"))
        .stderr(predicate::str::contains("Frames Processed:   1"));
}

#[test]
fn malformed_frame_exits_with_code_3() {
    touch_track()
        .write_stdin("{\"finger_num\": \"lots\"}\n")
        .assert()
        .code(3);
}

#[test]
fn missing_config_file_fails() {
    touch_track()
        .arg("--config")
        .arg("/nonexistent/touch-track/panel.json")
        .write_stdin("")
        .assert()
        .failure()
        .stderr(predicate::str::contains("reading config blob"));
}

#[test]
fn config_blob_must_be_a_word_array() {
    let path = std::env::temp_dir().join(format!("touch-track-{}-bad.json", std::process::id()));
    fs::write(&path, "{\"screen\": 1024}").unwrap();
    let assert = touch_track().arg("--config").arg(&path).write_stdin("").assert();
    let _ = fs::remove_file(&path);
    assert
        .failure()
        .stderr(predicate::str::contains("JSON array of u32"));
}

#[test]
fn empty_input_is_success() {
    touch_track().write_stdin("").assert().success().stdout(predicate::str::is_empty());
}
