// End-to-end tests for the `leasex` binary: exit codes, reports, stdout
// contracts.
//
// Run with: cargo test -p leasex-cli --test cli_tests -- --nocapture

use std::path::Path;
use std::process::{Command, Output};

use serde_json::{json, Value};
use tempfile::TempDir;

fn leasex() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_leasex"));
    cmd.env_remove("LEASEX_JUDGE_CMD");
    cmd.env_remove("RUST_LOG");
    cmd
}

fn stderr(out: &Output) -> String {
    String::from_utf8_lossy(&out.stderr).into_owned()
}

const FIELDS: &str = r#"
[fields.property_name]
type = "string"
json_ref = "STATIC::General::Property Name"

[fields.start_date]
type = "date"
json_ref = "STATIC::General::Lease Start"

[fields.premises]
type = "json"
json_ref = "TABLE::General::Premises"
"#;

fn lease(name: &str, start: &str, units: &[i64]) -> Value {
    let rows: Vec<Value> = units.iter().map(|u| json!({"Unit": u})).collect();
    json!({
        "General": {
            "static_fields": {"Property Name": name, "Lease Start": start},
            "tables": {"Premises": rows}
        }
    })
}

/// A workspace with fields.toml, gold.json, and pred.json.
fn fixture(pred_start: &str) -> TempDir {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("fields.toml"), FIELDS).unwrap();
    let gold = json!({
        "lease-1": lease("Corporate Center", "2024-01-15", &[400, 500]),
        "lease-2": lease("Harbor Plaza", "2023-06-01", &[10]),
    });
    let pred = json!({
        "lease-1": lease("Corporate Center", pred_start, &[500, 400]),
    });
    std::fs::write(dir.path().join("gold.json"), gold.to_string()).unwrap();
    std::fs::write(dir.path().join("pred.json"), pred.to_string()).unwrap();
    dir
}

fn evaluate(dir: &Path, extra: &[&str]) -> Output {
    let p = |name: &str| dir.join(name).to_string_lossy().into_owned();
    leasex()
        .args(["evaluate", "--config", &p("fields.toml"), "--gold", &p("gold.json"), "--pred", &p("pred.json")])
        .args(extra)
        .output()
        .expect("leasex evaluate")
}

// ===========================================================================
// leasex evaluate
// ===========================================================================

#[test]
fn evaluate_writes_csv_and_summary() {
    let dir = fixture("01/15/2024");
    let csv = dir.path().join("report.csv");
    let summary = dir.path().join("summary.txt");

    let out = evaluate(
        dir.path(),
        &["-o", csv.to_str().unwrap(), "--summary", summary.to_str().unwrap()],
    );
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert!(stderr(&out).contains("evaluated 1 document(s), 1 skipped"));

    let report = std::fs::read_to_string(&csv).unwrap();
    let lines: Vec<&str> = report.lines().collect();
    assert_eq!(
        lines[0],
        "field_name,accuracy,correct_docs,total_docs,mean_score,json_ref,matcher"
    );
    assert_eq!(lines[1], "premises,1.0000,1,1,1.0000,TABLE::General::Premises,json");
    assert_eq!(lines.len(), 4);

    let text = std::fs::read_to_string(&summary).unwrap();
    assert!(text.contains("FIELD EXTRACTION EVALUATION SUMMARY"));
    assert!(text.contains("lease-2"));
}

#[test]
fn evaluate_json_stdout_is_single_value() {
    let dir = fixture("2024-01-16");
    let out = evaluate(dir.path(), &["--json"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));

    let val: Value = serde_json::from_slice(&out.stdout).expect("stdout must be one JSON value");
    assert_eq!(val["processed"], json!(1));
    assert_eq!(val["skipped_documents"], json!(["lease-2"]));
    assert_eq!(val["documents"]["lease-1"]["start_date"]["score"], json!(0.9));
    assert_eq!(val["fields"]["start_date"]["correct"], json!(0));
}

#[test]
fn evaluate_min_accuracy_gate() {
    let dir = fixture("2024-01-16");
    // 2 of 3 evaluations correct.
    let out = evaluate(dir.path(), &["--min-accuracy", "0.9"]);
    assert_eq!(out.status.code(), Some(6), "stderr: {}", stderr(&out));
    assert!(stderr(&out).contains("below"));

    let out = evaluate(dir.path(), &["--min-accuracy", "0.5"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
}

#[test]
fn evaluate_exit_codes() {
    let dir = fixture("2024-01-15");

    std::fs::write(dir.path().join("pred.json"), "[1, 2").unwrap();
    assert_eq!(evaluate(dir.path(), &[]).status.code(), Some(5));

    std::fs::remove_file(dir.path().join("pred.json")).unwrap();
    assert_eq!(evaluate(dir.path(), &[]).status.code(), Some(3));

    std::fs::write(dir.path().join("fields.toml"), "[fields.kind]\ntype = \"enum\"\n").unwrap();
    assert_eq!(evaluate(dir.path(), &[]).status.code(), Some(4));

    let out = evaluate(dir.path(), &["--min-accuracy", "1.5"]);
    assert_eq!(out.status.code(), Some(2));
}

#[cfg(unix)]
#[test]
fn evaluate_with_judge_command() {
    let dir = fixture("2024-01-15");
    let judge = dir.path().join("judge.sh");
    std::fs::write(
        &judge,
        "#!/bin/sh\ncat > /dev/null\necho '{\"score\": 0.5, \"reasoning\": \"halfway\"}'\n",
    )
    .unwrap();
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&judge, std::fs::Permissions::from_mode(0o755)).unwrap();
    }

    let out = evaluate(dir.path(), &["--json", "--judge-cmd", judge.to_str().unwrap()]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    let val: Value = serde_json::from_slice(&out.stdout).unwrap();
    let premises = &val["documents"]["lease-1"]["premises"];
    // 0.3 × 1.0 + 0.7 × 0.5
    assert!((premises["score"].as_f64().unwrap() - 0.65).abs() < 1e-9);
    assert!(premises["feedback"].as_str().unwrap().contains("halfway"));
}

// ===========================================================================
// leasex validate
// ===========================================================================

#[test]
fn validate_lists_fields() {
    let dir = fixture("2024-01-15");
    let out = leasex()
        .args(["validate", dir.path().join("fields.toml").to_str().unwrap()])
        .output()
        .unwrap();
    assert!(out.status.success());
    let err = stderr(&out);
    assert!(err.contains("valid: 3 field(s), 0 without json_ref"), "{err}");
    assert!(err.contains("premises: json"));
}

#[test]
fn validate_json_config() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("fields.json");
    std::fs::write(&path, r#"{"fields": {"ok": {"matcher": "BooleanMatcher"}}}"#).unwrap();
    let out = leasex().args(["validate", path.to_str().unwrap()]).output().unwrap();
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert!(stderr(&out).contains("ok: boolean"));
}

#[test]
fn validate_rejects_bad_config() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("fields.toml");
    std::fs::write(&path, "[fields.x]\nmatcher = \"FancyMatcher\"\n").unwrap();
    let out = leasex().args(["validate", path.to_str().unwrap()]).output().unwrap();
    assert_eq!(out.status.code(), Some(4));
    assert!(stderr(&out).contains("FancyMatcher"));
}

// ===========================================================================
// leasex --version
// ===========================================================================

#[test]
fn long_version_carries_build_metadata() {
    let out = leasex().arg("--version").output().unwrap();
    assert!(out.status.success());
    let text = String::from_utf8_lossy(&out.stdout);
    assert!(text.contains(env!("CARGO_PKG_VERSION")), "{text}");
    assert!(text.contains("scoring: leasex-scoring"), "{text}");
    assert!(text.contains("target:  "), "{text}");
}

// ===========================================================================
// leasex score
// ===========================================================================

fn score(args: &[&str]) -> Output {
    leasex().arg("score").args(args).output().expect("leasex score")
}

#[test]
fn score_prints_score_and_feedback() {
    let out = score(&["--type", "date", "2024-01-15", "2024-01-16"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    let stdout = String::from_utf8_lossy(&out.stdout);
    let mut lines = stdout.lines();
    assert_eq!(lines.next(), Some("score: 0.900"));
    assert!(lines.next().unwrap().contains("Off by 1 day"));
}

#[test]
fn score_json_output() {
    let out = score(&["--type", "number", "--json", "$1M", "1000000"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    let val: Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(val["score"], json!(1.0));
}

#[test]
fn score_with_params() {
    let out = score(&["--type", "enum", "--params", r#"{"preset": "yes_no_na"}"#, "--json", "yes", "Y"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    let val: Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(val["score"], json!(0.0));
}

#[test]
fn score_param_errors() {
    assert_eq!(score(&["--type", "enum", "--params", "[1]", "a", "b"]).status.code(), Some(2));
    assert_eq!(score(&["--type", "enum", "--params", "{", "a", "b"]).status.code(), Some(2));
    // Enum without values is a config error.
    assert_eq!(score(&["--type", "enum", "a", "b"]).status.code(), Some(4));
}
