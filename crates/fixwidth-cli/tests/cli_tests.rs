//! Integration tests for the fixwidth CLI
//!
//! These tests invoke the actual fixwidth binary and verify:
//! - Exit codes (0 = success, 1 = invalid definition/data or failed parse, 2 = I/O or usage error)
//! - stdout/stderr output
//! - JSON output format

use std::path::PathBuf;
use std::process::Command;

// ── Helpers ───────────────────────────────────────────────

fn fixwidth_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_fixwidth"))
}

fn fixture(path: &str) -> String {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../tests/fixtures")
        .join(path)
        .to_string_lossy()
        .into_owned()
}

fn run(args: &[&str]) -> std::process::Output {
    Command::new(fixwidth_bin())
        .args(args)
        .current_dir(env!("CARGO_MANIFEST_DIR"))
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to execute fixwidth")
}

fn stdout_json(output: &std::process::Output) -> serde_json::Value {
    let stdout = String::from_utf8_lossy(&output.stdout);
    serde_json::from_str(&stdout).expect("should be valid JSON")
}

// ── Version ───────────────────────────────────────────────

#[test]
fn test_version_command() {
    let output = run(&["version"]);
    assert!(output.status.success(), "version should exit 0");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("fixwidth"), "should contain 'fixwidth'");
    assert!(stdout.contains(env!("CARGO_PKG_VERSION")), "should contain version");
}

#[test]
fn test_version_flag() {
    let output = run(&["--version"]);
    assert!(output.status.success(), "--version should exit 0");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains(env!("CARGO_PKG_VERSION")), "should contain version");
}

#[test]
fn test_unknown_command_is_usage_error() {
    let output = run(&["frobnicate"]);
    assert_eq!(output.status.code(), Some(2), "usage error should exit 2");
}

// ── Validate ──────────────────────────────────────────────

#[test]
fn test_validate_valid_definition() {
    let output = run(&["validate", &fixture("definitions/bank.json")]);
    assert!(output.status.success(), "valid definition should exit 0");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("valid"), "should mention valid");
}

#[test]
fn test_validate_unresolved_references() {
    let output = run(&["validate", &fixture("definitions/unresolved.json")]);
    assert_eq!(output.status.code(), Some(1), "unresolved references should exit 1");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("error"), "should mention error");
    assert!(stderr.contains("money"), "should name the missing schema");
    assert!(stderr.contains("footer"), "should name the missing section leaf");
}

#[test]
fn test_validate_json_output() {
    let output = run(&["validate", "--json", &fixture("definitions/bank.json")]);
    assert!(output.status.success());
    let json = stdout_json(&output);
    assert_eq!(json["valid"], true);
    assert_eq!(json["errors"], 0);
}

#[test]
fn test_validate_json_invalid() {
    let output = run(&["--json", "validate", &fixture("definitions/unresolved.json")]);
    assert_eq!(output.status.code(), Some(1));
    let json = stdout_json(&output);
    assert_eq!(json["valid"], false);
    assert_eq!(json["errors"], 2);
}

#[test]
fn test_validate_quiet() {
    let output = run(&["validate", "--quiet", &fixture("definitions/bank.json")]);
    assert!(output.status.success());
    assert!(output.stdout.is_empty(), "quiet should print nothing on success");
}

#[test]
fn test_validate_malformed_document() {
    let output = run(&["validate", &fixture("definitions/malformed.json")]);
    assert_eq!(output.status.code(), Some(1), "malformed document should exit 1");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Invalid definition document"));
}

#[test]
fn test_validate_nonexistent_file() {
    let output = run(&["validate", "nonexistent.json"]);
    assert_eq!(output.status.code(), Some(2), "missing file should exit 2");
}

// ── Length ────────────────────────────────────────────────

#[test]
fn test_length_all_schemas() {
    let output = run(&["length", "--json", &fixture("definitions/bank.json")]);
    assert!(output.status.success());
    let json = stdout_json(&output);
    assert_eq!(json["header"], 10);
    assert_eq!(json["detail"], 10);
    assert_eq!(json["money"], 5);
}

#[test]
fn test_length_unresolved_reference() {
    let output = run(&["length", &fixture("definitions/unresolved.json"), "row"]);
    assert_eq!(output.status.code(), Some(1));
}

// ── Parse ─────────────────────────────────────────────────

#[test]
fn test_parse_file() {
    let output = run(&[
        "parse",
        &fixture("definitions/bank.json"),
        &fixture("inputs/bank.txt"),
        "--section",
        "file",
    ]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let json = stdout_json(&output);
    assert_eq!(json["header"]["date"], "20240115");
    assert_eq!(json["detail"][0]["id"], 1);
    assert_eq!(json["detail"][1]["amount"]["cents"], 1500);
    assert_eq!(json["trailer"]["count"], 2);
}

#[test]
fn test_parse_missing_required_schema() {
    let output = run(&[
        "parse",
        &fixture("definitions/bank.json"),
        &fixture("inputs/bank-missing-trailer.txt"),
        "--section",
        "file",
    ]);
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("trailer"), "should name the missing schema");
}

#[test]
fn test_parse_unused_input() {
    let args: [&str; 5] = [
        "parse",
        &fixture("definitions/bank.json"),
        &fixture("inputs/bank-extra.txt"),
        "--section",
        "file",
    ];
    let strict = run(&args);
    assert_eq!(strict.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&strict.stderr);
    assert!(stderr.contains("line 4"), "should cite the unused line");

    let mut lenient_args = args.to_vec();
    lenient_args.push("--no-verify");
    let lenient = run(&lenient_args);
    assert!(lenient.status.success());
}

#[test]
fn test_parse_skip_blank() {
    let args: [&str; 5] = [
        "parse",
        &fixture("definitions/bank.json"),
        &fixture("inputs/bank-blank-lines.txt"),
        "--section",
        "file",
    ];
    assert_eq!(run(&args).status.code(), Some(1));

    let mut skipping = args.to_vec();
    skipping.push("--skip-blank");
    let output = run(&skipping);
    assert!(output.status.success());
    assert_eq!(stdout_json(&output)["trailer"]["count"], 1);
}

#[test]
fn test_parse_json_error() {
    let output = run(&[
        "--json",
        "parse",
        &fixture("definitions/bank.json"),
        &fixture("inputs/bank-missing-trailer.txt"),
        "--section",
        "file",
    ]);
    assert_eq!(output.status.code(), Some(1));
    let json = stdout_json(&output);
    assert_eq!(json["success"], false);
    assert!(json["error"].as_str().unwrap().contains("trailer"));
}

#[test]
fn test_parse_missing_input_file() {
    let output = run(&["parse", &fixture("definitions/bank.json"), "missing.txt"]);
    assert_eq!(output.status.code(), Some(2));
}

// ── Generate ──────────────────────────────────────────────

#[test]
fn test_generate_matches_input_file() {
    let output = run(&[
        "generate",
        &fixture("definitions/bank.json"),
        &fixture("data/bank.json"),
        "--section",
        "file",
    ]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let expected = std::fs::read_to_string(fixture("inputs/bank.txt")).unwrap();
    assert_eq!(String::from_utf8_lossy(&output.stdout), expected);
}

#[test]
fn test_generate_required_schema_empty() {
    let output = run(&[
        "generate",
        &fixture("definitions/bank.json"),
        &fixture("data/bank-no-details.json"),
        "--section",
        "file",
    ]);
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("detail"));
}

#[test]
fn test_generate_to_file() {
    let target = std::env::temp_dir().join(format!("fixwidth-cli-{}.txt", std::process::id()));
    let output = run(&[
        "generate",
        &fixture("definitions/bank.json"),
        &fixture("data/bank.json"),
        "--section",
        "file",
        "--output",
        target.to_str().unwrap(),
    ]);
    assert!(output.status.success());
    let written = std::fs::read_to_string(&target).unwrap();
    let _ = std::fs::remove_file(&target);
    assert_eq!(written, "H 20240115\nD001 00042\nD002 01500\nT000000002");
}

// ── Determinism ───────────────────────────────────────────

#[test]
fn test_parse_deterministic_output() {
    let args: [&str; 5] = [
        "parse",
        &fixture("definitions/bank.json"),
        &fixture("inputs/bank.txt"),
        "--section",
        "file",
    ];
    let first = run(&args);
    for _ in 0..5 {
        let output = run(&args);
        assert_eq!(first.stdout, output.stdout, "parse output should be deterministic");
    }
}
