//! CLI integration tests
//!
//! These tests run the built binary against schemas and documents written to a
//! temporary directory.

#![cfg(feature = "cli")]

mod common;

use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};
use tempfile::TempDir;

fn validatelet_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_validatelet"))
}

struct Fixture {
    dir: TempDir,
}

impl Fixture {
    fn new() -> Self {
        let dir = TempDir::new().expect("temp dir");
        let json = common::element_with_attribute().to_json().expect("schema json");
        fs::write(dir.path().join("schema.json"), json).expect("write schema");
        Fixture { dir }
    }

    fn schema(&self) -> String {
        self.dir.path().join("schema.json").display().to_string()
    }

    fn document(&self, name: &str, content: &str) -> String {
        let path = self.dir.path().join(name);
        fs::write(&path, content).expect("write document");
        path.display().to_string()
    }
}

fn run(args: &[&str]) -> Output {
    Command::new(validatelet_bin())
        .args(args)
        .output()
        .expect("Failed to execute command")
}

// ============================================================================
// Validate Command Tests
// ============================================================================

#[test]
fn test_cli_validate_valid_document() {
    let fixture = Fixture::new();
    let doc = fixture.document("ok.xml", r#"<a x="1"/>"#);

    let output = run(&["validate", "-s", &fixture.schema(), &doc]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "valid document should exit 0");
    assert!(stdout.contains("is valid"), "stdout: {stdout}");
}

#[test]
fn test_cli_validate_invalid_document() {
    let fixture = Fixture::new();
    let ok = fixture.document("ok.xml", r#"<a x="1"/>"#);
    let bad = fixture.document("bad.xml", "<a/>");

    let output = run(&["validate", "-s", &fixture.schema(), &ok, &bad]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert_eq!(output.status.code(), Some(1));
    assert!(stdout.contains("ok.xml is valid"), "stdout: {stdout}");
    assert!(stdout.contains("bad.xml is invalid"), "stdout: {stdout}");
}

#[test]
fn test_cli_validate_malformed_xml() {
    let fixture = Fixture::new();
    let doc = fixture.document("broken.xml", "<a x='1'>");

    let output = run(&["validate", "-s", &fixture.schema(), &doc]);

    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("broken.xml"));
}

#[test]
fn test_cli_validate_missing_schema() {
    let fixture = Fixture::new();
    let doc = fixture.document("ok.xml", r#"<a x="1"/>"#);
    let missing = fixture.dir.path().join("missing.json").display().to_string();

    let output = run(&["validate", "-s", &missing, &doc]);

    assert_eq!(output.status.code(), Some(2));
}

// ============================================================================
// Inspect Command Tests
// ============================================================================

#[test]
fn test_cli_inspect_basic() {
    let fixture = Fixture::new();

    let output = run(&["inspect", &fixture.schema(), "--names"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "inspect should succeed");
    assert!(stdout.contains("validatelet v"), "should show version");
    assert!(stdout.contains("States: 6"), "should show state count");
    assert!(stdout.contains("Name Literals: 3"), "should show name count");
    assert!(stdout.contains("=== Name Literals ==="));
}

#[test]
fn test_cli_inspect_json_output() {
    let fixture = Fixture::new();

    let output = run(&[
        "inspect",
        "--json",
        "--states",
        &fixture.schema(),
    ]);
    assert!(output.status.success(), "inspect --json should succeed");

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).expect("valid JSON");
    assert_eq!(json["statistics"]["states"], 6);
    assert_eq!(json["statistics"]["finalStates"], 2);
    assert_eq!(json["defaultNameCode"], 0);
    assert!(json.get("names").is_none());

    let states = json["states"].as_array().expect("states array");
    assert_eq!(states.len(), 6);
    assert_eq!(states[0]["transitions"]["element"], 1);
    assert_eq!(states[1]["persistent"], false);
}
