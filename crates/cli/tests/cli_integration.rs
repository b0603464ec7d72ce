//! CLI integration tests for every subcommand.
//!
//! Uses `assert_cmd` to spawn the `octave-parse` binary and verify
//! exit codes, stdout content, and stderr content. Source files are
//! written to a fresh temporary directory per test.

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

fn octave() -> Command {
    cargo_bin_cmd!("octave-parse")
}

/// Write `source` to `name` inside a new temp dir.
fn source_file(name: &str, source: &str) -> (TempDir, PathBuf) {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join(name);
    fs::write(&path, source).expect("write source");
    (dir, path)
}

// ──────────────────────────────────────────────
// 1. Help and version
// ──────────────────────────────────────────────

#[test]
fn help_exits_0_with_description() {
    octave()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Parse Octave source files"));
}

#[test]
fn version_exits_0() {
    octave()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("octave-parse"));
}

#[test]
fn unknown_subcommand_fails() {
    octave().arg("compile").assert().failure();
}

// ──────────────────────────────────────────────
// 2. parse
// ──────────────────────────────────────────────

#[test]
fn parse_valid_file_prints_sexp() {
    let (_dir, path) = source_file("ok.m", "x = 5;\n");
    octave()
        .arg("parse")
        .arg(&path)
        .assert()
        .success()
        .stdout("(source_file (variable_definition (identifier) (number)))\n")
        .stderr(predicate::str::is_empty());
}

#[test]
fn parse_all_includes_anonymous_tokens() {
    let (_dir, path) = source_file("ok.m", "function f() end");
    octave()
        .args(["parse", "--all"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains(
            r#"(function_definition "function" (identifier) (parameter_list "(" ")") "end")"#,
        ));
}

#[test]
fn parse_invalid_file_exits_1_with_located_errors() {
    let (_dir, path) = source_file("bad.m", "x = ;");
    octave()
        .arg("parse")
        .arg(&path)
        .assert()
        .failure()
        .code(1)
        .stdout(predicate::str::contains("(variable_definition (identifier))"))
        .stderr(predicate::str::contains(
            "1:5: expected identifier or number, but found ';'",
        ))
        .stderr(predicate::str::contains("unexpected end of input"));
}

#[test]
fn parse_quiet_suppresses_error_listing() {
    let (_dir, path) = source_file("bad.m", "x = ;");
    octave()
        .args(["--quiet", "parse"])
        .arg(&path)
        .assert()
        .code(1)
        .stderr(predicate::str::is_empty());
}

#[test]
fn parse_json_output_has_tree_and_errors() {
    let (_dir, path) = source_file("bad.m", "x = ;");
    let out = octave()
        .args(["--output", "json", "parse"])
        .arg(&path)
        .assert()
        .code(1)
        .get_output()
        .stdout
        .clone();
    let report: serde_json::Value = serde_json::from_slice(&out).expect("valid JSON");
    assert_eq!(report["tree"]["kind"], "source_file");
    assert_eq!(
        report["tree"]["children"][0]["kind"],
        "variable_definition"
    );
    assert_eq!(report["errors"][0]["kind"], "syntax");
    assert_eq!(report["errors"][0]["found"], ";");
    assert_eq!(report["errors"][1]["kind"], "unexpected_end_of_input");
}

#[test]
fn parse_missing_file_exits_1() {
    octave()
        .args(["parse", "/nonexistent/path/prog.m"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("error reading file"));
}

#[test]
fn parse_missing_file_json_error() {
    octave()
        .args(["--output", "json", "parse", "/nonexistent/path/prog.m"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("\"error\""));
}

// ──────────────────────────────────────────────
// 3. tokens
// ──────────────────────────────────────────────

#[test]
fn tokens_lists_kinds_and_spans() {
    let (_dir, path) = source_file("t.m", "endpoint = 1;");
    octave()
        .arg("tokens")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("identifier 0..8 \"endpoint\""))
        .stdout(predicate::str::contains("= 9..10 \"=\""))
        .stdout(predicate::str::contains("EOF 13..13 \"\""));
}

#[test]
fn tokens_reports_unrecognized_characters() {
    let (_dir, path) = source_file("t.m", "x $ 1");
    octave()
        .arg("tokens")
        .arg(&path)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("unrecognized character \"$\""));
}

#[test]
fn tokens_json() {
    let (_dir, path) = source_file("t.m", "if x");
    let out = octave()
        .args(["--output", "json", "tokens"])
        .arg(&path)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let report: serde_json::Value = serde_json::from_slice(&out).expect("valid JSON");
    let tokens = report["tokens"].as_array().expect("token array");
    assert_eq!(tokens.len(), 3);
    assert_eq!(tokens[0]["kind"], "if");
    assert_eq!(tokens[1]["text"], "x");
    assert_eq!(tokens[2]["kind"], "EOF");
}

// ──────────────────────────────────────────────
// 4. symbols
// ──────────────────────────────────────────────

#[test]
fn symbols_lists_every_symbol() {
    octave()
        .arg("symbols")
        .assert()
        .success()
        .stdout(predicate::str::contains("source_file"))
        .stdout(predicate::str::contains("statement_repeat1"))
        .stdout(predicate::str::contains("_expression"));
}

#[test]
fn symbols_json_has_31_entries() {
    let out = octave()
        .args(["--output", "json", "symbols"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let table: serde_json::Value = serde_json::from_slice(&out).expect("valid JSON");
    let rows = table.as_array().expect("array");
    assert_eq!(rows.len(), 31);
    assert_eq!(rows[15]["name"], "identifier");
    assert_eq!(rows[15]["named"], true);
    assert_eq!(rows[1]["named"], false);
    assert_eq!(rows[18]["visible"], false);
}
