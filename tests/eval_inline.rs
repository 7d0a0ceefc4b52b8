use std::fs;
use std::process::{Command, Output};

fn calc() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_calc"));
    cmd.env_remove("RUST_LOG").env("NO_COLOR", "1");
    cmd
}

fn run(args: &[&str]) -> Output {
    calc().args(args).output().expect("failed to run calc")
}

fn stdout(out: &Output) -> String {
    String::from_utf8_lossy(&out.stdout).trim().to_string()
}

fn stderr(out: &Output) -> String {
    String::from_utf8_lossy(&out.stderr).to_string()
}

// --- Inline expressions ---

#[test]
fn inline_single_word() {
    let out = run(&["2+3*4"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert_eq!(stdout(&out), "14");
}

#[test]
fn inline_words_are_joined_with_spaces() {
    let out = run(&["3", "-", "5"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert_eq!(stdout(&out), "-2");
}

#[test]
fn inline_negative_literal() {
    let out = run(&["-2.5"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert_eq!(stdout(&out), "-2.5");
}

#[test]
fn inline_functions_and_constants() {
    let out = run(&["pi*2"]);
    assert_eq!(stdout(&out), "6.283185307179586");
    let out = run(&["sqrt(16)"]);
    assert_eq!(stdout(&out), "4");
}

// --- Inline expressions: emit ---

#[test]
fn emit_tokens() {
    let out = run(&["--emit", "tokens", "1 + pi"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    let text = stdout(&out);
    assert!(text.contains("1:1 Number(1)"), "got: {text}");
    assert!(text.contains("1:3 +"), "got: {text}");
    assert!(text.contains("1:5 Identifier(pi)"), "got: {text}");
    assert!(text.ends_with("EOF"), "got: {text}");
}

#[test]
fn emit_ast_is_json() {
    let out = run(&["--emit", "ast", "sqrt(16)"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    let v: serde_json::Value = serde_json::from_str(&stdout(&out)).expect("AST JSON");
    assert_eq!(v["Call"]["name"], "sqrt");
}

#[test]
fn emit_bytecode() {
    let out = run(&["--emit", "bytecode", "1+2"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    let text = stdout(&out);
    assert!(text.contains("constants [0: 1 1: 2]"), "got: {text}");
    assert!(text.contains("Constant(1)"), "got: {text}");
    assert!(text.contains("Add()"), "got: {text}");
}

// --- Error cases ---

#[test]
fn no_args_shows_usage() {
    let out = calc().output().expect("failed to run calc");
    assert!(!out.status.success());
    assert!(stderr(&out).contains("Usage"), "expected usage, got: {}", stderr(&out));
}

#[test]
fn unspaced_subtraction_reports_parse_error() {
    let out = run(&["3-5"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(out.stdout.is_empty());
    let err = stderr(&out);
    assert!(err.contains("error[CALC-P001]"), "got: {err}");
    assert!(err.contains("--> 1:2"), "got: {err}");
    assert!(err.contains("help:"), "got: {err}");
}

#[test]
fn deep_nesting_reports_parse_error() {
    let source = format!("{}1{}", "(".repeat(5000), ")".repeat(5000));
    let out = run(&[&source]);
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("error[CALC-P002]"), "got: {}", stderr(&out));
}

#[test]
fn unknown_function_suggests_name() {
    let out = run(&["sqr(4)"]);
    assert_eq!(out.status.code(), Some(1));
    let err = stderr(&out);
    assert!(err.contains("unknown function 'sqr'"), "got: {err}");
    assert!(err.contains("did you mean 'sqrt'?"), "got: {err}");
}

#[test]
fn json_errors() {
    let out = run(&["--json", "tau"]);
    assert_eq!(out.status.code(), Some(1));
    let v: serde_json::Value = serde_json::from_str(stderr(&out).trim()).expect("JSON diagnostic");
    assert_eq!(v["code"], "CALC-C001");
    assert_eq!(v["message"], "unknown constant 'tau'");
}

#[test]
fn no_color_flag_strips_escapes() {
    let out = calc().env_remove("NO_COLOR").args(["--no-color", "*"]).output().unwrap();
    assert!(!stderr(&out).contains('\x1b'));
}

// --- Files and archives ---

#[test]
fn file_runs_source() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("expr.calc");
    fs::write(&src, "(2 + 3)\n  * 4\n").unwrap();
    let out = run(&["file", src.to_str().unwrap()]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert_eq!(stdout(&out), "20");
}

#[test]
fn build_then_run_default_output() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("area.calc");
    fs::write(&src, "pi * (2 ^ 2)").unwrap();

    let out = run(&["build", src.to_str().unwrap()]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    let archive = dir.path().join("area.cb");
    let bytes = fs::read(&archive).expect("archive written next to source");
    assert_eq!(&bytes[..8], b"calc.arc");

    let out = run(&["run", archive.to_str().unwrap()]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert_eq!(stdout(&out), (std::f64::consts::PI * 4.0).to_string());
}

#[test]
fn build_with_explicit_output() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("in.calc");
    let dest = dir.path().join("custom.bin");
    fs::write(&src, "sqrt(81)").unwrap();

    let out = run(&["build", src.to_str().unwrap(), "-o", dest.to_str().unwrap()]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    let out = run(&["run", dest.to_str().unwrap()]);
    assert_eq!(stdout(&out), "9");
}

#[test]
fn build_failure_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("bad.calc");
    fs::write(&src, "nope(1)").unwrap();
    let out = run(&["build", src.to_str().unwrap()]);
    assert_eq!(out.status.code(), Some(1));
    assert!(!dir.path().join("bad.cb").exists());
}

#[test]
fn run_rejects_corrupt_archive() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("junk.cb");
    fs::write(&path, b"not an archive").unwrap();
    let out = run(&["run", path.to_str().unwrap()]);
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("CALC-A001"), "got: {}", stderr(&out));
}

#[test]
fn missing_file_is_reported() {
    let out = run(&["file", "/definitely/not/here.calc"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("cannot read"), "got: {}", stderr(&out));
}

// --- Explain ---

#[test]
fn explain_known_code() {
    let out = run(&["explain", "CALC-P001"]);
    assert!(out.status.success());
    assert!(stdout(&out).contains("3 - 5"));
}

#[test]
fn explain_unknown_code() {
    let out = run(&["explain", "CALC-Z000"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("unknown diagnostic code"));
}
