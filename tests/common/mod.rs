// tests/common/mod.rs
// Shared test utilities for integration tests
#![allow(dead_code)]

use rpnbatch::{Opts, RunSummary, evaluate_lines, lines_from};
use std::io::Write;
use std::process::{Command, Stdio};
use tempfile::TempDir;

pub fn opts(workers: usize, batch: usize) -> Opts {
    Opts {
        worker_threads: workers,
        batch_size: batch,
        ..Opts::default()
    }
}

/// Run the library pipeline over in-memory lines; returns (output lines, summary).
pub fn run_lines(opts: &Opts, lines: &[&str]) -> (Vec<String>, RunSummary) {
    let mut out = Vec::new();
    let summary = evaluate_lines(opts, lines_from(lines.iter().copied()), &mut out, None)
        .expect("pipeline run failed");
    let text = String::from_utf8(out).expect("output is utf-8");
    (text.lines().map(str::to_string).collect(), summary)
}

/// Reference output: one worker, one batch holding the whole input.
pub fn reference_run(lines: &[&str]) -> Vec<String> {
    run_lines(&opts(1, lines.len() + 1), lines).0
}

/// Write `content` to `input.txt` inside a fresh temp dir (optionally with a settings file).
pub fn input_dir(content: &str, settings: Option<&str>) -> TempDir {
    let dir = TempDir::new().expect("Failed to create temp dir");
    std::fs::File::create(dir.path().join("input.txt"))
        .and_then(|mut f| f.write_all(content.as_bytes()))
        .expect("Failed to write input file");
    if let Some(toml) = settings {
        std::fs::write(dir.path().join(".rpnbatch.toml"), toml).expect("Failed to write settings");
    }
    dir
}

/// Run the built binary; returns (stdout, stderr, exit code).
pub fn run_rpnbatch(args: &[&str]) -> (String, String, i32) {
    let output = Command::new(env!("CARGO_BIN_EXE_rpnbatch"))
        .args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .expect("Failed to execute rpnbatch");
    (
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
        output.status.code().unwrap_or(-1),
    )
}
