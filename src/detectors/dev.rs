//! Dev workflow checks: skipped tests reported as passing, and grepping
//! source files in place of running them.

use std::sync::LazyLock;

use regex::Regex;

use super::{Finding, Report, truncate};
use crate::patterns::{compile, compile_ci};

pub const SKIP_TITLE: &str = "SKIP ≠ PASS: skipped tests have not verified anything";
pub const GREP_TITLE: &str =
    "GREPPING SOURCE IS NOT TESTING: run the code, capture a log, grep the log";

static SKIP_AND_PASS: LazyLock<Regex> = LazyLock::new(|| compile_ci(r"SKIP.*PASS|PASS.*SKIP"));
static SKIP_COUNT: LazyLock<Regex> = LazyLock::new(|| compile_ci(r"\d+\s*(?:SKIP|skipped)"));
static PASS_CLAIM: LazyLock<Regex> = LazyLock::new(|| compile_ci(r"all.*pass|tests.*pass|passing"));
static SKIP_WORD: LazyLock<Regex> = LazyLock::new(|| compile_ci(r"skip"));
static EXIT_ZERO_SKIP: LazyLock<Regex> =
    LazyLock::new(|| compile_ci(r"exit\s+0.*skip|skip.*exit\s+0"));

/// Skipped tests counted, claimed or exited on as success.
pub fn skip_as_pass(text: &str) -> Vec<Finding> {
    let mut findings = Vec::new();
    if SKIP_AND_PASS.is_match(text) && SKIP_COUNT.is_match(text) {
        findings.push(Finding::new(
            "SKIP being counted",
            "skipped tests are not passing tests; fix the skip condition and run them",
        ));
    }
    if PASS_CLAIM.is_match(text) && SKIP_WORD.is_match(text) {
        findings.push(Finding::new(
            "Claiming 'pass' with skipped tests",
            "only claim PASS once every test actually executed",
        ));
    }
    if EXIT_ZERO_SKIP.is_match(text) {
        findings.push(Finding::new(
            "Exiting success with skipped tests",
            "make skipped tests fail the run",
        ));
    }
    findings
}

static GREP_COMMAND: LazyLock<Regex> = LazyLock::new(|| compile(r"grep[^|&\n]*"));
static SOURCE_FILE: LazyLock<Regex> =
    LazyLock::new(|| compile_ci(r"\.(?:c|h|cpp|hpp|py|js|ts|go|rs|java|rb|sh|bash)\b"));
static LOG_TARGET: LazyLock<Regex> =
    LazyLock::new(|| compile_ci(r"/tmp/|\.log\b|\.out\b|\.err\b|stderr|stdout|2>&1"));
static IF_GREP: LazyLock<Regex> = LazyLock::new(|| compile(r"if\s+grep"));
static GREP_THEN_ECHO: LazyLock<Regex> =
    LazyLock::new(|| compile_ci(r"grep.*&&.*echo.*(?:PASS|FAIL|CHECK)"));
static VERDICT: LazyLock<Regex> = LazyLock::new(|| compile_ci(r"PASS|FAIL|CHECK|SUCCESS"));
static VERIFIED_CLAIM: LazyLock<Regex> =
    LazyLock::new(|| compile_ci(r"code verified|implementation verified|source verified"));
static EXISTS_CLAIM: LazyLock<Regex> = LazyLock::new(|| {
    compile_ci(
        r"(?:code|function|implementation|change|fix)\s+(?:exists|is\s+there|is\s+present|looks\s+correct|appears\s+correct)",
    )
});

/// A grep whose target is a source file rather than captured output.
fn greps_source(grep: &str) -> bool {
    !LOG_TARGET.is_match(grep) && SOURCE_FILE.is_match(grep)
}

/// Source files grepped as a verification step.
pub fn grep_source_as_test(text: &str) -> Vec<Finding> {
    let mut findings = Vec::new();
    let source_greps: Vec<&str> = GREP_COMMAND
        .find_iter(text)
        .map(|m| m.as_str())
        .filter(|g| greps_source(g))
        .collect();

    if let Some(first) = source_greps.first() {
        let used_as_check =
            (IF_GREP.is_match(text) && VERDICT.is_match(text)) || GREP_THEN_ECHO.is_match(text);
        if used_as_check {
            findings.push(Finding::new(
                format!("Grepping source file as test: {}", truncate(first.trim(), 60)),
                "run the program and grep its log output instead",
            ));
        }
        let lower = text.to_lowercase();
        if text.contains("#!/bin/bash") && (lower.contains("test") || lower.contains("check")) {
            findings.push(Finding::new(
                "Test script greps source files",
                "check runtime logs, not file contents",
            ));
        }
    }
    if VERIFIED_CLAIM.is_match(text) {
        findings.push(Finding::new(
            "'Code verified' by reading source",
            "verification means observing runtime behavior",
        ));
    }
    if EXISTS_CLAIM.is_match(text) {
        findings.push(Finding::new(
            "'Code exists' is not verification",
            "test what the code does when it runs",
        ));
    }
    findings
}

/// Checks for a shell command.
pub fn check_command(command: &str) -> Vec<Report> {
    Report::new(SKIP_TITLE, skip_as_pass(command))
        .into_iter()
        .chain(Report::new(GREP_TITLE, grep_source_as_test(command)))
        .collect()
}

/// Checks for a file write. Only test files are inspected.
pub fn check_write(file_path: &str, content: &str) -> Vec<Report> {
    if !file_path.to_lowercase().contains("test") {
        return Vec::new();
    }
    check_command(content)
}
