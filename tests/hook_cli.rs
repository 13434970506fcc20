#![allow(clippy::expect_used)]

use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};

use serde_json::Value;
use tempfile::TempDir;

/// Isolated home, project and state directories for one scenario.
struct Env {
    home: TempDir,
    project: TempDir,
    state: TempDir,
}

impl Env {
    fn new() -> Self {
        let env = Self {
            home: TempDir::new().expect("home dir"),
            project: TempDir::new().expect("project dir"),
            state: TempDir::new().expect("state dir"),
        };
        fs::create_dir_all(env.project.path().join(".claude")).expect("create .claude");
        env
    }

    fn project(&self) -> &Path {
        self.project.path()
    }

    fn run(&self, args: &[&str], stdin: &str) -> Output {
        let mut child = Command::new(env!("CARGO_BIN_EXE_sisyphus"))
            .args(args)
            .current_dir(self.project.path())
            .env("HOME", self.home.path())
            .env("SISYPHUS_STATE_DIR", self.state.path())
            .env("TTY", "/dev/pts/hook-cli-test")
            .env_remove("SISYPHUS_LOG")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .expect("spawn sisyphus");
        child
            .stdin
            .take()
            .expect("stdin")
            .write_all(stdin.as_bytes())
            .expect("write stdin");
        child.wait_with_output().expect("wait for sisyphus")
    }

    fn hook(&self, event: &str, payload: &Value) -> Option<Value> {
        let output = self.run(&["hook", event], &payload.to_string());
        assert!(output.status.success(), "hook exited with {}", output.status);
        let stdout = String::from_utf8(output.stdout).expect("utf-8 stdout");
        if stdout.trim().is_empty() {
            return None;
        }
        assert_eq!(stdout.lines().count(), 1, "one JSON object per event");
        Some(serde_json::from_str(&stdout).expect("stdout is JSON"))
    }

    fn stdout(&self, args: &[&str]) -> String {
        let output = self.run(args, "");
        assert!(
            output.status.success(),
            "{args:?} failed: {}",
            String::from_utf8_lossy(&output.stderr)
        );
        String::from_utf8(output.stdout).expect("utf-8 stdout")
    }
}

fn skill(name: &str, args: &str) -> Value {
    serde_json::json!({"tool_name": "Skill", "tool_input": {"skill": name, "args": args}})
}

fn specific(output: &Value) -> &Value {
    &output["hookSpecificOutput"]
}

#[test]
fn dev_skill_activates_workflow_and_dev_mode() {
    let env = Env::new();
    let out = env.hook("pre-tool-use", &skill("dev", "")).expect("output");
    let notification = specific(&out)["notification"].as_str().expect("notification");
    assert!(notification.contains("DEV"));

    let list = env.stdout(&["workflow", "list"]);
    assert!(list.contains("* dev\n"));
    assert!(list.contains("dev_mode is on"));
}

#[test]
fn loop_without_completion_promise_is_denied() {
    let env = Env::new();
    let out = env
        .hook("pre-tool-use", &skill("ralph-loop", "--max-iterations 30"))
        .expect("output");
    assert_eq!(specific(&out)["permissionDecision"], "deny");
    let reason = specific(&out)["permissionDecisionReason"].as_str().expect("reason");
    assert!(reason.contains("--completion-promise"));
    assert!(env.stdout(&["loop", "status"]).contains("No ralph loop is active."));
}

#[test]
fn nested_loop_is_denied() {
    let env = Env::new();
    env.stdout(&[
        "loop",
        "start",
        "port the lexer",
        "--max-iterations",
        "10",
        "--completion-promise",
        "LEXED",
    ]);

    let valid = r#""another task" --max-iterations 5 --completion-promise DONE"#;
    let out = env.hook("pre-tool-use", &skill("ralph-loop", valid)).expect("output");
    assert_eq!(specific(&out)["permissionDecision"], "deny");
    let reason = specific(&out)["permissionDecisionReason"].as_str().expect("reason");
    assert!(reason.contains("Nested Loop Blocked"));
}

#[test]
fn loop_start_from_cli_rejects_missing_options() {
    let env = Env::new();
    let output = env.run(&["loop", "start", "task", "--max-iterations", "5"], "");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Missing --completion-promise"));
}

#[test]
fn malformed_payload_is_a_silent_success() {
    let env = Env::new();
    for input in ["{not json", "", "[]"] {
        let output = env.run(&["hook", "pre-tool-use"], input);
        assert!(output.status.success());
        assert!(output.stdout.is_empty(), "{input:?} produced output");
    }
}

#[test]
fn idle_session_emits_nothing() {
    let env = Env::new();
    let bash = serde_json::json!({"tool_name": "Bash", "tool_input": {"command": "ls"}});
    assert_eq!(env.hook("pre-tool-use", &bash), None);
    assert_eq!(env.hook("stop", &serde_json::json!({})), None);
}

#[test]
fn plan_progress_is_tracked_from_session_start() {
    let env = Env::new();
    fs::write(
        env.project().join(".claude/PLAN.md"),
        "# Plan: Parser\n- [ ] a\n- [ ] b\n- [ ] c\n- [x] d\n- [x] e\n",
    )
    .expect("write plan");

    let out = env
        .hook("session-start", &serde_json::json!({"sessionId": "abc"}))
        .expect("output");
    let context = specific(&out)["additionalContext"].as_str().expect("context");
    assert!(context.contains("Progress: 2/5 tasks complete"));

    let status = env.stdout(&["boulder", "status"]);
    assert!(status.contains("Plan:     parser"));
    assert!(status.contains("Progress: 2/5 tasks complete\n"));
}

#[test]
fn session_end_clears_everything() {
    let env = Env::new();
    env.hook("pre-tool-use", &skill("ds", ""));
    env.stdout(&["gate", "open"]);

    let out = env.hook("session-end", &serde_json::json!({})).expect("output");
    assert_eq!(out, serde_json::json!({}));
    assert!(env.stdout(&["status"]).contains("No flags set."));
}
