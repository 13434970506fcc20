//! PreToolUse: the dispatcher.
//!
//! Checks run in a fixed order and the first deny wins: loop guard, skill
//! gate, sandbox. Content detectors only ever add a warning. Nothing is
//! evaluated at all unless a workflow is active or the call is one of the
//! invocations that are always checked.

use tracing::{debug, warn};

use super::HookContext;
use crate::detectors::{self, Report, dev, ds};
use crate::gate::{self, SkillGate};
use crate::protocol::{HookEvent, HookOutput, HookPayload, HookSpecificOutput, ToolCall};
use crate::ralph::{self, LoopArgs, LoopGuard};
use crate::sandbox;
use crate::state::Flag;
use crate::workflow::{self, Workflow};

const EVENT: HookEvent = HookEvent::PreToolUse;

pub(super) fn handle(payload: &HookPayload, ctx: &HookContext) -> Option<HookOutput> {
    let call = ToolCall::from_payload(payload);
    let loop_args = ralph::loop_invocation(&call);
    let skill = match &call {
        ToolCall::Skill(s) => Some(s.skill.as_str()),
        _ => None,
    };
    let privileged = skill.is_some_and(gate::is_privileged_skill);
    let activates = skill.and_then(Workflow::for_skill);

    let always_check = loop_args.is_some() || privileged || activates.is_some();
    if !always_check && !ctx.state.has_any(&Flag::WORKFLOW) {
        return None;
    }

    // ── Denials ─────────────────────────────────────────────────────────

    let loop_start = match loop_args {
        Some(args) => match LoopGuard::new(ctx.state).admit(args) {
            Ok(parsed) => Some(parsed),
            Err(refusal) => {
                debug!(%refusal, "loop start refused");
                return Some(HookOutput::deny(EVENT, refusal.deny_reason()));
            }
        },
        None => None,
    };

    if privileged
        && let Some(skill) = skill
        && !SkillGate::new(ctx.state).consume()
    {
        debug!(skill, "skill gate closed");
        return Some(HookOutput::deny(EVENT, gate_closed_reason(skill)));
    }

    if ctx.state.has(Flag::DevMode)
        && ctx.config().sandbox.enabled
        && let Some(violation) = sandbox::check(&call, ctx.home.as_deref(), &ctx.cwd)
    {
        debug!(%violation, "sandbox violation");
        return Some(HookOutput::block(violation.to_string()));
    }

    // ── Allowed: apply transitions, collect warnings ────────────────────

    let mut output = HookSpecificOutput::new(EVENT);
    if let Some(args) = loop_start {
        output.notification = start_loop(ctx, args);
    }
    if let Some(workflow) = activates {
        match workflow::activate(ctx.state, workflow) {
            Ok(()) => output.notification = Some(workflow.activation_notice()),
            Err(e) => warn!(%workflow, error = %e, "failed to activate workflow"),
        }
    }
    output.message = detectors::combine(&content_reports(&call, ctx));

    (!output.is_blank()).then(|| HookOutput::specific(output))
}

fn gate_closed_reason(skill: &str) -> String {
    format!(
        "⛔ Skill Gate Closed: Cannot invoke /{skill}\n\n\
         Orchestration skills (dev-*) can only be invoked from main chat.\n\
         Task agents must NOT invoke these skills.\n\n\
         If you ARE main chat and see this error, open the skill gate first \
         (`sisyphus gate open`).\n\n\
         Task agents should do work directly, not invoke orchestration skills."
    )
}

fn start_loop(ctx: &HookContext, args: LoopArgs) -> Option<String> {
    match LoopGuard::new(ctx.state).start(args) {
        Ok(started) => Some(format!(
            "↻ Ralph loop started: up to {} iterations, ends on <promise>{}</promise>",
            started.max_iterations, started.completion_promise
        )),
        Err(e) => {
            warn!(error = %e, "failed to record loop start");
            None
        }
    }
}

/// Advisory findings for whichever workflows are active.
fn content_reports(call: &ToolCall, ctx: &HookContext) -> Vec<Report> {
    let mut reports = Vec::new();
    if workflow::is_active(ctx.state, Workflow::Dev) {
        match call {
            ToolCall::Bash(b) => reports.extend(dev::check_command(&b.command)),
            ToolCall::Write(w) => reports.extend(dev::check_write(&w.file_path, &w.content)),
            _ => {}
        }
    }
    if workflow::is_active(ctx.state, Workflow::Ds) {
        match call {
            ToolCall::Bash(b) => reports.extend(ds::check_content(&b.command, None)),
            ToolCall::Write(w) => {
                reports.extend(ds::check_content(&w.content, Some(&w.file_path)));
            }
            _ => {}
        }
    }
    reports
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::path::PathBuf;

    use serde_json::json;

    use super::*;
    use crate::config::Config;
    use crate::hooks::test_support::payload;
    use crate::state::{MemorySessionState, SessionState};

    fn context(state: &MemorySessionState, config: Config) -> HookContext<'_> {
        HookContext::new(
            state,
            PathBuf::from("/home/u/project"),
            Some(PathBuf::from("/home/u")),
        )
        .with_config(config)
    }

    fn run(state: &MemorySessionState, value: serde_json::Value) -> Option<HookOutput> {
        handle(&payload(value), &context(state, Config::default()))
    }

    fn specific(output: Option<HookOutput>) -> HookSpecificOutput {
        match output {
            Some(HookOutput::Specific {
                hook_specific_output,
            }) => hook_specific_output,
            other => panic!("expected hookSpecificOutput, got {other:?}"),
        }
    }

    fn skill(name: &str, args: &str) -> serde_json::Value {
        json!({"tool_name": "Skill", "tool_input": {"skill": name, "args": args}})
    }

    fn bash(command: &str) -> serde_json::Value {
        json!({"tool_name": "Bash", "tool_input": {"command": command}})
    }

    #[test]
    fn nothing_active_is_silent() {
        let state = MemorySessionState::default();
        assert_eq!(run(&state, bash("grep -q foo main.py && echo PASS")), None);
        assert_eq!(run(&state, skill("commit", "")), None);
        assert!(state.is_empty());
    }

    #[test]
    fn dev_skill_activates_workflow() {
        let state = MemorySessionState::default();
        let out = specific(run(&state, skill("dev", "")));
        assert_eq!(out.notification.as_deref(), Some("✓ DEV workflow activated"));
        assert!(state.has(Flag::Workflow(Workflow::Dev)));
        assert!(state.has(Flag::DevMode));
    }

    #[test]
    fn activation_output_shape() {
        let state = MemorySessionState::default();
        let out = run(&state, skill("writing", "")).unwrap();
        insta::assert_snapshot!(out.to_json().unwrap(), @r#"{"hookSpecificOutput":{"hookEventName":"PreToolUse","notification":"✓ WRITING workflow activated"}}"#);
    }

    #[test]
    fn loop_without_promise_is_denied() {
        let state = MemorySessionState::default();
        let out = run(&state, skill("ralph-loop", "--max-iterations 30")).unwrap();
        assert!(out.is_denial());
        let reason = specific(Some(out)).permission_decision_reason.unwrap();
        assert!(reason.contains("Missing --completion-promise"));
        assert!(!reason.contains("Missing --max-iterations"));
        assert!(!state.has(Flag::RalphLoop));
    }

    #[test]
    fn loop_without_any_bound_reports_both() {
        let state = MemorySessionState::default();
        let out = specific(run(&state, skill("ralph-loop", "\"fix it\"")));
        let reason = out.permission_decision_reason.unwrap();
        assert!(reason.contains("Missing --completion-promise"));
        assert!(reason.contains("Missing --max-iterations"));
    }

    #[test]
    fn valid_loop_starts() {
        let state = MemorySessionState::default();
        let args = r#""fix the parser" --max-iterations 5 --completion-promise DONE"#;
        let out = specific(run(&state, skill("ralph-loop", args)));
        assert!(out.permission_decision.is_none());
        assert!(out.notification.unwrap().contains("<promise>DONE</promise>"));
        let running = LoopGuard::new(&state).current().unwrap();
        assert_eq!(running.task, "fix the parser");
        assert_eq!(running.max_iterations, 5);
    }

    #[test]
    fn nested_loop_is_denied_even_with_valid_args() {
        let state = MemorySessionState::default();
        let args = r#""a" --max-iterations 5 --completion-promise DONE"#;
        run(&state, skill("ralph-loop", args));
        let out = specific(run(&state, skill("ralph-loop", args)));
        assert!(out.permission_decision_reason.unwrap().contains("Nested Loop Blocked"));
    }

    #[test]
    fn loop_started_from_setup_script() {
        let state = MemorySessionState::default();
        let cmd = "~/.claude/scripts/setup-ralph-loop.sh \"t\" --max-iterations 3";
        let out = run(&state, bash(cmd)).unwrap();
        assert!(out.is_denial());
    }

    #[test]
    fn reading_the_setup_script_is_not_a_loop_start() {
        let state = MemorySessionState::default();
        assert_eq!(run(&state, bash("cat ~/.claude/scripts/setup-ralph-loop.sh")), None);
    }

    #[test]
    fn null_args_still_pass_through_every_check() {
        let state = MemorySessionState::default();
        let closed_gate = json!({
            "tool_name": "Skill",
            "tool_input": {"skill": "dev-implement", "args": null}
        });
        assert!(run(&state, closed_gate).unwrap().is_denial());

        let args = r#""a" --max-iterations 5 --completion-promise DONE"#;
        run(&state, skill("ralph-loop", args));
        let nested = json!({"tool_name": "Skill", "tool_input": {"skill": "ralph-loop", "args": null}});
        let out = specific(run(&state, nested));
        assert!(out.permission_decision_reason.unwrap().contains("Nested Loop Blocked"));

        state.set(Flag::DevMode).unwrap();
        let write = json!({
            "tool_name": "Write",
            "tool_input": {"file_path": "/etc/passwd", "content": null}
        });
        assert!(run(&state, write).unwrap().is_denial());
    }

    #[test]
    fn privileged_skill_needs_open_gate() {
        let state = MemorySessionState::default();
        let out = run(&state, skill("dev-implement", "")).unwrap();
        assert!(out.is_denial());
        // A denied call activates nothing.
        assert!(!state.has(Flag::DevMode));

        SkillGate::new(&state).open().unwrap();
        let out = specific(run(&state, skill("dev-implement", "")));
        assert!(out.permission_decision.is_none());
        assert!(!SkillGate::new(&state).is_open());

        // Single use: the next invocation is refused again.
        assert!(run(&state, skill("dev-implement", "")).unwrap().is_denial());
    }

    #[test]
    fn sandbox_blocks_in_dev_mode() {
        let state = MemorySessionState::default();
        state.set(Flag::DevMode).unwrap();
        let out = run(&state, bash("sudo rm -rf build")).unwrap();
        insta::assert_snapshot!(out.to_json().unwrap(), @r#"{"decision":"block","reason":"Blocked: dangerous command pattern (sudo rm)"}"#);

        let write = json!({
            "tool_name": "Write",
            "tool_input": {"file_path": "~/.ssh/config", "content": "Host *"}
        });
        assert!(run(&state, write).unwrap().is_denial());
    }

    #[test]
    fn sandbox_can_be_disabled() {
        let state = MemorySessionState::default();
        state.set(Flag::DevMode).unwrap();
        let mut config = Config::default();
        config.sandbox.enabled = false;
        let ctx = context(&state, config);
        assert_eq!(handle(&payload(bash("sudo rm -rf build")), &ctx), None);
    }

    #[test]
    fn dev_warnings_are_advisory() {
        let state = MemorySessionState::default();
        workflow::activate(&state, Workflow::Dev).unwrap();
        let out = specific(run(&state, bash(r#"grep -q "init" main.c && echo PASS"#)));
        assert!(out.permission_decision.is_none());
        assert!(out.message.unwrap().contains(dev::GREP_TITLE));
    }

    #[test]
    fn warnings_from_two_workflows_share_one_message() {
        let state = MemorySessionState::default();
        workflow::activate(&state, Workflow::Dev).unwrap();
        workflow::activate(&state, Workflow::Ds).unwrap();
        let write = json!({
            "tool_name": "Write",
            "tool_input": {
                "file_path": "tests/test_model.py",
                "content": "x = np.random.rand(5)\nassert x.any() or print('3 skipped, all pass')"
            }
        });
        let message = specific(run(&state, write)).message.unwrap();
        assert!(message.contains(dev::SKIP_TITLE));
        assert!(message.contains(ds::TITLE));
    }
}
