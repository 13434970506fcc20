//! Reentrancy guard for the self-iterating "ralph loop" skill.
//!
//! `IDLE → RUNNING` on a validated start, `RUNNING → IDLE` on stop. The guard
//! only reports state; refusing a nested start is the caller's decision,
//! made through [`LoopGuard::admit`].

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::patterns::compile;
use crate::protocol::ToolCall;
use crate::protocol::parse::{extract_arg_value, positional_text};
use crate::state::{Flag, SessionState, StateError};

/// Usage line shown whenever a loop invocation is refused.
pub const REQUIRED_FORMAT: &str =
    r#"/ralph-loop "task description" --max-iterations 30 --completion-promise "DONE""#;

/// Skill names that start a loop. `dev-ralph-loop` is documentation only.
pub fn is_loop_start_skill(skill: &str) -> bool {
    skill.contains("ralph-loop") && !skill.contains("dev-ralph-loop")
}

/// The setup script run as a command, directly or through a shell, at the
/// start of any segment of a command line.
static LOOP_SCRIPT: LazyLock<Regex> = LazyLock::new(|| {
    compile(r"(?:^|[;&|(\n])\s*(?:(?:ba|z)?sh\s+)?\S*setup-ralph-loop\S*")
});

/// Shell commands that start a loop through its setup script.
pub fn is_loop_start_command(command: &str) -> bool {
    LOOP_SCRIPT.is_match(command)
}

/// The argument text of a loop-start invocation, if `call` is one.
pub fn loop_invocation(call: &ToolCall) -> Option<&str> {
    match call {
        ToolCall::Skill(s) if is_loop_start_skill(&s.skill) => Some(s.args.as_str()),
        ToolCall::Bash(b) => LOOP_SCRIPT.find(&b.command).map(|m| &b.command[m.end()..]),
        _ => None,
    }
}

// ── Argument validation ─────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopArgProblem {
    MissingCompletionPromise,
    MissingMaxIterations,
    InvalidMaxIterations(String),
}

impl fmt::Display for LoopArgProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoopArgProblem::MissingCompletionPromise => {
                f.write_str("Missing --completion-promise (required for loop termination)")
            }
            LoopArgProblem::MissingMaxIterations => {
                f.write_str("Missing --max-iterations (recommended: 15-30)")
            }
            LoopArgProblem::InvalidMaxIterations(raw) => {
                write!(f, "Invalid --max-iterations {raw:?} (expected a positive integer)")
            }
        }
    }
}

/// Every problem found in one loop invocation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid loop arguments: {}", .problems.iter().map(ToString::to_string).collect::<Vec<_>>().join("; "))]
pub struct LoopArgsError {
    pub problems: Vec<LoopArgProblem>,
}

/// Validated parameters of a loop start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopArgs {
    pub task: String,
    pub max_iterations: u32,
    pub completion_promise: String,
}

impl LoopArgs {
    /// Parse `"task" --max-iterations N --completion-promise P`.
    ///
    /// Both options are required; all problems are reported together.
    pub fn parse(args: &str) -> Result<Self, LoopArgsError> {
        Self::validate(
            positional_text(args),
            extract_arg_value(args, "max-iterations"),
            extract_arg_value(args, "completion-promise"),
        )
    }

    /// Validate options that arrive already separated, as on the command line.
    pub fn validate(
        task: String,
        max_iterations: Option<&str>,
        completion_promise: Option<&str>,
    ) -> Result<Self, LoopArgsError> {
        let mut problems = Vec::new();

        let completion_promise = completion_promise.map(str::trim).filter(|p| !p.is_empty());
        if completion_promise.is_none() {
            problems.push(LoopArgProblem::MissingCompletionPromise);
        }

        let max_iterations = match max_iterations {
            None => {
                problems.push(LoopArgProblem::MissingMaxIterations);
                None
            }
            Some(raw) => match raw.trim().parse::<u32>() {
                Ok(n) if n > 0 => Some(n),
                _ => {
                    problems.push(LoopArgProblem::InvalidMaxIterations(raw.to_string()));
                    None
                }
            },
        };

        match (completion_promise, max_iterations) {
            (Some(promise), Some(max)) if problems.is_empty() => Ok(Self {
                task,
                max_iterations: max,
                completion_promise: promise.to_string(),
            }),
            _ => Err(LoopArgsError { problems }),
        }
    }
}

/// Why a loop start was refused.
#[derive(Debug, thiserror::Error)]
pub enum LoopRefusal {
    #[error("a ralph loop is already active")]
    Nested,
    #[error(transparent)]
    InvalidArgs(#[from] LoopArgsError),
}

impl LoopRefusal {
    /// Explanation addressed to the invoking agent.
    pub fn deny_reason(&self) -> String {
        match self {
            LoopRefusal::Nested => "⛔ Nested Loop Blocked: Ralph loop is already active\n\n\
                 You cannot start a ralph-loop inside another ralph-loop.\n\
                 The current loop must complete first."
                .to_string(),
            LoopRefusal::InvalidArgs(err) => {
                let bullets: Vec<String> = err.problems.iter().map(|p| format!("• {p}")).collect();
                format!(
                    "⛔ Ralph Validate: Invalid ralph-loop invocation\n\n\
                     Errors:\n{}\n\n\
                     REQUIRED FORMAT:\n{REQUIRED_FORMAT}\n\n\
                     The --completion-promise flag is MANDATORY. Without it, ralph loops infinitely.",
                    bullets.join("\n")
                )
            }
        }
    }
}

// ── Loop state ──────────────────────────────────────────────────────────

/// Parameters of the running loop, stored as the flag's text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RalphLoopState {
    pub task: String,
    pub max_iterations: u32,
    pub completion_promise: String,
    #[serde(default)]
    pub iteration: u32,
    pub started_at: String,
}

impl RalphLoopState {
    /// Whether the iteration that is now ending used up the budget.
    pub fn budget_exhausted(&self) -> bool {
        self.iteration.saturating_add(1) >= self.max_iterations
    }

    /// Text handed back to the agent when it tries to stop too early.
    pub fn continuation_reason(&self) -> String {
        let task = if self.task.is_empty() {
            "the task"
        } else {
            &self.task
        };
        format!(
            "[RALPH LOOP ENFORCEMENT]\n\n\
             The completion promise was not output. The loop must continue \
             (iteration {next} of {max}).\n\n\
             Task: {task}\n\
             Expected promise: <promise>{promise}</promise>\n\n\
             Continue working on the task. Output the promise only when the task is TRULY complete.\n\n\
             REMINDER: The promise is a claim that the task is done. Only output it when:\n\
             - For implementation: Tests pass and implementation is complete\n\
             - For debugging: Bug is fixed and regression test passes\n\
             - For any task: The work is verifiably complete\n\n\
             Do not output the promise to \"move on\" or \"try something else\".",
            next = self.iteration + 2,
            max = self.max_iterations,
            promise = self.completion_promise,
        )
    }
}

pub struct LoopGuard<'a> {
    state: &'a dyn SessionState,
}

impl<'a> LoopGuard<'a> {
    pub fn new(state: &'a dyn SessionState) -> Self {
        Self { state }
    }

    pub fn is_active(&self) -> bool {
        self.state.has(Flag::RalphLoop)
    }

    /// Parameters of the running loop. `None` when idle, or when the flag
    /// was set without readable parameters.
    pub fn current(&self) -> Option<RalphLoopState> {
        let text = self.state.read_text(Flag::RalphLoop.name())?;
        serde_json::from_str(&text).ok()
    }

    /// Decide whether a loop may start with `args`.
    ///
    /// A running loop refuses regardless of how valid the arguments are.
    pub fn admit(&self, args: &str) -> Result<LoopArgs, LoopRefusal> {
        self.ensure_idle()?;
        Ok(LoopArgs::parse(args)?)
    }

    pub fn ensure_idle(&self) -> Result<(), LoopRefusal> {
        if self.is_active() {
            return Err(LoopRefusal::Nested);
        }
        Ok(())
    }

    pub fn start(&self, args: LoopArgs) -> Result<RalphLoopState, StateError> {
        let loop_state = RalphLoopState {
            task: args.task,
            max_iterations: args.max_iterations,
            completion_promise: args.completion_promise,
            iteration: 0,
            started_at: chrono::Local::now().to_rfc3339(),
        };
        self.save(&loop_state)?;
        Ok(loop_state)
    }

    pub fn stop(&self) -> Result<(), StateError> {
        self.state.clear(Flag::RalphLoop)
    }

    /// Count one finished iteration and persist it.
    pub fn record_iteration(&self, current: &RalphLoopState) -> Result<RalphLoopState, StateError> {
        let next = RalphLoopState {
            iteration: current.iteration + 1,
            ..current.clone()
        };
        self.save(&next)?;
        Ok(next)
    }

    fn save(&self, loop_state: &RalphLoopState) -> Result<(), StateError> {
        let json = serde_json::to_string(loop_state)?;
        self.state.write_text(Flag::RalphLoop.name(), &json)
    }
}
