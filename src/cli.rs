use std::path::PathBuf;

use clap::{Parser, Subcommand};
use sisyphus::protocol::HookEvent;
use sisyphus::state::STATE_DIR_ENV;
use sisyphus::workflow::Workflow;

#[derive(Parser, Debug)]
#[command(
    name = "sisyphus",
    about = "Session-scoped workflow gates, loop guards and plan tracking for Claude Code hooks",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Root directory for per-session state.
    #[arg(long, global = true, value_name = "PATH", env = STATE_DIR_ENV)]
    pub state_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Handle one hook event: JSON payload on stdin, at most one JSON object on stdout.
    Hook {
        #[arg(value_enum)]
        event: HookEvent,
    },

    /// Control the single-use skill gate for orchestration skills.
    Gate {
        #[command(subcommand)]
        action: GateAction,
    },

    /// Turn workflows on or off for this session.
    Workflow {
        #[command(subcommand)]
        action: WorkflowAction,
    },

    /// Start, stop or inspect the ralph loop.
    Loop {
        #[command(subcommand)]
        action: LoopAction,
    },

    /// Inspect or clear the project's active plan.
    Boulder {
        #[command(subcommand)]
        action: BoulderAction,
    },

    /// Show the session key, the state directory and every flag set.
    Status,

    /// Remove all state for this session.
    Cleanup,
}

#[derive(Subcommand, Debug)]
pub enum GateAction {
    /// Allow the next orchestration skill invocation.
    Open,
    Close,
    Status,
}

#[derive(Subcommand, Debug)]
pub enum WorkflowAction {
    Activate {
        #[arg(value_enum)]
        workflow: Workflow,
    },
    /// The explicit exit from a workflow.
    Deactivate {
        #[arg(value_enum)]
        workflow: Workflow,
    },
    List,
}

#[derive(Subcommand, Debug)]
pub enum LoopAction {
    Start {
        /// What the loop works on.
        task: String,

        /// Upper bound on iterations (required).
        #[arg(long, value_name = "N")]
        max_iterations: Option<String>,

        /// Phrase that ends the loop when output as <promise>PHRASE</promise> (required).
        #[arg(long, value_name = "PHRASE")]
        completion_promise: Option<String>,
    },
    Stop,
    Status,
}

#[derive(Subcommand, Debug)]
pub enum BoulderAction {
    Status,
    /// Delete the boulder file.
    Clear,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn hook_event_names() {
        let cli = Cli::try_parse_from(["sisyphus", "hook", "pre-tool-use"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Hook {
                event: HookEvent::PreToolUse
            }
        ));
        assert!(Cli::try_parse_from(["sisyphus", "hook", "bogus"]).is_err());
    }

    #[test]
    fn loop_start_options_are_validated_later() {
        let cli = Cli::try_parse_from(["sisyphus", "loop", "start", "fix it", "--max-iterations", "5"])
            .unwrap();
        let Command::Loop {
            action:
                LoopAction::Start {
                    max_iterations,
                    completion_promise,
                    ..
                },
        } = cli.command
        else {
            panic!("expected loop start");
        };
        assert_eq!(max_iterations.as_deref(), Some("5"));
        assert_eq!(completion_promise, None);
    }

    #[test]
    fn global_state_dir() {
        let cli = Cli::try_parse_from(["sisyphus", "gate", "open", "--state-dir", "/tmp/s"]).unwrap();
        assert_eq!(cli.state_dir, Some(PathBuf::from("/tmp/s")));
    }
}
