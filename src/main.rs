mod cli;

use std::io::{self, Read};
use std::path::Path;

use anyhow::Result;
use clap::Parser;
use sisyphus::commands::{self, Workspace};
use sisyphus::protocol::HookEvent;
use tracing_subscriber::EnvFilter;

use cli::{BoulderAction, Cli, Command, GateAction, LoopAction, WorkflowAction};

/// Environment variable holding the log filter directives.
const LOG_ENV: &str = "SISYPHUS_LOG";

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    match cli.command {
        Command::Hook { event } => {
            run_hook(event, cli.state_dir.as_deref());
            Ok(())
        }
        command => run_command(command, cli.state_dir.as_deref()),
    }
}

/// Hooks must never fail the host's tool call, so nothing here escapes.
fn run_hook(event: HookEvent, state_dir: Option<&Path>) {
    let mut input = String::new();
    if let Err(e) = io::stdin().read_to_string(&mut input) {
        tracing::warn!(error = %e, "failed to read hook payload");
        input.clear();
    }
    if let Err(e) = commands::hook::hook(event, state_dir, &input, &mut io::stdout().lock()) {
        tracing::warn!(error = ?e, "hook failed");
    }
}

fn run_command(command: Command, state_dir: Option<&Path>) -> Result<()> {
    let workspace = Workspace::discover()?;
    let state = workspace.session_state(state_dir);
    let mut out = io::stdout().lock();
    match command {
        Command::Hook { event } => run_hook(event, state_dir),
        Command::Gate { action } => match action {
            GateAction::Open => commands::gate::open(&state, &mut out)?,
            GateAction::Close => commands::gate::close(&state, &mut out)?,
            GateAction::Status => commands::gate::status(&state, &mut out)?,
        },
        Command::Workflow { action } => match action {
            WorkflowAction::Activate { workflow } => {
                commands::workflow::activate(&state, workflow, &mut out)?;
            }
            WorkflowAction::Deactivate { workflow } => {
                commands::workflow::deactivate(&state, workflow, &mut out)?;
            }
            WorkflowAction::List => commands::workflow::list(&state, &mut out)?,
        },
        Command::Loop { action } => match action {
            LoopAction::Start {
                task,
                max_iterations,
                completion_promise,
            } => commands::ralph::start(
                &state,
                task,
                max_iterations.as_deref(),
                completion_promise.as_deref(),
                &mut out,
            )?,
            LoopAction::Stop => commands::ralph::stop(&state, &mut out)?,
            LoopAction::Status => commands::ralph::status(&state, &mut out)?,
        },
        Command::Boulder { action } => match action {
            BoulderAction::Status => commands::boulder::status(
                &workspace.project_root,
                workspace.config.empty_plan,
                &mut out,
            )?,
            BoulderAction::Clear => commands::boulder::clear(&workspace.project_root, &mut out)?,
        },
        Command::Status => commands::status::status(&state, state.dir(), &mut out)?,
        Command::Cleanup => commands::cleanup::cleanup(&state, &mut out)?,
    }
    Ok(())
}

/// Log to stderr only; stdout carries the hook protocol.
fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(false)
        .with_target(false)
        .init();
}
