use std::io::Write;

use anyhow::{Context, Result, bail};

use crate::ralph::{LoopArgs, LoopGuard, LoopRefusal};
use crate::state::SessionState;

/// Start a loop by hand, refused exactly as the hook would refuse it.
pub fn start(
    state: &dyn SessionState,
    task: String,
    max_iterations: Option<&str>,
    completion_promise: Option<&str>,
    writer: &mut impl Write,
) -> Result<()> {
    let guard = LoopGuard::new(state);
    let admitted = guard.ensure_idle().and_then(|()| {
        LoopArgs::validate(task, max_iterations, completion_promise).map_err(LoopRefusal::from)
    });
    let args = match admitted {
        Ok(args) => args,
        Err(refusal) => bail!("{}", refusal.deny_reason()),
    };
    let started = guard.start(args).context("failed to record loop state")?;
    writeln!(
        writer,
        "Ralph loop started: up to {} iterations, ends on <promise>{}</promise>",
        started.max_iterations, started.completion_promise
    )?;
    Ok(())
}

pub fn stop(state: &dyn SessionState, writer: &mut impl Write) -> Result<()> {
    let guard = LoopGuard::new(state);
    if !guard.is_active() {
        writeln!(writer, "No ralph loop is active.")?;
        return Ok(());
    }
    guard.stop().context("failed to clear loop state")?;
    writeln!(writer, "Ralph loop stopped.")?;
    Ok(())
}

pub fn status(state: &dyn SessionState, writer: &mut impl Write) -> Result<()> {
    let guard = LoopGuard::new(state);
    if !guard.is_active() {
        writeln!(writer, "No ralph loop is active.")?;
        return Ok(());
    }
    match guard.current() {
        Some(current) => {
            writeln!(writer, "Ralph loop active")?;
            writeln!(writer, "  task:      {}", current.task)?;
            writeln!(
                writer,
                "  iteration: {} of {}",
                current.iteration + 1,
                current.max_iterations
            )?;
            writeln!(writer, "  promise:   <promise>{}</promise>", current.completion_promise)?;
            writeln!(writer, "  started:   {}", current.started_at)?;
        }
        None => writeln!(writer, "Ralph loop active (parameters unreadable)")?,
    }
    Ok(())
}
