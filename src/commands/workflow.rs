use std::io::Write;

use anyhow::{Context, Result};

use crate::state::{Flag, SessionState};
use crate::workflow::{self, Workflow};

pub fn activate(state: &dyn SessionState, workflow: Workflow, writer: &mut impl Write) -> Result<()> {
    workflow::activate(state, workflow)
        .with_context(|| format!("failed to activate {workflow}"))?;
    writeln!(writer, "{}", workflow.activation_notice())?;
    Ok(())
}

pub fn deactivate(
    state: &dyn SessionState,
    workflow: Workflow,
    writer: &mut impl Write,
) -> Result<()> {
    workflow::deactivate(state, workflow)
        .with_context(|| format!("failed to deactivate {workflow}"))?;
    writeln!(writer, "{} workflow deactivated", workflow.as_str().to_uppercase())?;
    Ok(())
}

pub fn list(state: &dyn SessionState, writer: &mut impl Write) -> Result<()> {
    for workflow in Workflow::ALL {
        let marker = if workflow::is_active(state, workflow) {
            "*"
        } else {
            " "
        };
        writeln!(writer, "{marker} {workflow}")?;
    }
    if state.has(Flag::DevMode) {
        writeln!(writer, "\ndev_mode is on")?;
    }
    Ok(())
}
