use std::io::Write;

use anyhow::{Context, Result};

use crate::gate::SkillGate;
use crate::state::SessionState;

/// Open the gate for exactly one orchestration skill invocation.
pub fn open(state: &dyn SessionState, writer: &mut impl Write) -> Result<()> {
    SkillGate::new(state)
        .open()
        .context("failed to open the skill gate")?;
    writeln!(
        writer,
        "Skill gate open for session {}. The next orchestration skill closes it.",
        state.key()
    )?;
    Ok(())
}

pub fn close(state: &dyn SessionState, writer: &mut impl Write) -> Result<()> {
    SkillGate::new(state)
        .close()
        .context("failed to close the skill gate")?;
    writeln!(writer, "Skill gate closed.")?;
    Ok(())
}

pub fn status(state: &dyn SessionState, writer: &mut impl Write) -> Result<()> {
    let label = if SkillGate::new(state).is_open() {
        "open"
    } else {
        "closed"
    };
    writeln!(writer, "Skill gate: {label}")?;
    Ok(())
}
