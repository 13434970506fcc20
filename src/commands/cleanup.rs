use std::io::Write;

use anyhow::{Context, Result};

use crate::state::SessionState;

/// Remove everything stored for the current session.
pub fn cleanup(state: &dyn SessionState, writer: &mut impl Write) -> Result<()> {
    if state.is_empty() {
        writeln!(writer, "Nothing to clean up for session {}.", state.key())?;
        return Ok(());
    }
    state
        .cleanup()
        .with_context(|| format!("failed to clean up session {}", state.key()))?;
    writeln!(writer, "Removed state for session {}.", state.key())?;
    Ok(())
}
