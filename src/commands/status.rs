use std::io::Write;
use std::path::Path;

use anyhow::Result;

use crate::state::SessionState;

/// Print the session key, where its state lives, and every flag set.
pub fn status(state: &dyn SessionState, state_dir: &Path, writer: &mut impl Write) -> Result<()> {
    writeln!(writer, "Session:   {}", state.key())?;
    writeln!(writer, "State dir: {}", state_dir.display())?;

    let flags = state.flags();
    if flags.is_empty() {
        writeln!(writer, "No flags set.")?;
        return Ok(());
    }
    writeln!(writer, "Flags:")?;
    for flag in flags {
        writeln!(writer, "  {}", flag.name())?;
    }
    Ok(())
}
