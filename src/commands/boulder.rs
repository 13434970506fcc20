use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};

use crate::boulder::{self, BoulderStore};
use crate::config::EmptyPlanPolicy;

/// Show the project's active plan with freshly counted progress.
pub fn status(project_root: &Path, policy: EmptyPlanPolicy, writer: &mut impl Write) -> Result<()> {
    let store = BoulderStore::for_project(project_root);
    let Some(state) = store.read()? else {
        writeln!(writer, "No active plan.")?;
        return Ok(());
    };
    let progress = boulder::count_plan_file(&state.active_plan)
        .with_context(|| format!("failed to count {}", state.display_plan()))?;

    writeln!(writer, "Plan:     {}", state.plan_name)?;
    writeln!(writer, "Location: {}", state.display_plan())?;
    write!(writer, "Progress: {}/{} tasks complete", progress.completed, progress.total)?;
    if progress.is_complete(policy) {
        write!(writer, " (done)")?;
    }
    writeln!(writer)?;
    writeln!(writer, "Started:  {}", state.started_at)?;
    writeln!(writer, "Sessions: {}", state.session_ids.len())?;
    if !state.active_plan.is_file() {
        writeln!(writer, "\nwarning: the plan document no longer exists")?;
    }
    Ok(())
}

pub fn clear(project_root: &Path, writer: &mut impl Write) -> Result<()> {
    let store = BoulderStore::for_project(project_root);
    if !store.path().exists() {
        writeln!(writer, "No active plan.")?;
        return Ok(());
    }
    store.clear()?;
    writeln!(writer, "Cleared {}", store.path().display())?;
    Ok(())
}
