//! Per-session workflow modes.
//!
//! Each workflow is an independent flag: `INACTIVE → ACTIVE` on activation,
//! back to `INACTIVE` on an explicit exit or session cleanup. Activating `dev`
//! or `ds` also sets the umbrella `dev_mode` flag.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::state::{Flag, SessionState, StateError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Workflow {
    Dev,
    Ds,
    Writing,
}

impl Workflow {
    pub const ALL: [Workflow; 3] = [Workflow::Dev, Workflow::Ds, Workflow::Writing];

    pub fn as_str(self) -> &'static str {
        match self {
            Workflow::Dev => "dev",
            Workflow::Ds => "ds",
            Workflow::Writing => "writing",
        }
    }

    /// Whether this workflow also drives the umbrella `dev_mode` flag.
    pub fn uses_dev_mode(self) -> bool {
        matches!(self, Workflow::Dev | Workflow::Ds)
    }

    /// Map a skill name to the workflow it activates.
    ///
    /// Exit and sandbox-control skills never activate anything.
    pub fn for_skill(skill: &str) -> Option<Workflow> {
        if skill.contains("exit") || skill.contains("sandbox") {
            return None;
        }
        match skill {
            "dev" => return Some(Workflow::Dev),
            "ds" => return Some(Workflow::Ds),
            "writing" => return Some(Workflow::Writing),
            _ => {}
        }
        if skill.starts_with("dev:") || skill.starts_with("dev-") {
            Some(Workflow::Dev)
        } else if skill.starts_with("ds:") || skill.starts_with("ds-") {
            Some(Workflow::Ds)
        } else if skill.starts_with("writing") {
            Some(Workflow::Writing)
        } else {
            None
        }
    }

    /// User-facing notification emitted when the workflow turns on.
    pub fn activation_notice(self) -> String {
        format!("✓ {} workflow activated", self.as_str().to_uppercase())
    }
}

impl fmt::Display for Workflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Turn a workflow on for the session.
pub fn activate(state: &dyn SessionState, workflow: Workflow) -> Result<(), StateError> {
    state.set(Flag::Workflow(workflow))?;
    if workflow.uses_dev_mode() {
        state.set(Flag::DevMode)?;
    }
    Ok(())
}

/// Turn a workflow off. The umbrella flag goes away once neither `dev` nor
/// `ds` remains active.
pub fn deactivate(state: &dyn SessionState, workflow: Workflow) -> Result<(), StateError> {
    state.clear(Flag::Workflow(workflow))?;
    let umbrella_needed = Workflow::ALL
        .into_iter()
        .filter(|w| w.uses_dev_mode())
        .any(|w| state.has(Flag::Workflow(w)));
    if !umbrella_needed {
        state.clear(Flag::DevMode)?;
    }
    Ok(())
}

pub fn is_active(state: &dyn SessionState, workflow: Workflow) -> bool {
    state.has(Flag::Workflow(workflow))
}

pub fn active(state: &dyn SessionState) -> Vec<Workflow> {
    Workflow::ALL
        .into_iter()
        .filter(|w| is_active(state, *w))
        .collect()
}
