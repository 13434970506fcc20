//! Subcommand implementations.
//!
//! Every command writes its report to a caller-supplied writer so tests can
//! capture it.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::config::{self, Config};
use crate::state::{self, FsSessionState, SessionKey};

pub mod boulder;
pub mod cleanup;
pub mod gate;
pub mod hook;
pub mod ralph;
pub mod status;
pub mod workflow;

/// Where a command runs: the working directory, its project and config.
pub struct Workspace {
    pub cwd: PathBuf,
    pub project_root: PathBuf,
    pub config: Config,
}

impl Workspace {
    /// Resolve from the process environment. A malformed config is an error.
    pub fn discover() -> Result<Self> {
        let cwd = std::env::current_dir().context("failed to read the working directory")?;
        Self::at(cwd)
    }

    pub fn at(cwd: PathBuf) -> Result<Self> {
        let project_root = config::find_project_root(&cwd);
        let config = config::load(&project_root)?;
        Ok(Self {
            cwd,
            project_root,
            config,
        })
    }

    /// The current session's state under the resolved storage root.
    pub fn session_state(&self, state_dir: Option<&Path>) -> FsSessionState {
        let root = state::resolve_root(state_dir, self.config.state_dir.as_deref());
        FsSessionState::new(&root, SessionKey::from_env())
    }
}
