use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::warn;

use crate::config;
use crate::hooks::{self, HookContext};
use crate::protocol::HookEvent;
use crate::state::{self, FsSessionState, STATE_DIR_ENV, SessionKey};

/// Handle one hook event read from `input`, writing at most one JSON line.
///
/// Only a failed write is an error; everything else degrades to silence.
pub fn hook(
    event: HookEvent,
    state_dir: Option<&Path>,
    input: &str,
    writer: &mut impl Write,
) -> Result<()> {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

    // The config is only needed up front when it decides where state lives.
    let overridden = state_dir.is_some()
        || std::env::var_os(STATE_DIR_ENV).is_some_and(|v| !v.is_empty());
    let config = (!overridden).then(|| config::load_or_default(&config::find_project_root(&cwd)));
    let root = state::resolve_root(
        state_dir,
        config.as_ref().and_then(|c| c.state_dir.as_deref()),
    );
    let state = FsSessionState::new(&root, SessionKey::from_env());

    let mut ctx = HookContext::new(&state, cwd, dirs::home_dir());
    if let Some(config) = config {
        ctx = ctx.with_config(config);
    }

    let Some(output) = hooks::run(event, input, &ctx) else {
        return Ok(());
    };
    match output.to_json() {
        Ok(json) => writeln!(writer, "{json}")?,
        Err(e) => warn!(error = %e, "failed to serialize hook output"),
    }
    Ok(())
}
