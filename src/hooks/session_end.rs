//! SessionEnd: drop the session's state and stamp LEARNINGS.md.

use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use super::HookContext;
use crate::patterns::compile;
use crate::protocol::{HookOutput, HookPayload};

static FOOTER: LazyLock<Regex> =
    LazyLock::new(|| compile(r"\n---\nLast updated:[^\n]*\n---\n?\s*$"));

pub(super) fn handle(_payload: &HookPayload, ctx: &HookContext) -> Option<HookOutput> {
    if let Err(e) = ctx.state.cleanup() {
        warn!(session = %ctx.state.key(), error = %e, "failed to clean up session state");
    }
    if let Some(path) = ctx.learnings_file() {
        match stamp_learnings(&path, &chrono::Local::now().format("%Y-%m-%d %H:%M").to_string()) {
            Ok(()) => debug!(path = %path.display(), "stamped learnings"),
            Err(e) => warn!(error = ?e, "failed to stamp learnings"),
        }
    }
    Some(HookOutput::empty())
}

/// Replace the trailing `Last updated` footer, adding one if missing.
pub fn stamp_learnings(path: &Path, timestamp: &str) -> Result<()> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let body = FOOTER.replace(&contents, "");
    let stamped = format!("{}\n---\nLast updated: {timestamp}\n---\n", body.trim_end());
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir).with_context(|| format!("writing {}", path.display()))?;
    tmp.write_all(stamped.as_bytes())
        .with_context(|| format!("writing {}", path.display()))?;
    tmp.persist(path)
        .with_context(|| format!("replacing {}", path.display()))?;
    Ok(())
}
