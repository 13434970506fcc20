//! Hook handlers, one module per lifecycle event.
//!
//! Handlers never fail. Anything that goes wrong is logged and the hook
//! degrades to emitting nothing, so the host's tool pipeline keeps moving.

use std::cell::OnceCell;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::config::{self, Config};
use crate::protocol::parse::parse_payload;
use crate::protocol::{HookEvent, HookOutput, HookPayload};
use crate::state::SessionState;

mod post_tool_use;
mod pre_compact;
mod pre_tool_use;
mod session_end;
mod session_start;
mod stop;

/// Running notes kept next to the plan document.
pub const LEARNINGS_PATH: &str = ".claude/LEARNINGS.md";

/// What a handler may consult besides the payload.
///
/// The project root and config are looked up on first use, so events that
/// never need them stay cheap.
pub struct HookContext<'a> {
    pub state: &'a dyn SessionState,
    pub cwd: PathBuf,
    pub home: Option<PathBuf>,
    project_root: OnceCell<PathBuf>,
    config: OnceCell<Config>,
}

impl<'a> HookContext<'a> {
    pub fn new(state: &'a dyn SessionState, cwd: PathBuf, home: Option<PathBuf>) -> Self {
        Self {
            state,
            cwd,
            home,
            project_root: OnceCell::new(),
            config: OnceCell::new(),
        }
    }

    /// Use an already loaded config instead of reading it on demand.
    #[must_use]
    pub fn with_config(self, config: Config) -> Self {
        let _ = self.config.set(config);
        self
    }

    pub fn project_root(&self) -> &Path {
        self.project_root
            .get_or_init(|| config::find_project_root(&self.cwd))
    }

    pub fn config(&self) -> &Config {
        self.config
            .get_or_init(|| config::load_or_default(self.project_root()))
    }

    /// `file_path` as an absolute path, relative ones taken from the cwd.
    pub fn resolve(&self, file_path: &str) -> PathBuf {
        let path = Path::new(file_path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.cwd.join(path)
        }
    }

    /// The project's LEARNINGS.md, if there is one.
    pub fn learnings_file(&self) -> Option<PathBuf> {
        let path = self.project_root().join(LEARNINGS_PATH);
        path.is_file().then_some(path)
    }
}

/// Handle one already parsed event.
pub fn handle(event: HookEvent, payload: &HookPayload, ctx: &HookContext) -> Option<HookOutput> {
    match event {
        HookEvent::PreToolUse => pre_tool_use::handle(payload, ctx),
        HookEvent::PostToolUse => post_tool_use::handle(payload, ctx),
        HookEvent::SessionStart => session_start::handle(payload, ctx),
        HookEvent::SessionEnd => session_end::handle(payload, ctx),
        HookEvent::PreCompact => pre_compact::handle(payload, ctx),
        HookEvent::Stop => stop::handle(payload, ctx),
    }
}

/// Parse the raw stdin text and handle it.
///
/// Blank or malformed input means there is nothing to do.
pub fn run(event: HookEvent, input: &str, ctx: &HookContext) -> Option<HookOutput> {
    let payload = match parse_payload(input) {
        Ok(Some(payload)) => payload,
        Ok(None) => {
            debug!(event = event.wire_name(), "empty payload");
            return None;
        }
        Err(e) => {
            warn!(event = event.wire_name(), error = ?e, "ignoring malformed payload");
            return None;
        }
    };
    let output = handle(event, &payload, ctx);
    debug!(
        event = event.wire_name(),
        tool = %payload.tool_name,
        emitted = output.is_some(),
        "hook handled"
    );
    output
}
