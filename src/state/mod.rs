//! Session-scoped flag store.
//!
//! Every hook invocation is a fresh process, so coordination between them goes
//! through durable storage. Flags are markers whose existence means "set";
//! small text blobs (loop parameters, injected rule hashes) live beside them.
//!
//! On disk the layout is `<root>/<session-key>/<name>`, with the root and each
//! session directory created owner-only.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::{self, Write as _};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::workflow::Workflow;

pub mod key;

pub use key::SessionKey;

/// Environment variable overriding the storage root.
pub const STATE_DIR_ENV: &str = "SISYPHUS_STATE_DIR";

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("failed to access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to serialize session state: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl StateError {
    fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// A named boolean held by a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Flag {
    /// Umbrella flag kept for checks that predate per-workflow flags.
    DevMode,
    Workflow(Workflow),
    /// Set while a ralph loop runs; carries its parameters as text.
    RalphLoop,
    /// Single-use authorization for a privileged skill.
    SkillGate,
}

impl Flag {
    pub const ALL: [Flag; 6] = [
        Flag::DevMode,
        Flag::Workflow(Workflow::Dev),
        Flag::Workflow(Workflow::Ds),
        Flag::Workflow(Workflow::Writing),
        Flag::RalphLoop,
        Flag::SkillGate,
    ];

    /// Flags whose presence means some workflow check may apply.
    pub const WORKFLOW: [Flag; 4] = [
        Flag::DevMode,
        Flag::Workflow(Workflow::Dev),
        Flag::Workflow(Workflow::Ds),
        Flag::Workflow(Workflow::Writing),
    ];

    pub fn name(self) -> &'static str {
        match self {
            Flag::DevMode => "dev_mode",
            Flag::Workflow(Workflow::Dev) => "workflow_dev",
            Flag::Workflow(Workflow::Ds) => "workflow_ds",
            Flag::Workflow(Workflow::Writing) => "workflow_writing",
            Flag::RalphLoop => "ralph_loop_active",
            Flag::SkillGate => "skill_gate_open",
        }
    }
}

/// Storage for one session's flags and text blobs.
///
/// All state is best-effort: a missing entry and an unreadable entry look the
/// same to readers, and every current flag means "off" when absent.
pub trait SessionState {
    fn key(&self) -> &SessionKey;

    /// Create an empty entry if absent. Existing contents are kept.
    fn touch(&self, name: &str) -> Result<(), StateError>;

    /// Remove an entry. Removing an absent entry succeeds.
    fn remove(&self, name: &str) -> Result<(), StateError>;

    fn exists(&self, name: &str) -> bool;

    /// Replace an entry's contents. Readers never observe a partial write.
    fn write_text(&self, name: &str, text: &str) -> Result<(), StateError>;

    fn read_text(&self, name: &str) -> Option<String>;

    /// True when the session holds no entries at all.
    fn is_empty(&self) -> bool;

    /// Drop every entry belonging to the session.
    fn cleanup(&self) -> Result<(), StateError>;

    fn set(&self, flag: Flag) -> Result<(), StateError> {
        self.touch(flag.name())
    }

    fn clear(&self, flag: Flag) -> Result<(), StateError> {
        self.remove(flag.name())
    }

    fn has(&self, flag: Flag) -> bool {
        self.exists(flag.name())
    }

    fn has_any(&self, flags: &[Flag]) -> bool {
        !self.is_empty() && flags.iter().any(|f| self.has(*f))
    }

    /// Every flag currently set, in declaration order.
    fn flags(&self) -> Vec<Flag> {
        Flag::ALL.into_iter().filter(|f| self.has(*f)).collect()
    }
}

// ── Filesystem store ────────────────────────────────────────────────────

/// Resolve the storage root.
///
/// Precedence: explicit override, then `SISYPHUS_STATE_DIR`, then the
/// configured directory, then `<cache dir>/sisyphus/sessions`.
pub fn resolve_root(cli_override: Option<&Path>, configured: Option<&Path>) -> PathBuf {
    if let Some(dir) = cli_override {
        return dir.to_path_buf();
    }
    if let Some(dir) = std::env::var_os(STATE_DIR_ENV).filter(|v| !v.is_empty()) {
        return PathBuf::from(dir);
    }
    if let Some(dir) = configured {
        return dir.to_path_buf();
    }
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("sisyphus")
        .join("sessions")
}

/// Session state persisted as files under `<root>/<key>/`.
#[derive(Debug, Clone)]
pub struct FsSessionState {
    key: SessionKey,
    dir: PathBuf,
}

impl FsSessionState {
    pub fn new(root: &Path, key: SessionKey) -> Self {
        let dir = root.join(key.as_str());
        Self { key, dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    fn ensure_dir(&self) -> Result<(), StateError> {
        create_private_dir(&self.dir).map_err(|e| StateError::io(&self.dir, e))
    }
}

impl SessionState for FsSessionState {
    fn key(&self) -> &SessionKey {
        &self.key
    }

    fn touch(&self, name: &str) -> Result<(), StateError> {
        self.ensure_dir()?;
        let path = self.entry_path(name);
        OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .map_err(|e| StateError::io(&path, e))?;
        Ok(())
    }

    fn remove(&self, name: &str) -> Result<(), StateError> {
        let path = self.entry_path(name);
        match fs::remove_file(&path) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(StateError::io(&path, e)),
            _ => Ok(()),
        }
    }

    fn exists(&self, name: &str) -> bool {
        self.entry_path(name).exists()
    }

    fn write_text(&self, name: &str, text: &str) -> Result<(), StateError> {
        self.ensure_dir()?;
        let path = self.entry_path(name);
        let mut tmp = NamedTempFile::new_in(&self.dir).map_err(|e| StateError::io(&self.dir, e))?;
        tmp.write_all(text.as_bytes())
            .map_err(|e| StateError::io(tmp.path(), e))?;
        tmp.persist(&path)
            .map_err(|e| StateError::io(&path, e.error))?;
        Ok(())
    }

    fn read_text(&self, name: &str) -> Option<String> {
        fs::read_to_string(self.entry_path(name)).ok()
    }

    fn is_empty(&self) -> bool {
        fs::read_dir(&self.dir).map_or(true, |mut entries| entries.next().is_none())
    }

    fn cleanup(&self) -> Result<(), StateError> {
        match fs::remove_dir_all(&self.dir) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(StateError::io(&self.dir, e)),
            _ => Ok(()),
        }
    }
}

fn create_private_dir(path: &Path) -> io::Result<()> {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o700);
    }
    builder.create(path)
}

// ── In-memory store ─────────────────────────────────────────────────────

/// Session state held in a map, for tests and dry runs.
#[derive(Debug)]
pub struct MemorySessionState {
    key: SessionKey,
    entries: RefCell<BTreeMap<String, String>>,
}

impl MemorySessionState {
    pub fn new(key: SessionKey) -> Self {
        Self {
            key,
            entries: RefCell::new(BTreeMap::new()),
        }
    }
}

impl Default for MemorySessionState {
    fn default() -> Self {
        Self::new(SessionKey::derive("", Path::new("/")))
    }
}

impl SessionState for MemorySessionState {
    fn key(&self) -> &SessionKey {
        &self.key
    }

    fn touch(&self, name: &str) -> Result<(), StateError> {
        self.entries
            .borrow_mut()
            .entry(name.to_string())
            .or_default();
        Ok(())
    }

    fn remove(&self, name: &str) -> Result<(), StateError> {
        self.entries.borrow_mut().remove(name);
        Ok(())
    }

    fn exists(&self, name: &str) -> bool {
        self.entries.borrow().contains_key(name)
    }

    fn write_text(&self, name: &str, text: &str) -> Result<(), StateError> {
        self.entries
            .borrow_mut()
            .insert(name.to_string(), text.to_string());
        Ok(())
    }

    fn read_text(&self, name: &str) -> Option<String> {
        self.entries.borrow().get(name).cloned()
    }

    fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    fn cleanup(&self) -> Result<(), StateError> {
        self.entries.borrow_mut().clear();
        Ok(())
    }
}
