//! Per-project plan tracking ("boulder" state).
//!
//! A boulder points at a plan document and caches its checkbox progress. The
//! counters are always recomputable from the document; the file only exists
//! while a plan is in flight.

use std::fs;
use std::io::{self, Write as _};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::config::EmptyPlanPolicy;
use crate::patterns::{compile, compile_ci};

/// Location of the boulder file, relative to the project root.
pub const BOULDER_PATH: &str = ".claude/.boulder.json";

#[derive(Debug, thiserror::Error)]
pub enum BoulderError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed boulder state in {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to serialize boulder state: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub total: usize,
    pub completed: usize,
}

impl Progress {
    pub fn is_complete(self, policy: EmptyPlanPolicy) -> bool {
        is_plan_complete(self.total, self.completed, policy)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoulderState {
    pub active_plan: PathBuf,
    pub project_root: PathBuf,
    pub plan_name: String,
    pub started_at: String,
    #[serde(default)]
    pub session_ids: Vec<String>,
    #[serde(default)]
    pub progress: Progress,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

// ── Checkbox counting ───────────────────────────────────────────────────

static UNCHECKED: LazyLock<Regex> = LazyLock::new(|| compile(r"(?m)^[-*]\s*\[\s*\]"));
static CHECKED: LazyLock<Regex> = LazyLock::new(|| compile(r"(?m)^[-*]\s*\[[xX]\]"));

/// Count `(total, completed)` checkbox items at the start of lines.
///
/// `- [ ]` / `* [ ]` are open; `- [x]` / `- [X]` are done.
pub fn count_checkboxes(text: &str) -> (usize, usize) {
    let open = UNCHECKED.find_iter(text).count();
    let done = CHECKED.find_iter(text).count();
    (open + done, done)
}

/// A plan is complete when every item is checked. A plan with no items
/// follows `policy`.
pub fn is_plan_complete(total: usize, completed: usize, policy: EmptyPlanPolicy) -> bool {
    if total == 0 {
        return policy == EmptyPlanPolicy::Complete;
    }
    completed == total
}

/// Recount a plan document on disk. A missing document has no items.
pub fn count_plan_file(plan: &Path) -> Result<Progress, BoulderError> {
    let text = match fs::read_to_string(plan) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Progress::default()),
        Err(source) => {
            return Err(BoulderError::Read {
                path: plan.to_path_buf(),
                source,
            });
        }
    };
    let (total, completed) = count_checkboxes(&text);
    Ok(Progress { total, completed })
}

static HEADING: LazyLock<Regex> = LazyLock::new(|| compile(r"(?m)^#\s+(.+)$"));
static PLAN_PREFIX: LazyLock<Regex> = LazyLock::new(|| compile_ci(r"^plan:\s*"));

/// Slug of the document's first H1, without a leading `Plan:`.
pub fn infer_plan_name(text: &str) -> String {
    let Some(caps) = HEADING.captures(text) else {
        return "plan".to_string();
    };
    let title = PLAN_PREFIX.replace(caps[1].trim(), "");
    let slug: String = title
        .to_lowercase()
        .replace(' ', "-")
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-')
        .collect();
    if slug.is_empty() {
        "plan".to_string()
    } else {
        slug
    }
}

// ── State ───────────────────────────────────────────────────────────────

impl BoulderState {
    /// A fresh boulder for `plan`, with progress counted from the document.
    pub fn create(
        plan: &Path,
        project_root: &Path,
        plan_name: String,
    ) -> Result<Self, BoulderError> {
        Ok(Self {
            active_plan: plan.to_path_buf(),
            project_root: project_root.to_path_buf(),
            plan_name,
            started_at: chrono::Local::now().to_rfc3339(),
            session_ids: Vec::new(),
            progress: count_plan_file(plan)?,
            metadata: serde_json::Map::new(),
        })
    }

    /// Record a session as having touched the plan. Returns whether it was new.
    pub fn add_session(&mut self, session_id: &str) -> bool {
        if self.session_ids.iter().any(|s| s == session_id) {
            return false;
        }
        self.session_ids.push(session_id.to_string());
        true
    }

    /// Recompute progress from the plan document.
    pub fn refresh_progress(&mut self) -> Result<Progress, BoulderError> {
        self.progress = count_plan_file(&self.active_plan)?;
        Ok(self.progress)
    }

    /// Whether `path` names this boulder's plan document.
    pub fn tracks(&self, path: &Path) -> bool {
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.project_root.join(path)
        };
        if absolute == self.active_plan {
            return true;
        }
        match (fs::canonicalize(&absolute), fs::canonicalize(&self.active_plan)) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        }
    }

    /// Plan location for display: relative to the project when possible.
    pub fn display_plan(&self) -> String {
        self.active_plan
            .strip_prefix(&self.project_root)
            .unwrap_or(&self.active_plan)
            .display()
            .to_string()
    }

    /// Announcement made when the last item is checked off.
    pub fn completion_notice(&self) -> String {
        format!(
            "[BOULDER COMPLETE]\n\n\
             Plan '{}' is complete! All tasks checked off.\n\
             Boulder state has been cleared.",
            self.plan_name
        )
    }
}

/// The boulder file of one project.
pub struct BoulderStore {
    path: PathBuf,
}

impl BoulderStore {
    pub fn for_project(project_root: &Path) -> Self {
        Self {
            path: project_root.join(BOULDER_PATH),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current boulder, or `None` when the project has none.
    pub fn read(&self) -> Result<Option<BoulderState>, BoulderError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(BoulderError::Read {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        serde_json::from_str(&text)
            .map(Some)
            .map_err(|source| BoulderError::Parse {
                path: self.path.clone(),
                source,
            })
    }

    /// Replace the boulder file. Readers see the old or the new document,
    /// never a partial one.
    pub fn write(&self, state: &BoulderState) -> Result<(), BoulderError> {
        let json = serde_json::to_string_pretty(state)?;
        let write_err = |source: io::Error| BoulderError::Write {
            path: self.path.clone(),
            source,
        };
        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir).map_err(write_err)?;
        let mut tmp = NamedTempFile::new_in(dir).map_err(write_err)?;
        tmp.write_all(json.as_bytes()).map_err(write_err)?;
        tmp.persist(&self.path).map_err(|e| write_err(e.error))?;
        Ok(())
    }

    /// Delete the boulder file. Clearing an absent boulder succeeds.
    pub fn clear(&self) -> Result<(), BoulderError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(BoulderError::Write {
                path: self.path.clone(),
                source,
            }),
        }
    }

    /// Create and persist a boulder for an existing plan document.
    pub fn auto_create(&self, plan: &Path, project_root: &Path) -> Result<BoulderState, BoulderError> {
        let text = fs::read_to_string(plan).map_err(|source| BoulderError::Read {
            path: plan.to_path_buf(),
            source,
        })?;
        let state = BoulderState::create(plan, project_root, infer_plan_name(&text))?;
        self.write(&state)?;
        Ok(state)
    }
}
