//! PreCompact: leave a marker in LEARNINGS.md and remind the agent which
//! workflow to reload once the context has been summarized.

use std::fs::OpenOptions;
use std::io::Write as _;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, warn};

use super::{HookContext, LEARNINGS_PATH};
use crate::patterns::compile_ci;
use crate::protocol::{HookEvent, HookOutput, HookPayload};
use crate::workflow::{self, Workflow};

const EVENT: HookEvent = HookEvent::PreCompact;

/// Plan-document hints, checked in workflow order.
static PLAN_HINTS: LazyLock<Vec<(Workflow, Regex)>> = LazyLock::new(|| {
    vec![
        (Workflow::Dev, compile_ci(r"## Dev Workflow|/dev\b|TDD|RED-GREEN-REFACTOR")),
        (Workflow::Ds, compile_ci(r"## DS Workflow|/ds\b|data science|\bEDA\b")),
        (Workflow::Writing, compile_ci(r"## Writing|/writing\b|\bdraft|\brevision")),
    ]
});

/// Guess the workflow a plan document belongs to.
pub fn detect_from_plan(text: &str) -> Option<Workflow> {
    PLAN_HINTS
        .iter()
        .find(|(_, re)| re.is_match(text))
        .map(|(workflow, _)| *workflow)
}

pub(super) fn handle(_payload: &HookPayload, ctx: &HookContext) -> Option<HookOutput> {
    let workflow = workflow::active(ctx.state).first().copied().or_else(|| {
        let plan = ctx.config().plan_document(ctx.project_root());
        std::fs::read_to_string(plan)
            .ok()
            .and_then(|text| detect_from_plan(&text))
    });
    debug!(workflow = ?workflow, "compacting");

    let learnings = ctx.learnings_file();
    if let Some(path) = &learnings {
        let time = chrono::Local::now().format("%H:%M").to_string();
        if let Err(e) = append_marker(path, &time, workflow) {
            warn!(path = %path.display(), error = %e, "failed to append compaction marker");
        }
    }

    let mut lines = vec![match workflow {
        Some(w) => format!(
            "IMPORTANT: The /{w} workflow was active before compaction. \
             After compaction completes, invoke /{w} to reload the workflow context."
        ),
        None => "After compaction, check .claude/PLAN.md to determine which workflow \
                 was in use (/dev, /ds, or /writing) and reload it."
            .to_string(),
    }];
    if learnings.is_some() {
        lines.push(format!(
            "Read {LEARNINGS_PATH} for session context and recent progress."
        ));
    }
    Some(HookOutput::context(EVENT, lines.join("\n")))
}

fn append_marker(path: &Path, time: &str, workflow: Option<Workflow>) -> std::io::Result<()> {
    let note = workflow.map_or_else(String::new, |w| format!(" (workflow: /{w})"));
    let mut file = OpenOptions::new().append(true).open(path)?;
    writeln!(file, "\n[Compaction at {time}]{note} - Context was summarized")
}
