//! PostToolUse: rule injection, plan progress and writing review for the file
//! a tool just touched, all folded into one `additionalContext`.

use std::path::Path;

use tracing::{debug, warn};

use super::HookContext;
use crate::boulder::BoulderStore;
use crate::detectors::{self, writing};
use crate::protocol::{HookEvent, HookOutput, HookPayload, ToolCall};
use crate::rules;
use crate::workflow::{self, Workflow};

const EVENT: HookEvent = HookEvent::PostToolUse;

pub(super) fn handle(payload: &HookPayload, ctx: &HookContext) -> Option<HookOutput> {
    let call = ToolCall::from_payload(payload);
    let file_path = call.file_path()?;
    let file = ctx.resolve(file_path);

    let mut sections = Vec::new();

    let user_rules = if ctx.config().rules.user_rules {
        ctx.home.as_deref().map(rules::user_rules_dir)
    } else {
        None
    };
    if let Some(text) = rules::inject_for_file(ctx.state, ctx.project_root(), &file, user_rules.as_deref())
    {
        sections.push(text);
    }

    if let Some(written) = call.written_text() {
        if let Some(text) = refresh_boulder(ctx, &file) {
            sections.push(text);
        }
        if workflow::is_active(ctx.state, Workflow::Writing)
            && let Some(text) = detectors::combine(&writing::check_content(file_path, written))
        {
            sections.push(text);
        }
    }

    if sections.is_empty() {
        return None;
    }
    Some(HookOutput::context(EVENT, sections.join("\n\n")))
}

/// Recount the active plan after an edit to it.
fn refresh_boulder(ctx: &HookContext, file: &Path) -> Option<String> {
    let store = BoulderStore::for_project(ctx.project_root());
    let mut boulder = match store.read() {
        Ok(boulder) => boulder?,
        Err(e) => {
            warn!(error = %e, "unreadable boulder state");
            return None;
        }
    };
    if !boulder.tracks(file) {
        return None;
    }
    let progress = match boulder.refresh_progress() {
        Ok(progress) => progress,
        Err(e) => {
            warn!(error = %e, "failed to recount plan");
            return None;
        }
    };
    debug!(total = progress.total, completed = progress.completed, "plan progress");

    if progress.is_complete(ctx.config().empty_plan) {
        if let Err(e) = store.clear() {
            warn!(error = %e, "failed to clear boulder state");
        }
        return Some(boulder.completion_notice());
    }
    if let Err(e) = store.write(&boulder) {
        warn!(error = %e, "failed to save boulder state");
    }
    Some(format!(
        "[BOULDER PROGRESS] {}: {}/{} tasks complete",
        boulder.plan_name, progress.completed, progress.total
    ))
}
