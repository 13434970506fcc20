//! SessionStart: pick up an in-flight plan and report active workflows.

use serde::Serialize;
use tracing::{debug, warn};

use super::HookContext;
use crate::boulder::{BoulderState, BoulderStore};
use crate::protocol::{HookEvent, HookOutput, HookPayload, HookSpecificOutput};
use crate::workflow;

const EVENT: HookEvent = HookEvent::SessionStart;

pub const DEFAULT_RESUME_TEMPLATE: &str = "[BOULDER STATE DETECTED]\n\n\
    Active plan: {{plan_name}}\n\
    Progress: {{completed}}/{{total}} tasks complete\n\
    Plan location: {{plan_location}}\n\n\
    Continuing from where you left off.";

/// What the boulder check found.
enum BoulderNotice {
    /// Something the user should fix.
    Warning(String),
    /// Text for the agent's context.
    Context(String),
}

#[derive(Serialize)]
struct ResumeArgs<'a> {
    plan_name: &'a str,
    completed: usize,
    total: usize,
    plan_location: String,
    started_at: &'a str,
    sessions: usize,
}

pub(super) fn handle(payload: &HookPayload, ctx: &HookContext) -> Option<HookOutput> {
    let mut output = HookSpecificOutput::new(EVENT);
    let mut context = Vec::new();

    match check_boulder(ctx, payload.session_id.as_deref()) {
        Some(BoulderNotice::Warning(text)) => output.message = Some(text),
        Some(BoulderNotice::Context(text)) => context.push(text),
        None => {}
    }

    let active = workflow::active(ctx.state);
    if !active.is_empty() {
        let names: Vec<String> = active.iter().map(|w| format!("/{w}")).collect();
        context.push(format!("Active workflows for this session: {}", names.join(", ")));
    }

    if !context.is_empty() {
        output.additional_context = Some(context.join("\n\n"));
    }
    (!output.is_blank()).then(|| HookOutput::specific(output))
}

fn check_boulder(ctx: &HookContext, session_id: Option<&str>) -> Option<BoulderNotice> {
    let root = ctx.project_root();
    let store = BoulderStore::for_project(root);
    let mut boulder = match store.read() {
        Ok(Some(boulder)) => boulder,
        Ok(None) => {
            let plan = ctx.config().plan_document(root);
            if !plan.is_file() {
                return None;
            }
            match store.auto_create(&plan, root) {
                Ok(boulder) => {
                    debug!(plan = %plan.display(), "created boulder state");
                    boulder
                }
                Err(e) => {
                    warn!(error = %e, "failed to create boulder state");
                    return None;
                }
            }
        }
        Err(e) => {
            return Some(BoulderNotice::Warning(format!(
                "[BOULDER STATE WARNING]\n\n{e}\n\nClear boulder state with: sisyphus boulder clear"
            )));
        }
    };

    if !boulder.active_plan.is_file() {
        return Some(BoulderNotice::Warning(format!(
            "[BOULDER STATE WARNING]\n\n\
             Boulder state references missing plan: {}\n\n\
             Clear boulder state with: rm {}",
            boulder.active_plan.display(),
            store.path().display()
        )));
    }

    if let Some(id) = session_id {
        boulder.add_session(id);
    }
    let progress = match boulder.refresh_progress() {
        Ok(progress) => progress,
        Err(e) => {
            warn!(error = %e, "failed to recount plan");
            boulder.progress
        }
    };

    if progress.is_complete(ctx.config().empty_plan) {
        if let Err(e) = store.clear() {
            warn!(error = %e, "failed to clear boulder state");
        }
        return Some(BoulderNotice::Context(boulder.completion_notice()));
    }
    if let Err(e) = store.write(&boulder) {
        warn!(error = %e, "failed to save boulder state");
    }
    Some(BoulderNotice::Context(render_resume(
        &boulder,
        ctx.config().templates.boulder_resume.as_deref(),
    )))
}

/// Continuation text, from the configured template when it renders.
fn render_resume(boulder: &BoulderState, template: Option<&str>) -> String {
    let args = ResumeArgs {
        plan_name: &boulder.plan_name,
        completed: boulder.progress.completed,
        total: boulder.progress.total,
        plan_location: boulder.display_plan(),
        started_at: &boulder.started_at,
        sessions: boulder.session_ids.len(),
    };
    let mut hbs = handlebars::Handlebars::new();
    hbs.set_strict_mode(false);
    hbs.register_escape_fn(handlebars::no_escape);
    if let Some(template) = template {
        match hbs.render_template(template, &args) {
            Ok(text) => return text,
            Err(e) => warn!(error = %e, "invalid boulder_resume template, using default"),
        }
    }
    hbs.render_template(DEFAULT_RESUME_TEMPLATE, &args)
        .unwrap_or_else(|e| unreachable!("default resume template must render: {e}"))
}
