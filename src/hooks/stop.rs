//! Stop: a running loop only ends on its completion promise or when the
//! iteration budget runs out. Any other stop is refused.

use tracing::{debug, warn};

use super::HookContext;
use crate::protocol::{HookEvent, HookOutput, HookPayload};
use crate::ralph::{LoopGuard, RalphLoopState};
use crate::transcript;

const EVENT: HookEvent = HookEvent::Stop;

pub(super) fn handle(payload: &HookPayload, ctx: &HookContext) -> Option<HookOutput> {
    let guard = LoopGuard::new(ctx.state);
    if !guard.is_active() {
        return None;
    }
    let Some(current) = guard.current() else {
        warn!("loop flag has no readable parameters, ending loop");
        end_loop(&guard);
        return None;
    };

    let paths = transcript::candidate_paths(
        payload.transcript_path.as_deref(),
        payload.session_id.as_deref(),
        ctx.home.as_deref(),
    );
    let fulfilled = match transcript::read_first(&paths) {
        Some(text) => transcript::promise_fulfilled(&text, &current.completion_promise),
        None => {
            debug!(candidates = paths.len(), "no transcript found");
            false
        }
    };

    if fulfilled {
        end_loop(&guard);
        return Some(HookOutput::message(EVENT, completion_message(&current)));
    }
    if current.budget_exhausted() {
        end_loop(&guard);
        return Some(HookOutput::message(EVENT, exhausted_message(&current)));
    }
    if let Err(e) = guard.record_iteration(&current) {
        warn!(error = %e, "failed to record loop iteration");
    }
    debug!(iteration = current.iteration + 1, max = current.max_iterations, "refusing stop");
    Some(HookOutput::halt(current.continuation_reason()))
}

fn end_loop(guard: &LoopGuard) {
    if let Err(e) = guard.stop() {
        warn!(error = %e, "failed to clear loop state");
    }
}

fn completion_message(state: &RalphLoopState) -> String {
    format!(
        "[RALPH LOOP COMPLETE]\n\n\
         Completion promise detected: <promise>{}</promise>\n\
         Ralph loop has ended.",
        state.completion_promise
    )
}

fn exhausted_message(state: &RalphLoopState) -> String {
    format!(
        "[RALPH LOOP STOPPED]\n\n\
         Reached the iteration limit ({}) without <promise>{}</promise>.\n\
         Ralph loop has ended; review what is left before starting another.",
        state.max_iterations, state.completion_promise
    )
}
