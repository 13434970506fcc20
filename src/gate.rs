//! Single-use authorization latch for orchestration skills.
//!
//! The root context opens the gate (`sisyphus gate open`) right before
//! invoking a privileged skill; the dispatcher consumes it on that very
//! invocation. A delegated sub-context that later tries the same skill finds
//! the gate closed.
//!
//! Check-then-close is two filesystem operations. Two privileged invocations
//! racing can both observe OPEN; that window is accepted.

use tracing::warn;

use crate::state::{Flag, SessionState, StateError};

/// Skills that may only run from the root context: names starting with
/// `dev-` or `dev_`.
pub fn is_privileged_skill(skill: &str) -> bool {
    skill.starts_with("dev-") || skill.starts_with("dev_")
}

pub struct SkillGate<'a> {
    state: &'a dyn SessionState,
}

impl<'a> SkillGate<'a> {
    pub fn new(state: &'a dyn SessionState) -> Self {
        Self { state }
    }

    pub fn open(&self) -> Result<(), StateError> {
        self.state.set(Flag::SkillGate)
    }

    pub fn close(&self) -> Result<(), StateError> {
        self.state.clear(Flag::SkillGate)
    }

    pub fn is_open(&self) -> bool {
        self.state.has(Flag::SkillGate)
    }

    /// Check the gate and close it in the same step.
    ///
    /// Returns whether the gate was open. A failure to close is logged; the
    /// caller's authorization still stands for this invocation.
    pub fn consume(&self) -> bool {
        if !self.is_open() {
            return false;
        }
        if let Err(e) = self.close() {
            warn!(error = %e, "failed to close skill gate");
        }
        true
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::state::MemorySessionState;

    #[test]
    fn privileged_names() {
        assert!(is_privileged_skill("dev-implement"));
        assert!(is_privileged_skill("dev_debug"));
        assert!(!is_privileged_skill("dev"));
        assert!(!is_privileged_skill("dev:start"));
        assert!(!is_privileged_skill("ds-implement"));
    }

    #[test]
    fn never_opened_is_closed() {
        let state = MemorySessionState::default();
        assert!(!SkillGate::new(&state).is_open());
        assert!(!SkillGate::new(&state).consume());
    }

    #[test]
    fn open_check_close_check() {
        let state = MemorySessionState::default();
        let gate = SkillGate::new(&state);
        gate.open().unwrap();
        assert!(gate.is_open());
        gate.close().unwrap();
        assert!(!gate.is_open());
    }

    #[test]
    fn consume_is_single_use() {
        let state = MemorySessionState::default();
        let gate = SkillGate::new(&state);
        gate.open().unwrap();
        assert!(gate.consume());
        assert!(!gate.consume());
        assert!(!gate.is_open());
    }
}
