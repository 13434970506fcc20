use serde::Serialize;

use super::types::HookEvent;

/// The single JSON object a hook may write to stdout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum HookOutput {
    Specific {
        #[serde(rename = "hookSpecificOutput")]
        hook_specific_output: HookSpecificOutput,
    },
    Decision {
        decision: Decision,
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
    /// Forces the agent to keep working instead of stopping.
    Halt {
        #[serde(rename = "continue")]
        keep_going: bool,
        reason: String,
    },
    Empty {},
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HookSpecificOutput {
    pub hook_event_name: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_context: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permission_decision: Option<PermissionDecision>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permission_decision_reason: Option<String>,
}

impl HookSpecificOutput {
    pub fn new(event: HookEvent) -> Self {
        Self {
            hook_event_name: event.wire_name(),
            notification: None,
            message: None,
            additional_context: None,
            permission_decision: None,
            permission_decision_reason: None,
        }
    }

    /// True when no field beyond the event name is set.
    pub fn is_blank(&self) -> bool {
        self.notification.is_none()
            && self.message.is_none()
            && self.additional_context.is_none()
            && self.permission_decision.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionDecision {
    Deny,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Block,
}

impl HookOutput {
    pub fn empty() -> Self {
        HookOutput::Empty {}
    }

    pub fn specific(output: HookSpecificOutput) -> Self {
        HookOutput::Specific {
            hook_specific_output: output,
        }
    }

    pub fn deny(event: HookEvent, reason: impl Into<String>) -> Self {
        let mut out = HookSpecificOutput::new(event);
        out.permission_decision = Some(PermissionDecision::Deny);
        out.permission_decision_reason = Some(reason.into());
        Self::specific(out)
    }

    pub fn block(reason: impl Into<String>) -> Self {
        HookOutput::Decision {
            decision: Decision::Block,
            reason: Some(reason.into()),
        }
    }

    pub fn message(event: HookEvent, message: impl Into<String>) -> Self {
        let mut out = HookSpecificOutput::new(event);
        out.message = Some(message.into());
        Self::specific(out)
    }

    pub fn context(event: HookEvent, context: impl Into<String>) -> Self {
        let mut out = HookSpecificOutput::new(event);
        out.additional_context = Some(context.into());
        Self::specific(out)
    }

    pub fn halt(reason: impl Into<String>) -> Self {
        HookOutput::Halt {
            keep_going: false,
            reason: reason.into(),
        }
    }

    /// Whether this output refuses the tool call.
    pub fn is_denial(&self) -> bool {
        match self {
            HookOutput::Specific {
                hook_specific_output,
            } => hook_specific_output.permission_decision.is_some(),
            HookOutput::Decision { decision, .. } => *decision == Decision::Block,
            HookOutput::Halt { .. } | HookOutput::Empty {} => false,
        }
    }

    /// Serialize as one line of JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn empty_object() {
        insta::assert_snapshot!(HookOutput::empty().to_json().unwrap(), @"{}");
    }

    #[test]
    fn deny_shape() {
        let out = HookOutput::deny(HookEvent::PreToolUse, "no");
        assert!(out.is_denial());
        insta::assert_snapshot!(
            out.to_json().unwrap(),
            @r#"{"hookSpecificOutput":{"hookEventName":"PreToolUse","permissionDecision":"deny","permissionDecisionReason":"no"}}"#
        );
    }

    #[test]
    fn notification_and_message_together() {
        let mut out = HookSpecificOutput::new(HookEvent::PreToolUse);
        out.notification = Some("on".into());
        out.message = Some("careful".into());
        let out = HookOutput::specific(out);
        assert!(!out.is_denial());
        insta::assert_snapshot!(
            out.to_json().unwrap(),
            @r#"{"hookSpecificOutput":{"hookEventName":"PreToolUse","notification":"on","message":"careful"}}"#
        );
    }

    #[test]
    fn context_shape() {
        insta::assert_snapshot!(
            HookOutput::context(HookEvent::PostToolUse, "rules").to_json().unwrap(),
            @r#"{"hookSpecificOutput":{"hookEventName":"PostToolUse","additionalContext":"rules"}}"#
        );
    }

    #[test]
    fn block_shape() {
        let out = HookOutput::block("dangerous");
        assert!(out.is_denial());
        insta::assert_snapshot!(out.to_json().unwrap(), @r#"{"decision":"block","reason":"dangerous"}"#);
    }

    #[test]
    fn halt_shape() {
        let out = HookOutput::halt("keep going");
        assert!(!out.is_denial());
        insta::assert_snapshot!(out.to_json().unwrap(), @r#"{"continue":false,"reason":"keep going"}"#);
    }

    #[test]
    fn blank_specific_output() {
        let mut out = HookSpecificOutput::new(HookEvent::SessionStart);
        assert!(out.is_blank());
        out.additional_context = Some(String::new());
        assert!(!out.is_blank());
    }
}
