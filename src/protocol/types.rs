use std::path::PathBuf;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Lifecycle events the host invokes hooks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum HookEvent {
    PreToolUse,
    PostToolUse,
    SessionStart,
    SessionEnd,
    PreCompact,
    Stop,
}

impl HookEvent {
    /// Event name as it appears in `hookSpecificOutput.hookEventName`.
    pub fn wire_name(self) -> &'static str {
        match self {
            HookEvent::PreToolUse => "PreToolUse",
            HookEvent::PostToolUse => "PostToolUse",
            HookEvent::SessionStart => "SessionStart",
            HookEvent::SessionEnd => "SessionEnd",
            HookEvent::PreCompact => "PreCompact",
            HookEvent::Stop => "Stop",
        }
    }
}

/// One JSON object read from the hook's stdin.
///
/// Every field is optional; which ones matter depends on the event.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HookPayload {
    #[serde(default)]
    pub tool_name: String,
    #[serde(default)]
    pub tool_input: Value,
    #[serde(default, rename = "sessionId", alias = "session_id")]
    pub session_id: Option<String>,
    #[serde(default)]
    pub tool_use_id: Option<String>,
    #[serde(default)]
    pub transcript_path: Option<PathBuf>,
}

/// Optional text fields: absent and `null` both read as empty.
fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SkillInput {
    pub skill: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub args: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BashInput {
    pub command: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WriteInput {
    pub file_path: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EditInput {
    pub file_path: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub new_string: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReadInput {
    pub file_path: String,
}

/// A tool invocation, validated per tool.
///
/// Inputs missing a required field (a `Skill` without `skill`, a `Bash`
/// without `command`) fall into `Other` and are treated as nothing to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolCall {
    Skill(SkillInput),
    Bash(BashInput),
    Write(WriteInput),
    Edit(EditInput),
    Read(ReadInput),
    Other { name: String },
}

impl ToolCall {
    pub fn from_payload(payload: &HookPayload) -> Self {
        let input = &payload.tool_input;
        let call = match payload.tool_name.as_str() {
            "Skill" => typed(input).map(ToolCall::Skill),
            "Bash" => typed(input).map(ToolCall::Bash),
            "Write" => typed(input).map(ToolCall::Write),
            "Edit" => typed(input).map(ToolCall::Edit),
            "Read" => typed(input).map(ToolCall::Read),
            _ => None,
        };
        call.unwrap_or_else(|| ToolCall::Other {
            name: payload.tool_name.clone(),
        })
    }

    /// The file a `Read`, `Write` or `Edit` touches.
    pub fn file_path(&self) -> Option<&str> {
        match self {
            ToolCall::Write(w) => Some(&w.file_path),
            ToolCall::Edit(e) => Some(&e.file_path),
            ToolCall::Read(r) => Some(&r.file_path),
            _ => None,
        }
    }

    /// Text a `Write` or `Edit` puts into a file.
    pub fn written_text(&self) -> Option<&str> {
        match self {
            ToolCall::Write(w) => Some(&w.content),
            ToolCall::Edit(e) => Some(&e.new_string),
            _ => None,
        }
    }
}

fn typed<T: DeserializeOwned>(value: &Value) -> Option<T> {
    serde_json::from_value(value.clone()).ok()
}
