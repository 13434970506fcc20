//! The hook wire protocol: one JSON payload in on stdin, zero or one JSON
//! object out on stdout.

pub mod emit;
pub mod parse;
pub mod types;

pub use emit::{HookOutput, HookSpecificOutput};
pub use types::{HookEvent, HookPayload, ToolCall};
