//! Locating session transcripts and finding completion promises in them.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};

use crate::patterns::compile;

/// Heading of the text emitted when an early stop is refused. Anything
/// before its last occurrence predates the current iteration.
pub const ENFORCEMENT_MARKER: &str = "[RALPH LOOP ENFORCEMENT]";

/// Where to look for a session transcript, most specific first.
pub fn candidate_paths(
    explicit: Option<&Path>,
    session_id: Option<&str>,
    home: Option<&Path>,
) -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = explicit.map(Path::to_path_buf).into_iter().collect();
    if let (Some(id), Some(home)) = (session_id.filter(|id| !id.is_empty()), home) {
        let claude = home.join(".claude");
        paths.push(claude.join("sessions").join(id).join("transcript.md"));
        paths.push(claude.join("sessions").join(id).join("messages.json"));
        paths.push(claude.join("transcripts").join(format!("{id}.md")));
    }
    paths
}

/// Contents of the first readable candidate.
pub fn read_first(paths: &[PathBuf]) -> Option<String> {
    paths.iter().find_map(|p| fs::read_to_string(p).ok())
}

static FENCED: LazyLock<Regex> = LazyLock::new(|| compile(r"(?s)```.*?```"));
static INLINE: LazyLock<Regex> = LazyLock::new(|| compile(r"`[^`]*`"));

/// Drop fenced blocks, then inline code spans.
pub fn strip_code(text: &str) -> String {
    let without_fences = FENCED.replace_all(text, "");
    INLINE.replace_all(&without_fences, "").into_owned()
}

/// Whether `text` contains `<promise>TOKEN</promise>` outside code.
///
/// The match ignores case and whitespace around the token.
pub fn contains_promise(text: &str, token: &str) -> bool {
    let pattern = format!(r"<promise>\s*{}\s*</promise>", regex::escape(token.trim()));
    let Ok(re) = RegexBuilder::new(&pattern).case_insensitive(true).build() else {
        return false;
    };
    re.is_match(&strip_code(text))
}

/// Whether the promise was made since the last refused stop.
pub fn promise_fulfilled(transcript: &str, token: &str) -> bool {
    let Some(i) = transcript.rfind(ENFORCEMENT_MARKER) else {
        return contains_promise(transcript, token);
    };
    let after = &transcript[i..];
    // The enforcement text itself restates the expected promise.
    let recent = after
        .find("</promise>")
        .map_or(after, |j| &after[j + "</promise>".len()..]);
    contains_promise(recent, token)
}
