//! Writing workflow checks: phrasing typical of machine-generated prose.
//!
//! Critical and high-severity phrases are always reported. Medium patterns
//! are structural and common in human prose too, so they only count when at
//! least two different ones appear.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use super::{Finding, Report};
use crate::patterns::compile_ci;

pub const TITLE: &str = "AI WRITING ANTI-PATTERNS: revise before proceeding";

/// Shorter text is unlikely to be prose.
pub const MIN_PROSE_CHARS: usize = 100;

const CODE_EXTENSIONS: &[&str] = &[
    "py", "js", "ts", "sh", "json", "yaml", "yml", "toml", "css", "html", "sql", "rs",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Critical,
    High,
    Medium,
}

impl Severity {
    fn label(self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
        }
    }
}

struct Phrase {
    regex: Regex,
    severity: Severity,
    name: &'static str,
    fix: &'static str,
}

fn phrase(severity: Severity, pattern: &'static str, name: &'static str, fix: &'static str) -> Phrase {
    Phrase {
        regex: compile_ci(pattern),
        severity,
        name,
        fix,
    }
}

static PHRASES: LazyLock<Vec<Phrase>> = LazyLock::new(|| {
    use Severity::{Critical, High, Medium};
    vec![
        phrase(Critical, r"turn\d+search\d+", "ChatGPT search artifact", "remove completely"),
        phrase(Critical, r"oaicite:\d+", "ChatGPT citation placeholder", "remove or replace with a real citation"),
        phrase(Critical, r"contentReference\[", "ChatGPT content reference", "remove completely"),
        phrase(Critical, r"As an AI(?: language model)?", "AI self-reference", "remove and rewrite naturally"),
        phrase(Critical, r"I hope this (?:helps|email finds you)", "AI sign-off phrase", "remove or use a natural closing"),
        phrase(Critical, r"I cannot provide", "AI refusal phrase", "rewrite the content appropriately"),
        phrase(Critical, r"(?:Let me|Allow me to) (?:help|assist|explain)", "AI preamble", "start with substance instead"),
        phrase(High, r"\bstands as\b", "\"stands as\"", "use \"shows\" or be specific"),
        phrase(High, r"\bplays a (?:vital|crucial|pivotal|key) role\b", "\"plays a vital role\"", "state the effect directly"),
        phrase(High, r"\brich tapestry\b", "\"rich tapestry\"", "describe what it contains"),
        phrase(High, r"\bnestled (?:in|among)\b", "\"nestled\"", "use \"in\" or \"located in\""),
        phrase(High, r"\bit'?s important to note\b", "\"it's important to note\"", "just state the important thing"),
        phrase(High, r"\bdelves? into\b", "\"delves into\"", "use \"examines\" or \"covers\""),
        phrase(High, r"\blandscape of\b", "\"landscape of\"", "be specific about what you mean"),
        phrase(High, r"\bin conclusion\b", "\"in conclusion\"", "conclude without announcing it"),
        phrase(High, r"\bgroundbreaking\b", "\"groundbreaking\"", "describe what it actually does"),
        phrase(High, r"\btransformative\b", "\"transformative\"", "show the change with evidence"),
        phrase(High, r"\bcut(?:ting)?-edge\b", "\"cutting-edge\"", "name the technology or approach"),
        phrase(High, r"\bunprecedented\b", "\"unprecedented\"", "compare to what came before"),
        phrase(High, r"\bseamlessly\b", "\"seamlessly\"", "describe how it actually works"),
        phrase(High, r"\bleverag(?:e|es|ed|ing)\b", "\"leverage\"", "use \"use\""),
        phrase(High, r"\bsynerg(?:y|ies|istic)\b", "\"synergy\"", "describe the actual combination"),
        phrase(High, r"\bholistic\b", "\"holistic\"", "say which aspects"),
        phrase(High, r"\bparadigm\b", "\"paradigm\"", "use simpler, more specific language"),
        phrase(Medium, r"\bDespite (?:these |the )?challenges?\b", "\"Despite challenges\" formula", "state reality directly"),
        phrase(Medium, r"\bHowever,.*\. Nevertheless,", "Negative parallelism", "combine or rephrase"),
        phrase(Medium, r"\bIn summary\b", "\"In summary\"", "summarize without announcing"),
        phrase(Medium, r"\bTo summarize\b", "\"To summarize\"", "summarize without announcing"),
        phrase(Medium, r"\bFirstly\b.*\bSecondly\b.*\bThirdly\b", "Rule of three", "use a natural count"),
        phrase(Medium, r"\bsome experts (?:say|believe|argue)\b", "Weasel wording", "cite specific sources"),
        phrase(Medium, r"\bit is (?:widely )?believed\b", "Weasel wording", "cite specific sources"),
        phrase(Medium, r"\bmany (?:people|experts|researchers) (?:say|believe)\b", "Weasel wording", "cite specific sources"),
    ]
});

fn is_code_file(file_path: &str) -> bool {
    Path::new(file_path)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| CODE_EXTENSIONS.iter().any(|c| ext.eq_ignore_ascii_case(c)))
}

/// Findings for prose written to `file_path`.
pub fn check(file_path: &str, text: &str) -> Vec<Finding> {
    if text.chars().count() < MIN_PROSE_CHARS || is_code_file(file_path) {
        return Vec::new();
    }
    let hits: Vec<&Phrase> = PHRASES.iter().filter(|p| p.regex.is_match(text)).collect();
    let medium_count = hits.iter().filter(|p| p.severity == Severity::Medium).count();

    hits.into_iter()
        .filter(|p| p.severity != Severity::Medium || medium_count >= 2)
        .map(|p| Finding::new(format!("[{}] {}", p.severity.label(), p.name), p.fix))
        .collect()
}

pub fn check_content(file_path: &str, text: &str) -> Vec<Report> {
    Report::new(TITLE, check(file_path, text)).into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const FILLER: &str = "The committee met on Tuesday to review the budget for next year and agreed on three changes. ";

    fn names(path: &str, text: &str) -> Vec<String> {
        check(path, text).into_iter().map(|f| f.name).collect()
    }

    #[test]
    fn short_text_is_ignored() {
        assert!(names("a.md", "As an AI language model").is_empty());
    }

    #[test]
    fn critical_and_high_always_reported() {
        let text = format!("{FILLER}As an AI, I think this delves into the budget.");
        assert_eq!(
            names("notes.md", &text),
            vec!["[critical] AI self-reference", "[high] \"delves into\""]
        );
    }

    #[test]
    fn single_medium_is_tolerated() {
        let text = format!("{FILLER}In summary, the budget grows.");
        assert!(names("notes.md", &text).is_empty());
    }

    #[test]
    fn two_mediums_are_reported() {
        let text = format!("{FILLER}Despite challenges, it is widely believed the budget grows.");
        assert_eq!(
            names("notes.md", &text),
            vec![
                "[medium] \"Despite challenges\" formula",
                "[medium] Weasel wording"
            ]
        );
    }

    #[test]
    fn code_files_are_skipped() {
        let text = format!("{FILLER}As an AI, this is groundbreaking.");
        assert!(names("script.py", &text).is_empty());
        assert!(!names("draft.tex", &text).is_empty());
    }
}
