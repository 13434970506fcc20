//! Advisory content checks run while a workflow is active.
//!
//! Every detector is a pure function of the text it is given. The patterns
//! are heuristics; findings become warnings and never block a tool call.

use std::fmt::Write as _;

pub mod dev;
pub mod ds;
pub mod writing;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub name: String,
    pub fix: String,
}

impl Finding {
    pub fn new(name: impl Into<String>, fix: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fix: fix.into(),
        }
    }
}

/// Findings from one detector under a heading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub title: &'static str,
    pub findings: Vec<Finding>,
}

impl Report {
    /// `None` when there is nothing to report.
    pub fn new(title: &'static str, findings: Vec<Finding>) -> Option<Self> {
        (!findings.is_empty()).then_some(Self { title, findings })
    }

    pub fn render(&self) -> String {
        let mut out = format!("⚠️  {}\n", self.title);
        for f in &self.findings {
            let _ = write!(out, "\n  • {}: {}", f.name, f.fix);
        }
        out
    }
}

/// Join several reports into the single message a hook may emit.
pub fn combine(reports: &[Report]) -> Option<String> {
    if reports.is_empty() {
        return None;
    }
    let sections: Vec<String> = reports.iter().map(Report::render).collect();
    Some(sections.join("\n\n"))
}

/// Cut `text` to at most `max` characters, marking the cut.
pub(crate) fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((i, _)) => format!("{}...", &text[..i]),
        None => text.to_string(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn empty_findings_make_no_report() {
        assert_eq!(Report::new("X", Vec::new()), None);
        assert_eq!(combine(&[]), None);
    }

    #[test]
    fn reports_are_concatenated() {
        let a = Report::new("FIRST", vec![Finding::new("a", "fix a")]);
        let b = Report::new("SECOND", vec![Finding::new("b", "fix b"), Finding::new("c", "fix c")]);
        let reports: Vec<Report> = a.into_iter().chain(b).collect();
        let text = combine(&reports).unwrap();
        insta::assert_snapshot!(text, @r"
        ⚠️  FIRST

          • a: fix a

        ⚠️  SECOND

          • b: fix b
          • c: fix c
        ");
    }

    #[test]
    fn truncation() {
        assert_eq!(truncate("abcdef", 3), "abc...");
        assert_eq!(truncate("abc", 3), "abc");
        assert_eq!(truncate("ééé", 2), "éé...");
    }
}
