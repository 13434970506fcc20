use regex::{Regex, RegexBuilder};

/// Compile a pattern written into the source.
pub(crate) fn compile(pattern: &'static str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| unreachable!("invalid built-in pattern {pattern:?}: {e}"))
}

/// Case-insensitive, multi-line variant of [`compile`].
pub(crate) fn compile_ci(pattern: &'static str) -> Regex {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .multi_line(true)
        .build()
        .unwrap_or_else(|e| unreachable!("invalid built-in pattern {pattern:?}: {e}"))
}
