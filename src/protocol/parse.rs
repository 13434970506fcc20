use std::sync::LazyLock;

use anyhow::Result;
use regex::Regex;

use super::types::HookPayload;
use crate::patterns::compile;

/// Parse the hook's stdin into a payload.
///
/// Returns `Ok(None)` for blank input.
/// Returns `Err` for malformed JSON (caller treats it as nothing to do).
pub fn parse_payload(input: &str) -> Result<Option<HookPayload>> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(None);
    }
    let payload: HookPayload = serde_json::from_str(input)?;
    Ok(Some(payload))
}

/// Value of a `--name value` option in a free-form argument string.
///
/// The value is either a quoted string (quotes stripped) or the next
/// whitespace-delimited word, as long as that word is not another `--option`.
pub fn extract_arg_value<'a>(args: &'a str, name: &str) -> Option<&'a str> {
    let pattern = format!(r#"--{}\s+(?:"([^"]*)"|'([^']*)'|((?:[^-\s]|-[^-\s])\S*))"#, regex::escape(name));
    let re = Regex::new(&pattern).ok()?;
    let caps = re.captures(args)?;
    caps.get(1)
        .or_else(|| caps.get(2))
        .or_else(|| caps.get(3))
        .map(|m| m.as_str())
}

static OPTION_WITH_VALUE: LazyLock<Regex> =
    LazyLock::new(|| compile(r#"--[A-Za-z][\w-]*(?:\s+(?:"[^"]*"|'[^']*'|[^-\s]\S*))?"#));

static QUOTED: LazyLock<Regex> = LazyLock::new(|| compile(r#""([^"]*)""#));

/// The positional text of an argument string: the first double-quoted
/// string outside any `--option value` pair, else whatever free text remains.
pub fn positional_text(args: &str) -> String {
    let rest = OPTION_WITH_VALUE.replace_all(args, " ");
    if let Some(caps) = QUOTED.captures(&rest) {
        return caps[1].trim().to_string();
    }
    rest.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn parse_blank_input() {
        assert!(parse_payload("").unwrap().is_none());
        assert!(parse_payload("  \n").unwrap().is_none());
    }

    #[test]
    fn parse_malformed_is_error() {
        assert!(parse_payload("{not json").is_err());
        assert!(parse_payload("[1, 2]").is_err());
    }

    #[test]
    fn unknown_fields_dont_crash() {
        let line = r#"{"tool_name":"Bash","tool_input":{"command":"ls"},"hook_event_name":"PreToolUse","permission_mode":"default"}"#;
        let payload = parse_payload(line).unwrap().unwrap();
        assert_eq!(payload.tool_name, "Bash");
    }

    #[test]
    fn arg_value_bare_and_quoted() {
        let args = r#""fix tests" --max-iterations 30 --completion-promise "ALL GREEN""#;
        assert_eq!(extract_arg_value(args, "max-iterations"), Some("30"));
        assert_eq!(extract_arg_value(args, "completion-promise"), Some("ALL GREEN"));
    }

    #[test]
    fn arg_value_single_quoted() {
        assert_eq!(
            extract_arg_value("--completion-promise 'DONE'", "completion-promise"),
            Some("DONE")
        );
    }

    #[test]
    fn arg_value_missing() {
        assert_eq!(extract_arg_value("--max-iterations", "max-iterations"), None);
        assert_eq!(extract_arg_value("task only", "max-iterations"), None);
    }

    #[test]
    fn arg_value_is_not_the_next_option() {
        let args = r#""t" --completion-promise --max-iterations 5"#;
        assert_eq!(extract_arg_value(args, "completion-promise"), None);
        assert_eq!(extract_arg_value(args, "max-iterations"), Some("5"));
        assert_eq!(extract_arg_value("--max-iterations -3", "max-iterations"), Some("-3"));
    }

    #[test]
    fn positional_prefers_quoted_task() {
        let args = r#"--max-iterations 5 "port the parser" --completion-promise "DONE""#;
        assert_eq!(positional_text(args), "port the parser");
    }

    #[test]
    fn positional_falls_back_to_free_text() {
        assert_eq!(
            positional_text("refactor the cache --max-iterations 5 --completion-promise OK"),
            "refactor the cache"
        );
    }

    #[test]
    fn positional_empty() {
        assert_eq!(positional_text("--max-iterations 5"), "");
    }
}
