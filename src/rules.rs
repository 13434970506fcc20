//! Rule files injected as context when the agent touches matching files.
//!
//! A rule is a markdown file with optional YAML frontmatter:
//!
//! ```text
//! ---
//! applies_to:
//!   - "**/*.rs"
//! priority: 20
//! tags: [style]
//! ---
//! Prefer `?` over explicit matches on `Result`.
//! ```
//!
//! A rule without `applies_to` applies to every file. Each rule is injected
//! at most once per session, keyed by a hash of its contents.

use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::state::{SessionState, StateError};

/// Relative path from project root to the project rules directory.
pub const RULES_DIR: &str = ".claude/rules";

/// Instructions file that always applies when present.
pub const COPILOT_INSTRUCTIONS: &str = ".github/copilot-instructions.md";

/// Session blob listing the hashes of rules already injected.
pub const INJECTED_BLOB: &str = "rules_injected";

pub const DEFAULT_PRIORITY: f64 = 10.0;

const HASH_LEN: usize = 16;

#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    #[error("failed to read rule file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("rule file {} is missing the closing `---` frontmatter delimiter", .path.display())]
    UnclosedFrontmatter { path: PathBuf },
    #[error("invalid frontmatter in {}: {source}", .path.display())]
    Frontmatter {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("invalid applies_to pattern {pattern:?} in {}: {source}", .path.display())]
    Pattern {
        path: PathBuf,
        pattern: String,
        #[source]
        source: glob::PatternError,
    },
}

/// YAML frontmatter of a rule file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RuleFrontmatter {
    /// Globs matched against the touched file's path relative to the project.
    /// A single string is read as a one-element list.
    #[serde(default, deserialize_with = "one_or_many")]
    pub applies_to: Option<Vec<String>>,
    #[serde(default)]
    pub priority: Option<f64>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

fn one_or_many<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Vec<String>>, D::Error> {
    Ok(
        Option::<OneOrMany>::deserialize(deserializer)?.map(|globs| match globs {
            OneOrMany::One(glob) => vec![glob],
            OneOrMany::Many(globs) => globs,
        }),
    )
}

/// A fully loaded rule file.
#[derive(Debug, Clone)]
pub struct Rule {
    pub path: PathBuf,
    pub frontmatter: RuleFrontmatter,
    pub body: String,
    /// Truncated SHA-256 of the raw file contents.
    pub hash: String,
    patterns: Option<Vec<glob::Pattern>>,
}

/// Split `---` frontmatter from the body.
///
/// Returns `Ok(None)` when the file has no frontmatter at all.
fn split_frontmatter(contents: &str) -> Result<Option<(&str, &str)>, ()> {
    let trimmed = contents.trim_start();
    let Some(after_first) = trimmed.strip_prefix("---") else {
        return Ok(None);
    };
    let after_first = after_first.strip_prefix('\n').unwrap_or(after_first);
    if let Some(rest) = after_first.strip_prefix("---") {
        return Ok(Some(("", rest)));
    }
    let Some(end_idx) = after_first.find("\n---") else {
        return Err(());
    };
    let yaml = &after_first[..end_idx];
    let rest = &after_first[end_idx + 4..]; // skip "\n---"
    Ok(Some((yaml, rest)))
}

pub fn content_hash(contents: &[u8]) -> String {
    let digest = hex::encode(Sha256::digest(contents));
    digest[..HASH_LEN].to_string()
}

impl Rule {
    /// Parse a rule from its file contents.
    pub fn parse(path: &Path, contents: &str) -> Result<Self, RuleError> {
        let (frontmatter, body) = match split_frontmatter(contents) {
            Ok(None) => (RuleFrontmatter::default(), contents),
            Ok(Some((yaml, body))) if yaml.trim().is_empty() => (RuleFrontmatter::default(), body),
            Ok(Some((yaml, body))) => {
                let frontmatter =
                    serde_yaml::from_str(yaml).map_err(|source| RuleError::Frontmatter {
                        path: path.to_path_buf(),
                        source,
                    })?;
                (frontmatter, body)
            }
            Err(()) => {
                return Err(RuleError::UnclosedFrontmatter {
                    path: path.to_path_buf(),
                });
            }
        };

        let patterns = frontmatter
            .applies_to
            .as_ref()
            .map(|globs| {
                globs
                    .iter()
                    .map(|g| {
                        glob::Pattern::new(g).map_err(|source| RuleError::Pattern {
                            path: path.to_path_buf(),
                            pattern: g.clone(),
                            source,
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()
            })
            .transpose()?;

        Ok(Self {
            path: path.to_path_buf(),
            frontmatter,
            body: body.trim().to_string(),
            hash: content_hash(contents.as_bytes()),
            patterns,
        })
    }

    /// Load a single rule from a `.md` file.
    pub fn load(path: &Path) -> Result<Self, RuleError> {
        let contents = fs::read_to_string(path).map_err(|source| RuleError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(path, &contents)
    }

    pub fn priority(&self) -> f64 {
        self.frontmatter.priority.unwrap_or(DEFAULT_PRIORITY)
    }

    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map_or_else(String::new, |n| n.to_string_lossy().into_owned())
    }

    /// Whether the rule applies to `relative_path`.
    pub fn applies_to(&self, relative_path: &str) -> bool {
        match &self.patterns {
            None => true,
            Some(patterns) => patterns.iter().any(|p| p.matches(relative_path)),
        }
    }
}

// ── Discovery ───────────────────────────────────────────────────────────

fn markdown_files(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut files: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("md"))
        .collect();
    files.sort();
    files
}

/// Rule files in discovery order: the copilot instructions, the project's
/// rules, then the user's rules.
pub fn discover(project_root: &Path, user_rules_dir: Option<&Path>) -> Vec<PathBuf> {
    let mut files = Vec::new();
    let instructions = project_root.join(COPILOT_INSTRUCTIONS);
    if instructions.is_file() {
        files.push(instructions);
    }
    files.extend(markdown_files(&project_root.join(RULES_DIR)));
    if let Some(dir) = user_rules_dir {
        files.extend(markdown_files(dir));
    }
    files
}

/// The user's own rules under `home`.
pub fn user_rules_dir(home: &Path) -> PathBuf {
    home.join(".claude/rules")
}

/// Load every discovered rule. Unreadable or malformed rules are skipped
/// with a warning.
pub fn load_all(paths: &[PathBuf]) -> Vec<Rule> {
    paths
        .iter()
        .filter_map(|path| match Rule::load(path) {
            Ok(rule) => Some(rule),
            Err(e) => {
                warn!(error = %e, "skipping rule file");
                None
            }
        })
        .collect()
}

/// The path used for glob matching: relative to the project when inside it.
pub fn match_path(file_path: &Path, project_root: &Path) -> String {
    file_path
        .strip_prefix(project_root)
        .unwrap_or(file_path)
        .to_string_lossy()
        .into_owned()
}

/// Rules to inject for `relative_path`, highest priority first. Rules with
/// equal priority keep discovery order.
pub fn select<'r>(rules: &'r [Rule], relative_path: &str, injected: &BTreeSet<String>) -> Vec<&'r Rule> {
    let mut selected: Vec<&Rule> = rules
        .iter()
        .filter(|r| !injected.contains(&r.hash) && r.applies_to(relative_path))
        .collect();
    selected.sort_by(|a, b| b.priority().total_cmp(&a.priority()));
    // Identical files reached twice (e.g. a symlinked user dir) inject once.
    let mut seen = BTreeSet::new();
    selected.retain(|r| seen.insert(r.hash.clone()));
    selected
}

pub fn render(rules: &[&Rule]) -> String {
    let sections: Vec<String> = rules
        .iter()
        .map(|r| format!("# Rule from {}\n\n{}", r.name(), r.body))
        .collect();
    format!(
        "The following rules apply to this file:\n\n{}",
        sections.join("\n\n---\n\n")
    )
}

// ── Session dedupe ──────────────────────────────────────────────────────

/// Hashes of rules already injected in the session.
pub fn injected(state: &dyn SessionState) -> BTreeSet<String> {
    state
        .read_text(INJECTED_BLOB)
        .map(|text| text.lines().map(str::to_string).collect())
        .unwrap_or_default()
}

pub fn mark_injected<'r>(
    state: &dyn SessionState,
    mut already: BTreeSet<String>,
    rules: impl IntoIterator<Item = &'r Rule>,
) -> Result<(), StateError> {
    already.extend(rules.into_iter().map(|r| r.hash.clone()));
    let text: Vec<&str> = already.iter().map(String::as_str).collect();
    state.write_text(INJECTED_BLOB, &text.join("\n"))
}

/// Rule context for a touched file, or `None` when nothing new applies.
///
/// Newly injected rules are remembered for the session.
pub fn inject_for_file(
    state: &dyn SessionState,
    project_root: &Path,
    file_path: &Path,
    user_rules_dir: Option<&Path>,
) -> Option<String> {
    let paths = discover(project_root, user_rules_dir);
    if paths.is_empty() {
        return None;
    }
    let rules = load_all(&paths);
    let relative = match_path(file_path, project_root);
    let already = injected(state);
    let selected = select(&rules, &relative, &already);
    if selected.is_empty() {
        return None;
    }
    debug!(count = selected.len(), file = %relative, "injecting rules");
    let text = render(&selected);
    if let Err(e) = mark_injected(state, already, selected.iter().copied()) {
        warn!(error = %e, "failed to record injected rules");
    }
    Some(text)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::state::MemorySessionState;

    fn write(dir: &Path, rel: &str, contents: &str) -> PathBuf {
        let path = dir.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn parse_frontmatter_and_body() {
        let rule = Rule::parse(
            Path::new("python.md"),
            "---\napplies_to:\n  - \"**/*.py\"\npriority: 20\ntags: [style]\n---\n\nUse type hints.\n",
        )
        .unwrap();
        assert_eq!(rule.priority(), 20.0);
        assert_eq!(rule.frontmatter.tags, vec!["style"]);
        assert_eq!(rule.body, "Use type hints.");
        assert!(rule.applies_to("src/app.py"));
        assert!(rule.applies_to("app.py"));
        assert!(!rule.applies_to("src/app.rs"));
        assert_eq!(rule.hash.len(), 16);
    }

    #[test]
    fn no_frontmatter_always_applies() {
        let rule = Rule::parse(Path::new("x.md"), "Be kind.\n").unwrap();
        assert_eq!(rule.priority(), DEFAULT_PRIORITY);
        assert!(rule.applies_to("anything/at/all.txt"));
        assert_eq!(rule.body, "Be kind.");
    }

    #[test]
    fn empty_frontmatter() {
        let rule = Rule::parse(Path::new("x.md"), "---\n---\nBody\n").unwrap();
        assert!(rule.applies_to("a"));
        assert_eq!(rule.body, "Body");
    }

    #[test]
    fn malformed_frontmatter_is_an_error() {
        let err = Rule::parse(Path::new("x.md"), "---\napplies_to: [\n---\nBody").unwrap_err();
        assert!(matches!(err, RuleError::Frontmatter { .. }));
        let err = Rule::parse(Path::new("x.md"), "---\npriority: 1\nno close").unwrap_err();
        assert!(matches!(err, RuleError::UnclosedFrontmatter { .. }));
    }

    #[test]
    fn scalar_applies_to_is_one_glob() {
        let rule = Rule::parse(
            Path::new("x.md"),
            "---\napplies_to: \"**/*.py\"\n---\nUse hints.",
        )
        .unwrap();
        assert_eq!(rule.frontmatter.applies_to, Some(vec!["**/*.py".to_string()]));
        assert!(rule.applies_to("src/app.py"));
        assert!(!rule.applies_to("src/app.rs"));
    }

    #[test]
    fn discovery_order() {
        let project = tempfile::tempdir().unwrap();
        let user = tempfile::tempdir().unwrap();
        write(project.path(), ".claude/rules/b.md", "b");
        write(project.path(), ".claude/rules/a.md", "a");
        write(project.path(), ".claude/rules/notes.txt", "ignored");
        write(project.path(), COPILOT_INSTRUCTIONS, "copilot");
        write(user.path(), "u.md", "u");

        let names: Vec<String> = discover(project.path(), Some(user.path()))
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["copilot-instructions.md", "a.md", "b.md", "u.md"]);
        assert_eq!(discover(project.path(), None).len(), 3);
    }

    #[test]
    fn selection_sorts_by_priority() {
        let low = Rule::parse(Path::new("low.md"), "---\npriority: 1\n---\nlow").unwrap();
        let default = Rule::parse(Path::new("default.md"), "default").unwrap();
        let high = Rule::parse(Path::new("high.md"), "---\npriority: 50\n---\nhigh").unwrap();
        let rules = vec![low, default, high];
        let names: Vec<String> = select(&rules, "x.rs", &BTreeSet::new())
            .iter()
            .map(|r| r.name())
            .collect();
        assert_eq!(names, vec!["high.md", "default.md", "low.md"]);
    }

    #[test]
    fn injected_once_per_session() {
        let project = tempfile::tempdir().unwrap();
        write(
            project.path(),
            ".claude/rules/rust.md",
            "---\napplies_to:\n  - \"**/*.rs\"\n---\nNo unwrap.\n",
        );
        write(project.path(), ".claude/rules/general.md", "Small commits.\n");
        let state = MemorySessionState::default();
        let file = project.path().join("src/lib.rs");

        let first = inject_for_file(&state, project.path(), &file, None).unwrap();
        assert!(first.contains("# Rule from general.md\n\nSmall commits."));
        assert!(first.contains("# Rule from rust.md\n\nNo unwrap."));

        assert_eq!(inject_for_file(&state, project.path(), &file, None), None);
        assert_eq!(injected(&state).len(), 2);
    }

    #[test]
    fn non_matching_file_injects_only_unscoped_rules() {
        let project = tempfile::tempdir().unwrap();
        write(
            project.path(),
            ".claude/rules/rust.md",
            "---\napplies_to:\n  - \"**/*.rs\"\n---\nNo unwrap.\n",
        );
        let state = MemorySessionState::default();
        let readme = project.path().join("README.md");
        assert_eq!(inject_for_file(&state, project.path(), &readme, None), None);
        assert!(injected(&state).is_empty());
    }

    #[test]
    fn broken_rule_is_skipped() {
        let project = tempfile::tempdir().unwrap();
        write(project.path(), ".claude/rules/broken.md", "---\npriority: [\n---\nx");
        write(project.path(), ".claude/rules/ok.md", "fine");
        let state = MemorySessionState::default();
        let text = inject_for_file(&state, project.path(), &project.path().join("a"), None).unwrap();
        assert!(text.contains("ok.md"));
        assert!(!text.contains("broken.md"));
    }
}
