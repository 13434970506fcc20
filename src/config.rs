use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

const CONFIG_PATH: &str = ".claude/sisyphus.toml";

/// Whether a plan with no checkboxes at all counts as complete.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmptyPlanPolicy {
    /// An empty plan stays active until someone adds and ticks items.
    #[default]
    Incomplete,
    Complete,
}

/// Project-level configuration from `.claude/sisyphus.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub empty_plan: EmptyPlanPolicy,
    /// Root for session state, below the CLI flag and the environment.
    #[serde(default)]
    pub state_dir: Option<PathBuf>,
    /// Plan document, relative to the project root.
    #[serde(default = "default_plan_path")]
    pub plan_path: PathBuf,
    #[serde(default)]
    pub sandbox: SandboxConfig,
    #[serde(default)]
    pub rules: RulesConfig,
    #[serde(default)]
    pub templates: TemplatesConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SandboxConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RulesConfig {
    /// Also read rules from `~/.claude/rules`.
    #[serde(default = "default_true")]
    pub user_rules: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TemplatesConfig {
    /// Handlebars template for the session-start continuation message.
    #[serde(default)]
    pub boulder_resume: Option<String>,
}

fn default_plan_path() -> PathBuf {
    PathBuf::from(".claude/PLAN.md")
}

fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            empty_plan: EmptyPlanPolicy::default(),
            state_dir: None,
            plan_path: default_plan_path(),
            sandbox: SandboxConfig::default(),
            rules: RulesConfig::default(),
            templates: TemplatesConfig::default(),
        }
    }
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self { user_rules: true }
    }
}

impl Config {
    /// Absolute path of the plan document for `project_root`.
    pub fn plan_document(&self, project_root: &Path) -> PathBuf {
        project_root.join(&self.plan_path)
    }
}

/// Load configuration from `.claude/sisyphus.toml` under `project_root`.
///
/// Falls back to defaults if the file is missing.
pub fn load(project_root: &Path) -> Result<Config> {
    let path = project_root.join(CONFIG_PATH);
    if !path.exists() {
        return Ok(Config::default());
    }
    let contents =
        std::fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
    let config: Config =
        toml::from_str(&contents).with_context(|| format!("parsing {}", path.display()))?;
    Ok(config)
}

/// Like [`load`], but a broken file only costs a warning.
pub fn load_or_default(project_root: &Path) -> Config {
    load(project_root).unwrap_or_else(|e| {
        tracing::warn!(error = ?e, "ignoring unreadable config");
        Config::default()
    })
}

/// Nearest ancestor of `start` (inclusive) that holds `.git` or `.claude`.
///
/// Falls back to `start` itself.
pub fn find_project_root(start: &Path) -> PathBuf {
    start
        .ancestors()
        .find(|dir| dir.join(".git").exists() || dir.join(".claude").exists())
        .unwrap_or(start)
        .to_path_buf()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load(dir.path()).unwrap();
        assert_eq!(config.empty_plan, EmptyPlanPolicy::Incomplete);
        assert_eq!(config.plan_path, PathBuf::from(".claude/PLAN.md"));
        assert!(config.sandbox.enabled);
        assert!(config.rules.user_rules);
        assert!(config.state_dir.is_none());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(".claude")).unwrap();
        std::fs::write(
            dir.path().join(CONFIG_PATH),
            "empty_plan = \"complete\"\n\n[sandbox]\nenabled = false\n",
        )
        .unwrap();
        let config = load(dir.path()).unwrap();
        assert_eq!(config.empty_plan, EmptyPlanPolicy::Complete);
        assert!(!config.sandbox.enabled);
        assert!(config.rules.user_rules);
        assert_eq!(config.plan_document(dir.path()), dir.path().join(".claude/PLAN.md"));
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(".claude")).unwrap();
        std::fs::write(dir.path().join(CONFIG_PATH), "empty_plan = \"sometimes\"").unwrap();
        assert!(load(dir.path()).is_err());
        assert_eq!(load_or_default(dir.path()).empty_plan, EmptyPlanPolicy::Incomplete);
    }

    #[test]
    fn project_root_is_nearest_marked_ancestor() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(".git")).unwrap();
        let nested = dir.path().join("src/deep");
        std::fs::create_dir_all(&nested).unwrap();
        assert_eq!(find_project_root(&nested), dir.path());
    }

    #[test]
    fn template_override() {
        let config: Config = toml::from_str("[templates]\nboulder_resume = \"{{plan_name}}\"\n").unwrap();
        assert_eq!(config.templates.boulder_resume.as_deref(), Some("{{plan_name}}"));
    }
}
