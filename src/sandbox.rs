//! Dangerous-operation guard applied while `dev_mode` is on.

use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use crate::patterns::compile_ci;
use crate::protocol::ToolCall;

static BLOCKED_COMMANDS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    vec![
        (compile_ci(r"rm\s+-rf\s+/"), "recursive delete from /"),
        (compile_ci(r"sudo\s+rm"), "sudo rm"),
        (compile_ci(r">\s*/dev/sd"), "redirect onto a block device"),
        (compile_ci(r"mkfs\."), "filesystem format"),
        (compile_ci(r"dd\s+if=.+of=/dev"), "dd onto a device"),
    ]
});

const PROTECTED_SYSTEM: &[&str] = &["/etc/", "/usr/", "/bin/", "/sbin/"];
const PROTECTED_HOME: &[&str] = &[".ssh", ".gnupg"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    DangerousCommand(&'static str),
    ProtectedPath(PathBuf),
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::DangerousCommand(what) => {
                write!(f, "Blocked: dangerous command pattern ({what})")
            }
            Violation::ProtectedPath(p) => {
                write!(f, "Blocked: cannot write to protected path {}", p.display())
            }
        }
    }
}

pub fn check_command(command: &str) -> Option<Violation> {
    BLOCKED_COMMANDS
        .iter()
        .find(|(re, _)| re.is_match(command))
        .map(|(_, what)| Violation::DangerousCommand(*what))
}

/// Resolve `~`, relative segments and `..` without touching the filesystem.
fn normalize(path: &str, home: Option<&Path>, cwd: &Path) -> PathBuf {
    let expanded = match (path.strip_prefix("~/"), home) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    };
    let absolute = if expanded.is_absolute() {
        expanded
    } else {
        cwd.join(expanded)
    };
    let mut out = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::ParentDir => {
                out.pop();
            }
            Component::CurDir => {}
            other => out.push(other),
        }
    }
    out
}

pub fn check_write(file_path: &str, home: Option<&Path>, cwd: &Path) -> Option<Violation> {
    let target = normalize(file_path, home, cwd);
    let system = PROTECTED_SYSTEM
        .iter()
        .map(PathBuf::from)
        .find(|dir| target.starts_with(dir));
    let personal = home.and_then(|h| {
        PROTECTED_HOME
            .iter()
            .map(|d| h.join(d))
            .find(|dir| target.starts_with(dir))
    });
    system.or(personal).map(Violation::ProtectedPath)
}

/// The violation `call` would commit, if any.
pub fn check(call: &ToolCall, home: Option<&Path>, cwd: &Path) -> Option<Violation> {
    match call {
        ToolCall::Bash(b) => check_command(&b.command),
        ToolCall::Write(w) => check_write(&w.file_path, home, cwd),
        ToolCall::Edit(e) => check_write(&e.file_path, home, cwd),
        _ => None,
    }
}
