use std::fmt;
use std::path::Path;

use sha2::{Digest, Sha256};

/// Number of hex characters kept from the digest.
const KEY_LEN: usize = 12;

/// Opaque identifier shared by every hook process of one interactive session.
///
/// Derived from the controlling terminal (the `TTY` environment variable) and
/// the working directory. This is the only derivation used anywhere in the
/// crate: a flag written under one key must be visible to every check that
/// runs in the same session.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionKey(String);

impl SessionKey {
    /// Derive a key from a terminal identity and a working directory.
    pub fn derive(tty: &str, cwd: &Path) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(format!("{tty}:{}", cwd.display()).as_bytes());
        let digest = hex::encode(hasher.finalize());
        Self(digest[..KEY_LEN].to_string())
    }

    /// Derive the key for the current process environment.
    ///
    /// An unset `TTY` hashes as the empty string; an unreadable working
    /// directory hashes as the empty path.
    pub fn from_env() -> Self {
        let tty = std::env::var("TTY").unwrap_or_default();
        let cwd = std::env::current_dir().unwrap_or_default();
        Self::derive(&tty, &cwd)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
