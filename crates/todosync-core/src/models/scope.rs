//! Logical document scopes and storage modes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A logical document synced independently of the others.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentScope {
    /// Todos that follow the user across every workspace.
    User,
    /// Todos for the current workspace, grouped per file path.
    Workspace,
}

impl DocumentScope {
    pub const ALL: [Self; 2] = [Self::User, Self::Workspace];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Workspace => "workspace",
        }
    }
}

impl fmt::Display for DocumentScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "user" => Ok(Self::User),
            "workspace" => Ok(Self::Workspace),
            other => Err(format!("unknown scope '{other}' (expected user or workspace)")),
        }
    }
}

/// Where todos live. Each mode has isolated cache storage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncMode {
    /// Kept on this machine only; no remote I/O.
    #[default]
    Local,
    /// Synced with the configured remote document.
    Remote,
}

impl SyncMode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Remote => "remote",
        }
    }
}

impl fmt::Display for SyncMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "remote" => Ok(Self::Remote),
            other => Err(format!("unknown mode '{other}' (expected local or remote)")),
        }
    }
}
