//! Sync settings.
//!
//! `SyncSettings` is persisted as JSON by the front-end and can be
//! overridden from the environment. Values are normalized on load and save:
//! the poll interval is clamped into its allowed range and blank strings are
//! treated as unset.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::models::{DocumentScope, SyncMode};
use crate::util::non_blank;
use crate::{Error, Result};

pub const MIN_POLL_INTERVAL_SECS: u64 = 30;
pub const MAX_POLL_INTERVAL_SECS: u64 = 600;
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_DEBOUNCE_MS: u64 = 3000;

pub const DEFAULT_USER_FILE_NAME: &str = "todos.json";
pub const DEFAULT_WORKSPACE_FILE_NAME: &str = "workspace-todos.json";

pub const ENV_GIST_ID: &str = "TODOSYNC_GIST_ID";
pub const ENV_MODE: &str = "TODOSYNC_MODE";
pub const ENV_POLL_INTERVAL_SECS: &str = "TODOSYNC_POLL_INTERVAL_SECS";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct SyncSettings {
    pub mode: SyncMode,
    /// Remote document id. Required in remote mode.
    pub gist_id: Option<String>,
    pub poll_interval_secs: u64,
    pub debounce_ms: u64,
    /// Scopes that take part in syncing.
    pub scopes: BTreeSet<DocumentScope>,
    /// Remote file name per scope; missing entries use the defaults.
    pub file_names: BTreeMap<DocumentScope, String>,
    /// Override for the GitHub API base URL.
    pub api_base_url: Option<String>,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            mode: SyncMode::default(),
            gist_id: None,
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            scopes: DocumentScope::ALL.into_iter().collect(),
            file_names: BTreeMap::new(),
            api_base_url: None,
        }
    }
}

/// Clamp a poll interval into the allowed range.
pub fn clamp_poll_interval_secs(secs: u64) -> u64 {
    secs.clamp(MIN_POLL_INTERVAL_SECS, MAX_POLL_INTERVAL_SECS)
}

pub const fn default_file_name(scope: DocumentScope) -> &'static str {
    match scope {
        DocumentScope::User => DEFAULT_USER_FILE_NAME,
        DocumentScope::Workspace => DEFAULT_WORKSPACE_FILE_NAME,
    }
}

impl SyncSettings {
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path).map_err(|error| {
            Error::Config(format!(
                "Failed to read settings at {}: {}",
                path.display(),
                error
            ))
        })?;
        let mut settings = serde_json::from_str::<Self>(&raw).map_err(|error| {
            Error::Config(format!(
                "Failed to parse settings at {}: {}",
                path.display(),
                error
            ))
        })?;
        settings.normalize();
        Ok(settings)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|error| {
                Error::Config(format!(
                    "Failed to create settings directory {}: {}",
                    parent.display(),
                    error
                ))
            })?;
        }

        let mut normalized = self.clone();
        normalized.normalize();
        let serialized = serde_json::to_string_pretty(&normalized)?;
        std::fs::write(path, serialized).map_err(|error| {
            Error::Config(format!(
                "Failed to write settings at {}: {}",
                path.display(),
                error
            ))
        })
    }

    /// Apply overrides from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    /// Apply overrides from `lookup`. Unparseable values are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(gist_id) = non_blank(lookup(ENV_GIST_ID)) {
            self.gist_id = Some(gist_id);
        }
        if let Some(mode) = non_blank(lookup(ENV_MODE)) {
            match mode.parse::<SyncMode>() {
                Ok(mode) => self.mode = mode,
                Err(error) => tracing::warn!("Ignoring {}: {}", ENV_MODE, error),
            }
        }
        if let Some(secs) = non_blank(lookup(ENV_POLL_INTERVAL_SECS)) {
            match secs.parse::<u64>() {
                Ok(secs) => self.poll_interval_secs = secs,
                Err(error) => tracing::warn!("Ignoring {}: {}", ENV_POLL_INTERVAL_SECS, error),
            }
        }
        self.normalize();
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(clamp_poll_interval_secs(self.poll_interval_secs))
    }

    pub const fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn gist_id(&self) -> Option<String> {
        non_blank(self.gist_id.clone())
    }

    pub fn file_name(&self, scope: DocumentScope) -> String {
        self.file_names
            .get(&scope)
            .and_then(|name| non_blank(Some(name.clone())))
            .unwrap_or_else(|| default_file_name(scope).to_string())
    }

    pub fn is_enabled(&self, scope: DocumentScope) -> bool {
        self.scopes.contains(&scope)
    }

    pub fn enabled_scopes(&self) -> Vec<DocumentScope> {
        self.scopes.iter().copied().collect()
    }

    fn normalize(&mut self) {
        self.gist_id = non_blank(self.gist_id.take());
        self.api_base_url = non_blank(self.api_base_url.take());
        self.poll_interval_secs = clamp_poll_interval_secs(self.poll_interval_secs);
        self.file_names
            .retain(|_, name| non_blank(Some(name.clone())).is_some());
        for name in self.file_names.values_mut() {
            *name = name.trim().to_string();
        }
    }
}
