//! Where the CLI keeps its settings and cache, and how they are loaded.

use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use todosync_core::cache::{CacheStore, FileCacheBackend};
use todosync_core::config::SyncSettings;
use todosync_core::models::SyncMode;
use todosync_core::DocumentScope;

use crate::error::CliError;

const SETTINGS_FILE_NAME: &str = "settings.json";
const CACHE_DIR_NAME: &str = "cache";
const DATA_DIR_ENV: &str = "TODOSYNC_DATA_DIR";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliPaths {
    pub settings_file: PathBuf,
    pub cache_dir: PathBuf,
}

impl CliPaths {
    /// Paths under an explicit data directory.
    pub fn under(dir: &Path) -> Self {
        Self {
            settings_file: dir.join(SETTINGS_FILE_NAME),
            cache_dir: dir.join(CACHE_DIR_NAME),
        }
    }

    /// `--data-dir`, then `TODOSYNC_DATA_DIR`, then the platform defaults.
    pub fn resolve(cli_data_dir: Option<PathBuf>) -> Self {
        if let Some(dir) = cli_data_dir.or_else(|| env::var_os(DATA_DIR_ENV).map(PathBuf::from)) {
            return Self::under(&dir);
        }
        Self {
            settings_file: dirs::config_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("todosync")
                .join(SETTINGS_FILE_NAME),
            cache_dir: dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("todosync")
                .join(CACHE_DIR_NAME),
        }
    }
}

/// Everything a command needs to locate its document.
pub struct Context {
    pub paths: CliPaths,
    /// Persisted settings with environment overrides applied.
    pub settings: SyncSettings,
    pub scope: Option<DocumentScope>,
    pub file: Option<String>,
}

impl Context {
    pub fn load(
        paths: CliPaths,
        scope: Option<DocumentScope>,
        file: Option<String>,
    ) -> Result<Self, CliError> {
        let mut settings = SyncSettings::load_from_path(&paths.settings_file)?;
        settings.apply_env_overrides();
        let file = todosync_core::util::non_blank(file);
        Ok(Self {
            paths,
            settings,
            scope,
            file,
        })
    }

    /// Scope for single-document commands.
    pub fn item_scope(&self) -> DocumentScope {
        self.scope.unwrap_or(DocumentScope::User)
    }

    /// Scopes for commands that may touch several documents.
    pub fn selected_scopes(&self) -> Vec<DocumentScope> {
        self.scope
            .map_or_else(|| self.settings.enabled_scopes(), |scope| vec![scope])
    }

    pub fn file(&self) -> Option<&str> {
        self.file.as_deref()
    }

    pub fn cache(&self) -> CacheStore {
        self.cache_for(self.settings.mode)
    }

    pub fn cache_for(&self, mode: SyncMode) -> CacheStore {
        CacheStore::new(
            Arc::new(FileCacheBackend::new(&self.paths.cache_dir)),
            mode,
        )
    }

    /// Read the persisted settings without environment overrides, for editing.
    pub fn stored_settings(&self) -> Result<SyncSettings, CliError> {
        Ok(SyncSettings::load_from_path(&self.paths.settings_file)?)
    }

    pub fn save_settings(&self, settings: &SyncSettings) -> Result<(), CliError> {
        settings.save_to_path(&self.paths.settings_file)?;
        Ok(())
    }
}
