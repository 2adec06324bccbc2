use std::io;

use thiserror::Error;
use todosync_core::remote::RemoteError;
use todosync_core::sync::SyncError;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] todosync_core::Error),
    #[error(transparent)]
    Sync(#[from] SyncError),
    #[error(transparent)]
    Remote(#[from] RemoteError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Failed to watch the cache: {0}")]
    Watch(#[from] notify::Error),
    #[error("No todo text provided")]
    EmptyContent,
    #[error("Todo {0} not found")]
    TodoNotFound(i64),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Authentication error: {0}")]
    Auth(String),
    #[error(
        "Sync is not configured. Run `todosync config set --gist-id <ID>`, `todosync mode remote` and `todosync auth login`."
    )]
    SyncNotConfigured,
    #[error("{0} scope(s) failed to sync")]
    SyncFailed(usize),
}
