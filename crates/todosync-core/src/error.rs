//! Crate-wide error type.

use thiserror::Error;

use crate::models::ItemId;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Todo {0} not found")]
    ItemNotFound(ItemId),

    #[error("No todos recorded for {0}")]
    CollectionNotFound(String),

    /// The cache backend could not read or write an entry.
    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
