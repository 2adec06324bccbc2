//! todosync-core - Core library for todosync
//!
//! This crate contains the shared models, the three-way merge engine, the
//! local cache, and the sync engine/scheduler used by every todosync
//! interface.

pub mod auth;
pub mod cache;
pub mod config;
pub mod error;
pub mod merge;
pub mod models;
pub mod remote;
pub mod scheduler;
pub mod state;
pub mod sync;
pub mod util;

pub use error::{Error, Result};
pub use models::{DocumentScope, DocumentSnapshot, Item, ItemId};
pub use state::SyncStatus;
