//! Local cache of each logical document.
//!
//! A [`CacheStore`] keeps, per scope, the working copy, the last snapshot
//! known to match the remote, a dirty flag and the last sync time. Storage
//! keys include the [`SyncMode`], so local-only and remote-synced data never
//! mix when the user switches modes.

mod backend;

pub use backend::{CacheBackend, FileCacheBackend, MemoryCacheBackend};

use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{DocumentScope, DocumentSnapshot, SyncMode};
use crate::Result;

/// Persisted state of one logical document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    /// Working copy, possibly with edits the remote has not seen.
    pub data: DocumentSnapshot,
    /// Last value known to exactly match the remote. Merge base.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_clean_remote_data: Option<DocumentSnapshot>,
    pub last_synced: DateTime<Utc>,
    pub is_dirty: bool,
}

impl CacheEntry {
    /// Entry mirroring a snapshot just read from or written to the remote.
    #[must_use]
    pub fn clean(snapshot: DocumentSnapshot) -> Self {
        Self {
            data: snapshot.clone(),
            last_clean_remote_data: Some(snapshot),
            last_synced: Utc::now(),
            is_dirty: false,
        }
    }

    /// Fresh entry for a document that has never been synced.
    #[must_use]
    pub fn unsynced(data: DocumentSnapshot) -> Self {
        Self {
            data,
            last_clean_remote_data: None,
            last_synced: DateTime::<Utc>::UNIX_EPOCH,
            is_dirty: true,
        }
    }

    /// Whether the working copy holds edits the remote has not seen.
    ///
    /// Without a clean snapshot the dirty flag is all there is to go on.
    #[must_use]
    pub fn has_local_changes(&self) -> bool {
        self.is_dirty
            && self
                .last_clean_remote_data
                .as_ref()
                .is_none_or(|clean| *clean != self.data)
    }
}

/// Mode-isolated cache for every document scope.
#[derive(Clone)]
pub struct CacheStore {
    backend: Arc<dyn CacheBackend>,
    mode: SyncMode,
    write_lock: Arc<Mutex<()>>,
}

impl CacheStore {
    pub fn new(backend: Arc<dyn CacheBackend>, mode: SyncMode) -> Self {
        Self {
            backend,
            mode,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// In-memory store (primarily for tests).
    #[must_use]
    pub fn in_memory(mode: SyncMode) -> Self {
        Self::new(Arc::new(MemoryCacheBackend::default()), mode)
    }

    #[must_use]
    pub const fn mode(&self) -> SyncMode {
        self.mode
    }

    /// Same backend, other mode. Shares nothing with `self` but the storage.
    #[must_use]
    pub fn for_mode(&self, mode: SyncMode) -> Self {
        Self::new(Arc::clone(&self.backend), mode)
    }

    /// Storage key for a scope under the current mode.
    #[must_use]
    pub fn storage_key(&self, scope: DocumentScope) -> String {
        format!("todosync.{}.{}", self.mode, scope)
    }

    /// Load the entry for a scope.
    ///
    /// An unreadable (corrupt) entry is reported as absent so the caller
    /// falls back to a fresh download instead of failing.
    pub fn load(&self, scope: DocumentScope) -> Result<Option<CacheEntry>> {
        let key = self.storage_key(scope);
        let Some(raw) = self.backend.read(&key)? else {
            return Ok(None);
        };
        match serde_json::from_str::<CacheEntry>(&raw) {
            Ok(entry) => Ok(Some(entry)),
            Err(error) => {
                tracing::warn!("Ignoring corrupt cache entry {}: {}", key, error);
                Ok(None)
            }
        }
    }

    /// Working copy for a scope, empty when nothing is cached.
    pub fn data(&self, scope: DocumentScope) -> Result<DocumentSnapshot> {
        Ok(self
            .load(scope)?
            .map(|entry| entry.data)
            .unwrap_or_default())
    }

    pub fn save(&self, scope: DocumentScope, entry: &CacheEntry) -> Result<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.write_entry(scope, entry)
    }

    /// Read-modify-write an entry under the store's write lock.
    ///
    /// The entry is written back when `update` leaves it `Some`.
    pub fn update<T>(
        &self,
        scope: DocumentScope,
        update: impl FnOnce(&mut Option<CacheEntry>) -> Result<T>,
    ) -> Result<T> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut entry = self.load(scope)?;
        let value = update(&mut entry)?;
        if let Some(entry) = entry {
            self.write_entry(scope, &entry)?;
        }
        Ok(value)
    }

    /// Apply a local edit to the working copy and mark it dirty if it changed.
    pub fn record_local_edit<T>(
        &self,
        scope: DocumentScope,
        edit: impl FnOnce(&mut DocumentSnapshot) -> Result<T>,
    ) -> Result<T> {
        self.update(scope, |entry| {
            let entry = entry.get_or_insert_with(|| CacheEntry::unsynced(DocumentSnapshot::default()));
            let before = entry.data.clone();
            let value = edit(&mut entry.data)?;
            if entry.data != before {
                entry.is_dirty = true;
            }
            Ok(value)
        })
    }

    /// Forget everything cached for a scope under the current mode.
    pub fn clear(&self, scope: DocumentScope) -> Result<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.backend.remove(&self.storage_key(scope))
    }

    fn write_entry(&self, scope: DocumentScope, entry: &CacheEntry) -> Result<()> {
        let raw = serde_json::to_string(entry)?;
        self.backend.write(&self.storage_key(scope), &raw)
    }
}
