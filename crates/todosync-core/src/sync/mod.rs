//! Sync engine.
//!
//! One pass reconciles one document scope with its remote file:
//!
//! 1. A scope already being synced is skipped without any I/O.
//! 2. Without a cache entry the remote is simply downloaded.
//! 3. Otherwise local and remote are each compared to the last clean
//!    snapshot. Only one side changed: copy it across. Both changed: merge
//!    three-way, ask the [`ConflictResolver`] about conflicts and upload the
//!    result.
//! 4. The cache is re-read when committing, so an edit recorded while the
//!    pass awaited the network is replayed on top of the new clean snapshot
//!    and stays dirty for the next pass. An edit that cannot be replayed
//!    keeps the old snapshot as the base, so the next pass merges it.

mod resolver;

pub use resolver::{CancelResolver, ConflictResolver, PreferenceResolver};

use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use thiserror::Error;
use tokio::sync::watch;

use crate::cache::{CacheEntry, CacheStore};
use crate::config::SyncSettings;
use crate::merge::{apply_resolutions, merge_documents, rebase};
use crate::models::{DocumentScope, DocumentSnapshot, SyncMode};
use crate::remote::{validate_payload, RemoteDocumentClient, RemoteError, RemoteErrorKind};
use crate::state::SyncStatus;

/// Statuses of every known scope.
pub type StatusMap = BTreeMap<DocumentScope, SyncStatus>;

/// What a successful pass did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncAction {
    /// Another pass for the scope was already running.
    AlreadyRunning,
    /// Local-only mode; nothing to sync.
    LocalOnly,
    /// Neither side changed.
    UpToDate,
    /// Remote content replaced the local copy.
    Downloaded,
    /// Local content replaced the remote copy.
    Uploaded,
    /// Both sides changed and were merged.
    Merged { conflicts: usize },
    /// The remote file does not exist yet; an empty dirty entry was created
    /// so the next pass creates it.
    Initialized,
}

impl std::fmt::Display for SyncAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AlreadyRunning => f.write_str("already running"),
            Self::LocalOnly => f.write_str("local only"),
            Self::UpToDate => f.write_str("up to date"),
            Self::Downloaded => f.write_str("downloaded"),
            Self::Uploaded => f.write_str("uploaded"),
            Self::Merged { conflicts: 0 } => f.write_str("merged"),
            Self::Merged { conflicts } => write!(f, "merged ({conflicts} conflict(s) resolved)"),
            Self::Initialized => f.write_str("initialized"),
        }
    }
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error("Conflict resolution was cancelled")]
    Cancelled,

    #[error("No remote document configured (set a gist id)")]
    NotConfigured,

    #[error(transparent)]
    Local(#[from] crate::Error),
}

impl SyncError {
    /// Whether a later pass can succeed without user action.
    pub fn retryable(&self) -> bool {
        match self {
            Self::Remote(error) => error.retryable,
            Self::Cancelled | Self::NotConfigured | Self::Local(_) => false,
        }
    }

    pub fn remote_kind(&self) -> Option<RemoteErrorKind> {
        match self {
            Self::Remote(error) => Some(error.kind),
            _ => None,
        }
    }
}

pub type SyncResult = std::result::Result<SyncAction, SyncError>;

/// Status implied by what is cached for `scope`, before any pass runs.
pub fn cached_status(cache: &CacheStore, scope: DocumentScope) -> SyncStatus {
    if cache.mode() == SyncMode::Local {
        return SyncStatus::Offline;
    }
    match cache.load(scope) {
        Ok(Some(entry)) if entry.is_dirty => SyncStatus::Dirty,
        Ok(Some(_)) => SyncStatus::Synced,
        Ok(None) => SyncStatus::Offline,
        Err(error) => {
            tracing::warn!("Failed to read {} cache: {}", scope, error);
            SyncStatus::Error
        }
    }
}

/// Drives sync passes for every document scope.
pub struct SyncEngine {
    cache: CacheStore,
    remote: Arc<dyn RemoteDocumentClient>,
    resolver: Arc<dyn ConflictResolver>,
    settings: RwLock<SyncSettings>,
    in_progress: Mutex<HashSet<DocumentScope>>,
    statuses: watch::Sender<StatusMap>,
}

impl SyncEngine {
    pub fn new(
        cache: CacheStore,
        remote: Arc<dyn RemoteDocumentClient>,
        resolver: Arc<dyn ConflictResolver>,
        settings: SyncSettings,
    ) -> Self {
        let initial = DocumentScope::ALL
            .into_iter()
            .map(|scope| (scope, SyncStatus::Offline))
            .collect();
        let (statuses, _) = watch::channel(initial);
        Self {
            cache,
            remote,
            resolver,
            settings: RwLock::new(settings),
            in_progress: Mutex::new(HashSet::new()),
            statuses,
        }
    }

    pub const fn cache(&self) -> &CacheStore {
        &self.cache
    }

    pub fn mode(&self) -> SyncMode {
        self.cache.mode()
    }

    pub fn settings(&self) -> SyncSettings {
        self.settings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn update_settings(&self, settings: SyncSettings) {
        *self.settings.write().unwrap_or_else(PoisonError::into_inner) = settings;
    }

    pub fn status(&self, scope: DocumentScope) -> SyncStatus {
        self.statuses
            .borrow()
            .get(&scope)
            .copied()
            .unwrap_or_default()
    }

    /// Watch every status change.
    pub fn subscribe(&self) -> watch::Receiver<StatusMap> {
        self.statuses.subscribe()
    }

    /// Derive initial statuses from what is cached.
    pub fn initialize_statuses(&self) {
        for scope in DocumentScope::ALL {
            self.set_status(scope, cached_status(&self.cache, scope));
        }
    }

    /// Apply a local edit and mark the scope dirty.
    pub fn record_local_edit<T>(
        &self,
        scope: DocumentScope,
        edit: impl FnOnce(&mut DocumentSnapshot) -> crate::Result<T>,
    ) -> crate::Result<T> {
        let value = self.cache.record_local_edit(scope, edit)?;
        if self.mode() == SyncMode::Remote && !self.is_running(scope) {
            let dirty = self.cache.load(scope)?.is_some_and(|entry| entry.is_dirty);
            if dirty {
                self.set_status(scope, SyncStatus::Dirty);
            }
        }
        Ok(value)
    }

    /// Drop everything cached for a scope in the current mode.
    pub fn disconnect(&self, scope: DocumentScope) -> crate::Result<()> {
        self.cache.clear(scope)?;
        tracing::info!("Disconnected {} from remote sync", scope);
        self.set_status(scope, SyncStatus::Offline);
        Ok(())
    }

    /// Run one pass for every enabled scope, one after another.
    pub async fn sync_all(&self) -> Vec<(DocumentScope, SyncResult)> {
        let scopes = self.settings().enabled_scopes();
        let mut results = Vec::with_capacity(scopes.len());
        for scope in scopes {
            results.push((scope, self.sync(scope).await));
        }
        results
    }

    /// Run one pass for `scope`.
    pub async fn sync(&self, scope: DocumentScope) -> SyncResult {
        if self.mode() == SyncMode::Local {
            self.set_status(scope, SyncStatus::Offline);
            return Ok(SyncAction::LocalOnly);
        }

        let Some(_guard) = PassGuard::acquire(&self.in_progress, scope) else {
            tracing::debug!("Sync for {} already running; skipping", scope);
            return Ok(SyncAction::AlreadyRunning);
        };

        self.set_status(scope, SyncStatus::Syncing);
        let result = self.run_pass(scope).await;
        match &result {
            Ok(action) => {
                let status = match self.cache.load(scope) {
                    Ok(Some(entry)) if entry.is_dirty => SyncStatus::Dirty,
                    Ok(_) => SyncStatus::Synced,
                    Err(_) => SyncStatus::Error,
                };
                tracing::info!("Sync {}: {}", scope, action);
                self.set_status(scope, status);
            }
            Err(error) => {
                tracing::warn!("Sync {} failed: {}", scope, error);
                self.set_status(scope, SyncStatus::Error);
            }
        }
        result
    }

    async fn run_pass(&self, scope: DocumentScope) -> SyncResult {
        let settings = self.settings();
        let document_id = settings.gist_id().ok_or(SyncError::NotConfigured)?;
        let file_name = settings.file_name(scope);

        let Some(entry) = self.cache.load(scope)? else {
            return self.initial_download(scope, &document_id, &file_name).await;
        };

        let local_changed = entry.has_local_changes();
        let remote = self
            .read_remote(&document_id, &file_name)
            .await?
            .unwrap_or_default();
        let remote_changed = match &entry.last_clean_remote_data {
            Some(clean) => remote != *clean,
            None => remote != entry.data,
        };
        tracing::debug!(
            "Sync {}: local changed = {}, remote changed = {}",
            scope,
            local_changed,
            remote_changed
        );

        match (local_changed, remote_changed) {
            (false, false) => {
                self.commit(scope, &entry.data, remote)?;
                Ok(SyncAction::UpToDate)
            }
            (false, true) => {
                self.commit(scope, &entry.data, remote)?;
                Ok(SyncAction::Downloaded)
            }
            (true, false) => {
                self.upload(&document_id, &file_name, &entry.data).await?;
                self.commit(scope, &entry.data, entry.data.clone())?;
                Ok(SyncAction::Uploaded)
            }
            (true, true) => {
                let base = entry.last_clean_remote_data.clone().unwrap_or_default();
                let merge = merge_documents(&base, &entry.data, &remote);
                let conflicts = merge.conflicts.len();

                let merged = if merge.conflicts.is_empty() {
                    merge.merged
                } else {
                    let resolutions = self
                        .resolver
                        .resolve(scope, &merge.conflicts, &merge.merged, &base)
                        .await
                        .ok_or(SyncError::Cancelled)?;
                    apply_resolutions(&merge, &resolutions, &base)
                };

                if merged != remote {
                    self.upload(&document_id, &file_name, &merged).await?;
                }
                self.commit(scope, &entry.data, merged)?;
                Ok(SyncAction::Merged { conflicts })
            }
        }
    }

    async fn initial_download(
        &self,
        scope: DocumentScope,
        document_id: &str,
        file_name: &str,
    ) -> SyncResult {
        if let Some(remote) = self.read_remote(document_id, file_name).await? {
            self.commit(scope, &DocumentSnapshot::default(), remote)?;
            return Ok(SyncAction::Downloaded);
        }

        tracing::info!("Remote file {} does not exist yet", file_name);
        self.cache.update(scope, |entry| {
            if entry.is_none() {
                *entry = Some(CacheEntry::unsynced(DocumentSnapshot::default()));
            }
            Ok(())
        })?;
        Ok(SyncAction::Initialized)
    }

    /// Remote content, or `None` when the document lacks the file.
    ///
    /// A missing document (or one the token cannot see) is an error, never
    /// an empty file.
    async fn read_remote(
        &self,
        document_id: &str,
        file_name: &str,
    ) -> Result<Option<DocumentSnapshot>, SyncError> {
        match self.remote.read_file(document_id, file_name).await {
            Ok(raw) => DocumentSnapshot::from_remote_json(&raw)
                .map(Some)
                .map_err(|error| {
                    RemoteError::unknown(format!("Invalid remote document {file_name}: {error}"))
                        .into()
                }),
            Err(error) if error.is_missing_file() => Ok(None),
            Err(error) => Err(error.into()),
        }
    }

    async fn upload(
        &self,
        document_id: &str,
        file_name: &str,
        document: &DocumentSnapshot,
    ) -> Result<(), SyncError> {
        let payload = document.to_remote_json()?;
        validate_payload(file_name, &payload)?;
        self.remote
            .write_file(document_id, file_name, &payload)
            .await?;
        Ok(())
    }

    /// Record `clean` as the new remote state.
    ///
    /// `pass_input` is the working copy the pass started from. If the cached
    /// working copy moved on since, those edits are rebased onto `clean` and
    /// the entry stays dirty. When they conflict with `clean`, the entry
    /// keeps its previous clean snapshot so the next pass merges against the
    /// remote and hands the conflict to the resolver.
    fn commit(
        &self,
        scope: DocumentScope,
        pass_input: &DocumentSnapshot,
        clean: DocumentSnapshot,
    ) -> crate::Result<()> {
        self.cache.update(scope, |entry| {
            let next = match entry.take() {
                Some(previous) if previous.data != *pass_input => {
                    tracing::debug!("Local edit landed during {} sync; rebasing", scope);
                    match rebase(pass_input, &previous.data, &clean) {
                        Some(edited) => {
                            let mut next = CacheEntry::clean(clean);
                            next.is_dirty = edited != next.data;
                            next.data = edited;
                            next
                        }
                        None => {
                            tracing::warn!(
                                "Local edit during {} sync conflicts with the remote; merging on the next pass",
                                scope
                            );
                            CacheEntry {
                                is_dirty: true,
                                ..previous
                            }
                        }
                    }
                }
                _ => CacheEntry::clean(clean),
            };
            *entry = Some(next);
            Ok(())
        })
    }

    fn is_running(&self, scope: DocumentScope) -> bool {
        self.in_progress
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&scope)
    }

    fn set_status(&self, scope: DocumentScope, status: SyncStatus) {
        self.statuses.send_if_modified(|statuses| {
            statuses.insert(scope, status) != Some(status)
        });
    }
}

/// Marks a scope as syncing until dropped.
struct PassGuard<'a> {
    in_progress: &'a Mutex<HashSet<DocumentScope>>,
    scope: DocumentScope,
}

impl<'a> PassGuard<'a> {
    fn acquire(in_progress: &'a Mutex<HashSet<DocumentScope>>, scope: DocumentScope) -> Option<Self> {
        let inserted = in_progress
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(scope);
        inserted.then_some(Self { in_progress, scope })
    }
}

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        self.in_progress
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.scope);
    }
}

#[cfg(test)]
mod tests;
