//! Follows edits that other `todosync` invocations write to the cache.
//!
//! Every command edits the cache file of its scope and marks it dirty. While
//! `watch` runs, those writes restart the scheduler's debounce so the edit is
//! synced after the quiet period instead of on the next poll.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{RecommendedWatcher, Watcher as _};
use notify_debouncer_mini::{new_debouncer, DebouncedEvent, DebouncedEventKind, Debouncer};
use tokio::sync::mpsc;
use todosync_core::cache::{CacheStore, FileCacheBackend};
use todosync_core::scheduler::Scheduler;
use todosync_core::DocumentScope;

use crate::error::CliError;

/// Batches the stage-and-rename of one cache write into a single event.
const SETTLE_DELAY: Duration = Duration::from_millis(250);

pub struct CacheWatcher {
    _debouncer: Debouncer<RecommendedWatcher>,
}

impl CacheWatcher {
    /// Watch `cache_dir` and forward dirty writes to `scheduler`.
    pub fn start(
        cache_dir: &Path,
        cache: CacheStore,
        scheduler: Scheduler,
    ) -> Result<Self, CliError> {
        std::fs::create_dir_all(cache_dir)?;
        let (tx, rx) = mpsc::channel(32);

        let mut debouncer = new_debouncer(
            SETTLE_DELAY,
            move |result: Result<Vec<DebouncedEvent>, notify::Error>| match result {
                Ok(events) => {
                    let paths: Vec<PathBuf> = events
                        .into_iter()
                        .filter(|event| matches!(event.kind, DebouncedEventKind::Any))
                        .map(|event| event.path)
                        .collect();
                    if !paths.is_empty() {
                        let _ = tx.blocking_send(paths);
                    }
                }
                Err(error) => tracing::warn!("Cache watcher error: {}", error),
            },
        )?;
        debouncer
            .watcher()
            .watch(cache_dir, notify::RecursiveMode::NonRecursive)?;

        tracing::info!("Watching {} for local edits", cache_dir.display());
        tokio::spawn(forward_edits(rx, cache, scheduler));

        Ok(Self {
            _debouncer: debouncer,
        })
    }
}

async fn forward_edits(
    mut rx: mpsc::Receiver<Vec<PathBuf>>,
    cache: CacheStore,
    scheduler: Scheduler,
) {
    while let Some(paths) = rx.recv().await {
        for scope in edited_scopes(&cache, &paths) {
            tracing::debug!("Local edit detected for {}", scope);
            scheduler.notify_local_edit(scope);
        }
    }
}

/// Scopes whose cache file is among `paths` and holds unsynced edits.
///
/// Clean writes come from finished sync passes and are ignored.
pub fn edited_scopes(cache: &CacheStore, paths: &[PathBuf]) -> Vec<DocumentScope> {
    DocumentScope::ALL
        .into_iter()
        .filter(|scope| {
            let file_name = FileCacheBackend::entry_file_name(&cache.storage_key(*scope));
            paths
                .iter()
                .any(|path| path.file_name().is_some_and(|name| name == file_name.as_str()))
        })
        .filter(|scope| match cache.load(*scope) {
            Ok(entry) => entry.is_some_and(|entry| entry.is_dirty),
            Err(error) => {
                tracing::warn!("Failed to read {} cache: {}", scope, error);
                false
            }
        })
        .collect()
}
