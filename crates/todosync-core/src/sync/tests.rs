use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use pretty_assertions::assert_eq;

use super::*;
use crate::cache::{CacheBackend, MemoryCacheBackend};
use crate::merge::test_support::{ids, item};
use crate::models::{ConflictSet, Item, ResolutionChoice, Resolutions};
use crate::remote::{InMemoryRemote, RemoteDocument, RemoteResult};
use crate::scheduler::Scheduler;

const GIST: &str = "gist-1";
const USER_FILE: &str = "todos.json";

/// Resolver that records how often it was asked.
struct ScriptedResolver {
    answer: Option<ResolutionChoice>,
    calls: AtomicUsize,
}

impl ScriptedResolver {
    fn new(answer: Option<ResolutionChoice>) -> Arc<Self> {
        Arc::new(Self {
            answer,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConflictResolver for ScriptedResolver {
    async fn resolve(
        &self,
        _scope: DocumentScope,
        conflicts: &ConflictSet,
        _auto_merged: &DocumentSnapshot,
        _base: &DocumentSnapshot,
    ) -> Option<Resolutions> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.answer
            .map(|choice| Resolutions::uniform(conflicts, choice))
    }
}

/// Applies writes at once but acknowledges them late.
struct SlowAckRemote {
    inner: Arc<InMemoryRemote>,
    ack_delay: Duration,
}

#[async_trait]
impl RemoteDocumentClient for SlowAckRemote {
    async fn fetch_document(&self, document_id: &str) -> RemoteResult<RemoteDocument> {
        self.inner.fetch_document(document_id).await
    }

    async fn read_file(&self, document_id: &str, file_name: &str) -> RemoteResult<String> {
        self.inner.read_file(document_id, file_name).await
    }

    async fn write_file(
        &self,
        document_id: &str,
        file_name: &str,
        content: &str,
    ) -> RemoteResult<()> {
        self.inner.write_file(document_id, file_name, content).await?;
        tokio::time::sleep(self.ack_delay).await;
        Ok(())
    }
}

struct Harness {
    engine: SyncEngine,
    remote: Arc<InMemoryRemote>,
    backend: Arc<MemoryCacheBackend>,
}

fn remote_settings() -> SyncSettings {
    SyncSettings {
        mode: SyncMode::Remote,
        gist_id: Some(GIST.to_string()),
        ..SyncSettings::default()
    }
}

fn harness_with(resolver: Arc<dyn ConflictResolver>, mode: SyncMode) -> Harness {
    let remote = Arc::new(InMemoryRemote::new());
    remote.create_document(GIST);
    let backend = Arc::new(MemoryCacheBackend::default());
    let cache = CacheStore::new(backend.clone(), mode);
    let engine = SyncEngine::new(cache, remote.clone(), resolver, remote_settings());
    Harness {
        engine,
        remote,
        backend,
    }
}

fn harness() -> Harness {
    harness_with(ScriptedResolver::new(None), SyncMode::Remote)
}

impl Harness {
    fn put_remote(&self, document: &DocumentSnapshot) {
        self.remote
            .put_file(GIST, USER_FILE, document.to_remote_json().unwrap());
    }

    fn remote_document(&self) -> DocumentSnapshot {
        let raw = self.remote.file(GIST, USER_FILE).expect("remote file");
        DocumentSnapshot::from_remote_json(&raw).unwrap()
    }

    fn entry(&self) -> CacheEntry {
        self.engine
            .cache()
            .load(DocumentScope::User)
            .unwrap()
            .expect("cache entry")
    }

    /// Cache and remote both hold `document`, clean.
    fn seed_synced(&self, document: &DocumentSnapshot) {
        self.put_remote(document);
        self.engine
            .cache()
            .save(DocumentScope::User, &CacheEntry::clean(document.clone()))
            .unwrap();
    }

    fn edit(&self, edit: impl FnOnce(&mut DocumentSnapshot)) {
        self.engine
            .record_local_edit(DocumentScope::User, |data| {
                edit(data);
                Ok(())
            })
            .unwrap();
    }
}

fn doc(items: &[Item]) -> DocumentSnapshot {
    DocumentSnapshot::new(items.to_vec())
}

#[tokio::test]
async fn local_mode_never_touches_the_remote() {
    let h = harness_with(ScriptedResolver::new(None), SyncMode::Local);
    let action = h.engine.sync(DocumentScope::User).await.unwrap();
    assert_eq!(action, SyncAction::LocalOnly);
    assert_eq!(h.engine.status(DocumentScope::User), SyncStatus::Offline);
    assert_eq!(h.remote.read_count(), 0);
}

#[tokio::test]
async fn missing_gist_id_is_reported() {
    let h = harness();
    h.engine.update_settings(SyncSettings {
        gist_id: None,
        ..remote_settings()
    });
    let error = h.engine.sync(DocumentScope::User).await.unwrap_err();
    assert!(matches!(error, SyncError::NotConfigured));
    assert_eq!(h.engine.status(DocumentScope::User), SyncStatus::Error);
}

#[tokio::test]
async fn first_pass_downloads_remote_content() {
    let h = harness();
    let remote = doc(&[item(1, "from remote")]);
    h.put_remote(&remote);

    let action = h.engine.sync(DocumentScope::User).await.unwrap();
    assert_eq!(action, SyncAction::Downloaded);

    let entry = h.entry();
    assert_eq!(entry.data, remote);
    assert_eq!(entry.last_clean_remote_data, Some(remote));
    assert!(!entry.is_dirty);
    assert_eq!(h.engine.status(DocumentScope::User), SyncStatus::Synced);
    assert_eq!(h.remote.write_count(), 0);
}

#[tokio::test]
async fn missing_remote_file_is_created_on_the_next_pass() {
    let h = harness();

    let action = h.engine.sync(DocumentScope::User).await.unwrap();
    assert_eq!(action, SyncAction::Initialized);
    assert_eq!(h.engine.status(DocumentScope::User), SyncStatus::Dirty);
    assert!(h.entry().is_dirty);

    let action = h.engine.sync(DocumentScope::User).await.unwrap();
    assert_eq!(action, SyncAction::Uploaded);
    assert_eq!(h.remote_document(), DocumentSnapshot::default());
    assert_eq!(h.engine.status(DocumentScope::User), SyncStatus::Synced);
}

#[tokio::test]
async fn unchanged_sides_sync_without_writing() {
    let h = harness();
    h.seed_synced(&doc(&[item(1, "a")]));

    let action = h.engine.sync(DocumentScope::User).await.unwrap();
    assert_eq!(action, SyncAction::UpToDate);
    assert_eq!(h.remote.write_count(), 0);
    assert_eq!(h.engine.status(DocumentScope::User), SyncStatus::Synced);
}

#[tokio::test]
async fn dirty_flag_without_real_change_is_cleared() {
    let h = harness();
    let document = doc(&[item(1, "a")]);
    h.seed_synced(&document);
    let mut entry = CacheEntry::clean(document);
    entry.is_dirty = true;
    h.engine.cache().save(DocumentScope::User, &entry).unwrap();

    let action = h.engine.sync(DocumentScope::User).await.unwrap();
    assert_eq!(action, SyncAction::UpToDate);
    assert!(!h.entry().is_dirty);
    assert_eq!(h.remote.write_count(), 0);
}

#[tokio::test]
async fn remote_only_change_is_downloaded() {
    let h = harness();
    h.seed_synced(&doc(&[item(1, "a")]));
    let changed = doc(&[item(1, "a"), item(2, "added elsewhere")]);
    h.put_remote(&changed);

    let action = h.engine.sync(DocumentScope::User).await.unwrap();
    assert_eq!(action, SyncAction::Downloaded);
    assert_eq!(h.entry().data, changed);
    assert_eq!(h.remote.write_count(), 0);
}

#[tokio::test]
async fn local_only_change_is_uploaded() {
    let h = harness();
    h.seed_synced(&doc(&[item(1, "a")]));
    h.edit(|data| data.todos.push(item(2, "added here")));
    assert_eq!(h.engine.status(DocumentScope::User), SyncStatus::Dirty);

    let action = h.engine.sync(DocumentScope::User).await.unwrap();
    assert_eq!(action, SyncAction::Uploaded);
    assert_eq!(ids(&h.remote_document().todos), vec![1, 2]);

    let entry = h.entry();
    assert!(!entry.is_dirty);
    assert_eq!(entry.last_clean_remote_data.as_ref(), Some(&entry.data));
    assert_eq!(h.engine.status(DocumentScope::User), SyncStatus::Synced);
}

#[tokio::test]
async fn disjoint_changes_merge_without_asking() {
    let resolver = ScriptedResolver::new(None);
    let h = harness_with(resolver.clone(), SyncMode::Remote);
    h.seed_synced(&doc(&[item(1, "a")]));
    h.put_remote(&doc(&[item(1, "a"), item(2, "remote")]));
    h.edit(|data| data.todos.push(item(3, "local")));

    let action = h.engine.sync(DocumentScope::User).await.unwrap();
    assert_eq!(action, SyncAction::Merged { conflicts: 0 });
    assert_eq!(resolver.calls(), 0);
    // 2 follows its remote neighbour 1
    assert_eq!(ids(&h.remote_document().todos), vec![1, 2, 3]);
    assert_eq!(h.entry().data, h.remote_document());
    assert!(!h.entry().is_dirty);
}

#[tokio::test]
async fn conflicts_are_settled_by_the_resolver() {
    let resolver = ScriptedResolver::new(Some(ResolutionChoice::Local));
    let h = harness_with(resolver.clone(), SyncMode::Remote);
    h.seed_synced(&doc(&[item(1, "a"), item(2, "b")]));
    h.put_remote(&doc(&[item(1, "a remote"), item(2, "b")]));
    h.edit(|data| data.todos[0].text = "a local".to_string());

    let action = h.engine.sync(DocumentScope::User).await.unwrap();
    assert_eq!(action, SyncAction::Merged { conflicts: 1 });
    assert_eq!(resolver.calls(), 1);
    assert_eq!(
        h.remote_document().todos,
        vec![item(1, "a local"), item(2, "b")]
    );
    assert_eq!(h.engine.status(DocumentScope::User), SyncStatus::Synced);
}

#[tokio::test]
async fn keeping_remote_side_needs_no_upload() {
    let h = harness_with(
        ScriptedResolver::new(Some(ResolutionChoice::Remote)),
        SyncMode::Remote,
    );
    h.seed_synced(&doc(&[item(1, "a")]));
    h.put_remote(&doc(&[item(1, "a remote")]));
    h.edit(|data| data.todos[0].text = "a local".to_string());

    h.engine.sync(DocumentScope::User).await.unwrap();
    assert_eq!(h.remote.write_count(), 0);
    assert_eq!(h.entry().data, doc(&[item(1, "a remote")]));
}

#[tokio::test]
async fn cancelled_resolution_changes_nothing() {
    let h = harness();
    h.seed_synced(&doc(&[item(1, "a")]));
    h.put_remote(&doc(&[item(1, "a remote")]));
    h.edit(|data| data.todos[0].text = "a local".to_string());
    let before = h.entry();

    let error = h.engine.sync(DocumentScope::User).await.unwrap_err();
    assert!(matches!(error, SyncError::Cancelled));
    assert!(!error.retryable());
    assert_eq!(h.entry(), before);
    assert_eq!(h.remote.write_count(), 0);
    assert_eq!(h.remote_document(), doc(&[item(1, "a remote")]));
    assert_eq!(h.engine.status(DocumentScope::User), SyncStatus::Error);
}

#[tokio::test]
async fn read_failure_leaves_cache_untouched() {
    let h = harness();
    h.seed_synced(&doc(&[item(1, "a")]));
    h.edit(|data| data.todos.push(item(2, "b")));
    let before = h.entry();
    h.remote
        .fail_next_read(RemoteError::network("connection reset"));

    let error = h.engine.sync(DocumentScope::User).await.unwrap_err();
    assert_eq!(error.remote_kind(), Some(RemoteErrorKind::Network));
    assert!(error.retryable());
    assert_eq!(h.entry(), before);
    assert_eq!(h.engine.status(DocumentScope::User), SyncStatus::Error);

    // the next pass retries and succeeds
    let action = h.engine.sync(DocumentScope::User).await.unwrap();
    assert_eq!(action, SyncAction::Uploaded);
}

#[tokio::test]
async fn write_failure_keeps_entry_dirty() {
    let h = harness();
    h.seed_synced(&doc(&[item(1, "a")]));
    h.edit(|data| data.todos.push(item(2, "b")));
    let before = h.entry();
    h.remote
        .fail_next_write(RemoteError::rate_limit("API rate limit exceeded"));

    let error = h.engine.sync(DocumentScope::User).await.unwrap_err();
    assert_eq!(error.remote_kind(), Some(RemoteErrorKind::RateLimit));
    assert_eq!(h.entry(), before);
    assert!(h.entry().is_dirty);
    assert_eq!(h.remote_document(), doc(&[item(1, "a")]));
}

#[tokio::test]
async fn unparseable_remote_content_is_an_unknown_error() {
    let h = harness();
    h.seed_synced(&doc(&[item(1, "a")]));
    h.remote.put_file(GIST, USER_FILE, "<html>oops</html>");

    let error = h.engine.sync(DocumentScope::User).await.unwrap_err();
    assert_eq!(error.remote_kind(), Some(RemoteErrorKind::Unknown));
    assert_eq!(h.entry().data, doc(&[item(1, "a")]));
}

#[tokio::test]
async fn corrupt_cache_falls_back_to_download() {
    let h = harness();
    let remote = doc(&[item(1, "a")]);
    h.put_remote(&remote);
    let key = h.engine.cache().storage_key(DocumentScope::User);
    h.backend.write(&key, "{\"data\": 12").unwrap();

    let action = h.engine.sync(DocumentScope::User).await.unwrap();
    assert_eq!(action, SyncAction::Downloaded);
    assert_eq!(h.entry().data, remote);
}

#[tokio::test(start_paused = true)]
async fn concurrent_passes_for_one_scope_do_io_once() {
    let h = harness();
    h.seed_synced(&doc(&[item(1, "a")]));
    h.remote.set_latency(Some(Duration::from_millis(100)));

    let (first, second) = tokio::join!(
        h.engine.sync(DocumentScope::User),
        h.engine.sync(DocumentScope::User)
    );
    let mut actions = vec![first.unwrap(), second.unwrap()];
    actions.sort_by_key(|action| *action == SyncAction::AlreadyRunning);
    assert_eq!(actions, vec![SyncAction::UpToDate, SyncAction::AlreadyRunning]);
    assert_eq!(h.remote.read_count(), 1);

    // the guard is released afterwards
    assert_eq!(
        h.engine.sync(DocumentScope::User).await.unwrap(),
        SyncAction::UpToDate
    );
}

#[tokio::test(start_paused = true)]
async fn scopes_sync_independently() {
    let h = harness();
    h.remote.set_latency(Some(Duration::from_millis(100)));
    h.put_remote(&doc(&[item(1, "user")]));
    h.remote
        .put_file(GIST, "workspace-todos.json", doc(&[item(9, "ws")]).to_remote_json().unwrap());

    let (user, workspace) = tokio::join!(
        h.engine.sync(DocumentScope::User),
        h.engine.sync(DocumentScope::Workspace)
    );
    assert_eq!(user.unwrap(), SyncAction::Downloaded);
    assert_eq!(workspace.unwrap(), SyncAction::Downloaded);
    assert_eq!(
        h.engine.cache().data(DocumentScope::Workspace).unwrap(),
        doc(&[item(9, "ws")])
    );
}

#[tokio::test(start_paused = true)]
async fn edit_during_pass_is_rebased_and_stays_dirty() {
    let h = harness();
    h.seed_synced(&doc(&[item(1, "a")]));
    h.edit(|data| data.todos.push(item(2, "before pass")));
    h.remote.set_latency(Some(Duration::from_millis(100)));

    let (result, ()) = tokio::join!(h.engine.sync(DocumentScope::User), async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        h.edit(|data| data.todos.push(item(3, "during pass")));
    });

    assert_eq!(result.unwrap(), SyncAction::Uploaded);
    assert_eq!(ids(&h.remote_document().todos), vec![1, 2]);

    let entry = h.entry();
    assert!(entry.is_dirty);
    assert_eq!(ids(&entry.data.todos), vec![1, 2, 3]);
    assert_eq!(
        entry.last_clean_remote_data.as_ref().map(|clean| ids(&clean.todos)),
        Some(vec![1, 2])
    );
    assert_eq!(h.engine.status(DocumentScope::User), SyncStatus::Dirty);

    assert_eq!(
        h.engine.sync(DocumentScope::User).await.unwrap(),
        SyncAction::Uploaded
    );
    assert_eq!(ids(&h.remote_document().todos), vec![1, 2, 3]);
    assert_eq!(h.engine.status(DocumentScope::User), SyncStatus::Synced);
}

#[tokio::test(start_paused = true)]
async fn conflicting_edit_during_pass_is_merged_on_the_next_pass() {
    let resolver = ScriptedResolver::new(Some(ResolutionChoice::Local));
    let h = harness_with(resolver.clone(), SyncMode::Remote);
    let seed = doc(&[item(1, "a")]);
    h.seed_synced(&seed);
    h.edit(|data| data.todos.push(item(2, "local add")));
    h.put_remote(&doc(&[item(1, "remote edit"), item(5, "remote add")]));
    h.remote.set_latency(Some(Duration::from_millis(100)));

    let (result, ()) = tokio::join!(h.engine.sync(DocumentScope::User), async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        h.edit(|data| data.todos[0].text = "mid-pass edit".to_string());
    });
    assert_eq!(result.unwrap(), SyncAction::Merged { conflicts: 0 });
    assert_eq!(ids(&h.remote_document().todos), vec![1, 5, 2]);

    // the edit clashes with the remote edit of 1, so the old base is kept
    let entry = h.entry();
    assert!(entry.is_dirty);
    assert_eq!(entry.last_clean_remote_data, Some(seed));
    assert_eq!(h.engine.status(DocumentScope::User), SyncStatus::Dirty);

    let action = h.engine.sync(DocumentScope::User).await.unwrap();
    assert_eq!(action, SyncAction::Merged { conflicts: 1 });
    assert_eq!(resolver.calls(), 1);

    let mut remote = h.remote_document().todos;
    remote.sort_by_key(|todo| todo.id);
    assert_eq!(
        remote,
        vec![
            item(1, "mid-pass edit"),
            item(2, "local add"),
            item(5, "remote add")
        ]
    );
    assert!(!h.entry().is_dirty);
    assert_eq!(h.engine.status(DocumentScope::User), SyncStatus::Synced);
}

#[tokio::test(start_paused = true)]
async fn edit_during_slow_ack_survives_debounce_restart() {
    let remote = Arc::new(InMemoryRemote::new());
    let seed = doc(&[item(1, "a")]);
    remote.put_file(GIST, USER_FILE, seed.to_remote_json().unwrap());
    let transport = Arc::new(SlowAckRemote {
        inner: remote.clone(),
        ack_delay: Duration::from_millis(500),
    });
    let engine = Arc::new(SyncEngine::new(
        CacheStore::in_memory(SyncMode::Remote),
        transport,
        Arc::new(CancelResolver),
        remote_settings(),
    ));
    engine
        .cache()
        .save(DocumentScope::User, &CacheEntry::clean(seed))
        .unwrap();
    let scheduler = Scheduler::new(engine.clone(), remote_settings());
    let edit = |text: &str| {
        engine
            .record_local_edit(DocumentScope::User, |data| {
                data.todos[0].text = text.to_string();
                Ok(())
            })
            .unwrap();
        scheduler.notify_local_edit(DocumentScope::User);
    };

    edit("b");
    tokio::time::sleep(Duration::from_millis(3100)).await;
    // the upload has landed but is not acknowledged yet
    assert_eq!(remote.write_count(), 1);
    assert_eq!(engine.status(DocumentScope::User), SyncStatus::Syncing);

    edit("c");
    tokio::time::sleep(Duration::from_millis(500)).await;
    let entry = engine.cache().load(DocumentScope::User).unwrap().unwrap();
    assert_eq!(entry.last_clean_remote_data, Some(doc(&[item(1, "b")])));
    assert!(entry.is_dirty);

    tokio::time::sleep(Duration::from_millis(3500)).await;
    let raw = remote.file(GIST, USER_FILE).unwrap();
    assert_eq!(
        DocumentSnapshot::from_remote_json(&raw).unwrap(),
        doc(&[item(1, "c")])
    );
    assert_eq!(engine.status(DocumentScope::User), SyncStatus::Synced);
    assert!(!engine.cache().load(DocumentScope::User).unwrap().unwrap().is_dirty);
}

#[tokio::test]
async fn missing_document_fails_without_touching_the_cache() {
    let h = harness();
    let document = doc(&[item(1, "a"), item(2, "b")]);
    h.engine
        .cache()
        .save(DocumentScope::User, &CacheEntry::clean(document.clone()))
        .unwrap();
    h.engine.update_settings(SyncSettings {
        gist_id: Some("no-such-gist".to_string()),
        ..remote_settings()
    });

    let error = h.engine.sync(DocumentScope::User).await.unwrap_err();
    assert_eq!(error.remote_kind(), Some(RemoteErrorKind::NotFound));
    assert_eq!(h.entry().data, document);
    assert_eq!(h.engine.status(DocumentScope::User), SyncStatus::Error);
    assert_eq!(h.remote.write_count(), 0);
}

#[tokio::test]
async fn missing_document_is_not_initialized() {
    let h = harness();
    h.engine.update_settings(SyncSettings {
        gist_id: Some("no-such-gist".to_string()),
        ..remote_settings()
    });

    let error = h.engine.sync(DocumentScope::User).await.unwrap_err();
    assert_eq!(error.remote_kind(), Some(RemoteErrorKind::NotFound));
    assert!(h.engine.cache().load(DocumentScope::User).unwrap().is_none());
}

#[tokio::test]
async fn named_collection_conflict_takes_chosen_side() {
    let h = harness_with(
        ScriptedResolver::new(Some(ResolutionChoice::Remote)),
        SyncMode::Remote,
    );
    let mut files = BTreeMap::new();
    files.insert("src/main.rs".to_string(), vec![item(1, "x")]);
    let base = DocumentSnapshot::with_files(Vec::new(), files);
    h.seed_synced(&base);

    let mut remote = base.clone();
    remote
        .collection_mut(Some("src/main.rs"))
        .push(item(3, "remote"));
    h.put_remote(&remote);
    h.edit(|data| data.collection_mut(Some("src/main.rs")).push(item(2, "local")));

    let action = h.engine.sync(DocumentScope::User).await.unwrap();
    assert_eq!(action, SyncAction::Merged { conflicts: 1 });
    assert_eq!(h.entry().data, remote);
    assert_eq!(h.remote.write_count(), 0);
}

#[tokio::test]
async fn statuses_are_broadcast() {
    let h = harness();
    let mut receiver = h.engine.subscribe();
    h.put_remote(&doc(&[item(1, "a")]));

    h.engine.sync(DocumentScope::User).await.unwrap();
    assert!(receiver.has_changed().unwrap());
    assert_eq!(
        receiver.borrow_and_update().get(&DocumentScope::User),
        Some(&SyncStatus::Synced)
    );
}

#[tokio::test]
async fn initialize_statuses_reflects_cache() {
    let h = harness();
    h.engine
        .cache()
        .save(DocumentScope::User, &CacheEntry::clean(doc(&[item(1, "a")])))
        .unwrap();
    h.engine
        .cache()
        .save(
            DocumentScope::Workspace,
            &CacheEntry::unsynced(DocumentSnapshot::default()),
        )
        .unwrap();

    h.engine.initialize_statuses();
    assert_eq!(h.engine.status(DocumentScope::User), SyncStatus::Synced);
    assert_eq!(h.engine.status(DocumentScope::Workspace), SyncStatus::Dirty);

    h.engine.disconnect(DocumentScope::User).unwrap();
    assert_eq!(h.engine.status(DocumentScope::User), SyncStatus::Offline);
    assert!(h.engine.cache().load(DocumentScope::User).unwrap().is_none());
}

#[tokio::test]
async fn sync_all_covers_enabled_scopes_only() {
    let h = harness();
    let mut settings = remote_settings();
    settings.scopes.remove(&DocumentScope::Workspace);
    h.engine.update_settings(settings);

    let results = h.engine.sync_all().await;
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].0, DocumentScope::User);
}
