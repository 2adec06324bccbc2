use std::path::Path;

use chrono::{TimeDelta, Utc};
use clap_complete::Shell;
use pretty_assertions::assert_eq;
use todosync_core::cache::CacheEntry;
use todosync_core::config::SyncSettings;
use todosync_core::models::{ResolutionChoice, SyncMode};
use todosync_core::remote::RemoteError;
use todosync_core::sync::{StatusMap, SyncAction, SyncError};
use todosync_core::{DocumentScope, DocumentSnapshot, Item, SyncStatus};

use crate::commands::add::run_add;
use crate::commands::auth_cmd::normalize_token;
use crate::commands::common::{flatten_document, format_age, format_item_lines};
use crate::commands::complete::run_complete;
use crate::commands::completions::{render_completions, run_completions};
use crate::commands::config::{format_settings_lines, SettingsUpdate};
use crate::commands::delete::run_delete;
use crate::commands::disconnect::run_disconnect;
use crate::commands::edit::run_edit;
use crate::commands::mode::run_mode;
use crate::commands::status::{format_status_lines, ScopeStatus};
use crate::commands::sync::{format_sync_results, run_sync};
use crate::commands::watch::format_statuses;
use crate::error::CliError;
use crate::settings::{CliPaths, Context};

fn context_in(dir: &Path, scope: Option<DocumentScope>, file: Option<&str>) -> Context {
    Context::load(CliPaths::under(dir), scope, file.map(str::to_string)).unwrap()
}

fn args(text: &str) -> Vec<String> {
    text.split(' ').map(str::to_string).collect()
}

#[test]
fn add_assigns_increasing_ids_and_marks_dirty() {
    let dir = tempfile::tempdir().unwrap();
    let context = context_in(dir.path(), None, None);

    assert_eq!(run_add(&args("Buy milk"), false, false, &context).unwrap(), 1);
    assert_eq!(run_add(&args("Call Sam"), true, true, &context).unwrap(), 2);

    let entry = context.cache().load(DocumentScope::User).unwrap().unwrap();
    assert!(entry.is_dirty);
    assert_eq!(entry.data.todos[0].text, "Buy milk");
    assert!(entry.data.todos[1].is_markdown);
    assert!(entry.data.todos[1].is_note);
}

#[test]
fn add_to_named_collection_shares_the_id_space() {
    let dir = tempfile::tempdir().unwrap();
    let user = context_in(dir.path(), Some(DocumentScope::Workspace), None);
    let file = context_in(dir.path(), Some(DocumentScope::Workspace), Some("src/lib.rs"));

    run_add(&args("root"), false, false, &user).unwrap();
    assert_eq!(run_add(&args("in file"), false, false, &file).unwrap(), 2);

    let document = file.cache().data(DocumentScope::Workspace).unwrap();
    assert_eq!(document.todos.len(), 1);
    assert_eq!(
        document.collection(Some("src/lib.rs")).unwrap()[0].text,
        "in file"
    );
    assert!(file.cache().data(DocumentScope::User).unwrap().is_empty());
}

#[test]
fn complete_edit_and_delete_update_the_cache() {
    let dir = tempfile::tempdir().unwrap();
    let context = context_in(dir.path(), None, None);
    run_add(&args("Draft"), false, false, &context).unwrap();

    run_complete(1, false, &context).unwrap();
    run_edit(1, &args("Final draft"), &context).unwrap();
    let item = context.cache().data(DocumentScope::User).unwrap().todos[0].clone();
    assert!(item.completed);
    assert_eq!(item.text, "Final draft");

    run_complete(1, true, &context).unwrap();
    assert!(!context.cache().data(DocumentScope::User).unwrap().todos[0].completed);

    run_delete(1, &context).unwrap();
    assert!(context.cache().data(DocumentScope::User).unwrap().is_empty());
}

#[test]
fn missing_todo_is_reported_by_id() {
    let dir = tempfile::tempdir().unwrap();
    let context = context_in(dir.path(), None, None);

    assert!(matches!(
        run_complete(9, false, &context),
        Err(CliError::TodoNotFound(9))
    ));
    assert!(matches!(
        run_delete(9, &context),
        Err(CliError::TodoNotFound(9))
    ));
    assert!(context.cache().load(DocumentScope::User).unwrap().is_none());
}

#[test]
fn mode_switch_isolates_caches() {
    let dir = tempfile::tempdir().unwrap();
    let local = context_in(dir.path(), None, None);
    run_add(&args("offline only"), false, false, &local).unwrap();

    run_mode(Some(SyncMode::Remote), &local).unwrap();
    let remote = context_in(dir.path(), None, None);
    assert_eq!(remote.settings.mode, SyncMode::Remote);
    assert!(remote.cache().data(DocumentScope::User).unwrap().is_empty());
    assert_eq!(
        remote
            .cache_for(SyncMode::Local)
            .data(DocumentScope::User)
            .unwrap()
            .todos
            .len(),
        1
    );
}

#[test]
fn disconnect_clears_only_selected_scope() {
    let dir = tempfile::tempdir().unwrap();
    let user = context_in(dir.path(), Some(DocumentScope::User), None);
    let workspace = context_in(dir.path(), Some(DocumentScope::Workspace), None);
    run_add(&args("a"), false, false, &user).unwrap();
    run_add(&args("b"), false, false, &workspace).unwrap();

    run_disconnect(&user).unwrap();
    assert!(user.cache().load(DocumentScope::User).unwrap().is_none());
    assert!(user.cache().load(DocumentScope::Workspace).unwrap().is_some());
}

#[tokio::test]
async fn sync_in_local_mode_does_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let context = context_in(dir.path(), None, None);
    run_sync(Some(ResolutionChoice::Local), &context).await.unwrap();
}

#[tokio::test]
async fn sync_requires_gist_in_remote_mode() {
    let dir = tempfile::tempdir().unwrap();
    let mut context = context_in(dir.path(), None, None);
    context.settings.mode = SyncMode::Remote;
    context.settings.gist_id = None;

    assert!(matches!(
        run_sync(Some(ResolutionChoice::Remote), &context).await,
        Err(CliError::SyncNotConfigured)
    ));
}

#[test]
fn settings_update_applies_and_validates() {
    let mut settings = SyncSettings::default();
    SettingsUpdate {
        gist_id: Some(" abc123 ".to_string()),
        poll_interval: Some(5),
        user_file: Some("mine.json".to_string()),
        disable: vec![DocumentScope::Workspace],
        ..SettingsUpdate::default()
    }
    .apply(&mut settings)
    .unwrap();

    assert_eq!(settings.gist_id.as_deref(), Some("abc123"));
    assert_eq!(settings.poll_interval().as_secs(), 30);
    assert_eq!(settings.file_name(DocumentScope::User), "mine.json");
    assert_eq!(settings.enabled_scopes(), vec![DocumentScope::User]);

    let rejected = SettingsUpdate {
        api_base_url: Some("github.example.com".to_string()),
        ..SettingsUpdate::default()
    }
    .apply(&mut settings);
    assert!(matches!(rejected, Err(CliError::Config(_))));

    SettingsUpdate {
        user_file: Some("  ".to_string()),
        enable: vec![DocumentScope::Workspace],
        ..SettingsUpdate::default()
    }
    .apply(&mut settings)
    .unwrap();
    assert_eq!(settings.file_name(DocumentScope::User), "todos.json");
    assert_eq!(settings.enabled_scopes(), DocumentScope::ALL.to_vec());
}

#[test]
fn settings_lines_show_defaults() {
    let lines = format_settings_lines(&SyncSettings::default());
    assert!(lines[0].ends_with("local"));
    assert!(lines[1].ends_with("(not set)"));
    assert!(lines[2].ends_with("60s"));
    assert!(lines.iter().any(|line| line.ends_with("workspace-todos.json")));
}

#[test]
fn status_rows_count_every_collection() {
    let mut document = DocumentSnapshot::new(vec![Item::new(1, "a")]);
    document.collection_mut(Some("main.rs")).push(Item::new(2, "b"));
    let entry = CacheEntry::unsynced(document);

    let row = ScopeStatus::new(
        DocumentScope::Workspace,
        SyncStatus::Dirty,
        "workspace-todos.json".to_string(),
        true,
        Some(&entry),
    );
    assert_eq!(row.items, 2);
    assert!(row.has_local_changes);
    assert_eq!(row.last_synced, None);
    assert_eq!(serde_json::to_value(&row).unwrap()["status"], "dirty");

    let clean = CacheEntry::clean(DocumentSnapshot::default());
    let row = ScopeStatus::new(
        DocumentScope::User,
        SyncStatus::Synced,
        "todos.json".to_string(),
        false,
        Some(&clean),
    );
    let lines = format_status_lines(&[row]);
    assert!(lines[0].starts_with("user"));
    assert!(lines[0].contains("synced 20"));
    assert!(lines[0].ends_with("(disabled)"));
}

#[test]
fn sync_results_mark_retryable_failures() {
    let results = vec![
        (DocumentScope::User, Ok(SyncAction::Merged { conflicts: 2 })),
        (
            DocumentScope::Workspace,
            Err(SyncError::Remote(RemoteError::network("offline"))),
        ),
    ];
    let lines = format_sync_results(&results);
    assert_eq!(lines[0], "user: merged (2 conflict(s) resolved)");
    assert!(lines[1].starts_with("workspace: failed, will retry:"));

    let cancelled = vec![(DocumentScope::User, Err(SyncError::Cancelled))];
    assert_eq!(
        format_sync_results(&cancelled)[0],
        "user: failed: Conflict resolution was cancelled"
    );
}

#[test]
fn statuses_render_on_one_line() {
    let statuses: StatusMap = [
        (DocumentScope::User, SyncStatus::Synced),
        (DocumentScope::Workspace, SyncStatus::Error),
    ]
    .into_iter()
    .collect();
    assert_eq!(format_statuses(&statuses), "user=synced  workspace=error");
}

#[test]
fn item_lines_hide_completed_when_asked() {
    let mut done = Item::new(2, "Done thing");
    done.complete();
    let items = vec![Item::new(1, "Open thing\nmore"), done];

    let all = format_item_lines(&items, false);
    assert_eq!(all.len(), 2);
    assert!(all[0].starts_with("   1  [ ] Open thing"));
    assert!(all[1].contains("[x] Done thing"));
    assert_eq!(format_item_lines(&items, true).len(), 1);
}

#[test]
fn flatten_document_tags_named_collections() {
    let mut document = DocumentSnapshot::new(vec![Item::new(1, "root")]);
    document.collection_mut(Some("a.rs")).push(Item::new(2, "nested"));

    let rows = flatten_document(&document);
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].file, None);
    assert_eq!(rows[1].file.as_deref(), Some("a.rs"));
}

#[test]
fn format_age_units() {
    let now = Utc::now();
    assert_eq!(format_age(now - TimeDelta::seconds(30), now), "just now");
    assert_eq!(format_age(now - TimeDelta::minutes(2), now), "2m ago");
    assert_eq!(format_age(now - TimeDelta::hours(2), now), "2h ago");
    assert_eq!(format_age(now - TimeDelta::days(3), now), "3d ago");
    assert_eq!(format_age(now - TimeDelta::days(15), now), "2w ago");
}

#[test]
fn normalize_token_rejects_blank_and_spaced_values() {
    assert_eq!(normalize_token("  ghp_abc \n"), Some("ghp_abc".to_string()));
    assert_eq!(normalize_token("   "), None);
    assert_eq!(normalize_token("ghp abc"), None);
}

#[test]
fn completions_mention_subcommands() {
    let script = String::from_utf8(render_completions(Shell::Bash)).unwrap();
    assert!(script.contains("todosync"));
    assert!(script.contains("watch"));
}

#[test]
fn run_completions_writes_script_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("todosync.fish");
    run_completions(Shell::Fish, Some(&path)).unwrap();
    assert!(std::fs::read_to_string(&path).unwrap().contains("disconnect"));
}
