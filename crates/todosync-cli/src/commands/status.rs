use chrono::{DateTime, Utc};
use serde::Serialize;
use todosync_core::cache::CacheEntry;
use todosync_core::sync::cached_status;
use todosync_core::{DocumentScope, SyncStatus};

use crate::error::CliError;
use crate::settings::Context;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeStatus {
    pub scope: DocumentScope,
    pub status: SyncStatus,
    pub file_name: String,
    pub enabled: bool,
    pub items: usize,
    pub has_local_changes: bool,
    pub last_synced: Option<DateTime<Utc>>,
}

impl ScopeStatus {
    pub fn new(
        scope: DocumentScope,
        status: SyncStatus,
        file_name: String,
        enabled: bool,
        entry: Option<&CacheEntry>,
    ) -> Self {
        Self {
            scope,
            status,
            file_name,
            enabled,
            items: entry.map_or(0, |entry| {
                entry.data.todos.len() + entry.data.named_or_empty().values().map(Vec::len).sum::<usize>()
            }),
            has_local_changes: entry.is_some_and(CacheEntry::has_local_changes),
            last_synced: entry
                .filter(|entry| entry.last_clean_remote_data.is_some())
                .map(|entry| entry.last_synced),
        }
    }
}

pub fn run_status(as_json: bool, context: &Context) -> Result<(), CliError> {
    let cache = context.cache();
    let mut rows = Vec::new();
    for scope in context.selected_scopes() {
        let entry = cache.load(scope)?;
        rows.push(ScopeStatus::new(
            scope,
            cached_status(&cache, scope),
            context.settings.file_name(scope),
            context.settings.is_enabled(scope),
            entry.as_ref(),
        ));
    }

    if as_json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    println!("Mode: {}", context.settings.mode);
    println!(
        "Gist: {}",
        context.settings.gist_id().as_deref().unwrap_or("(not set)")
    );
    for line in format_status_lines(&rows) {
        println!("{line}");
    }
    Ok(())
}

pub fn format_status_lines(rows: &[ScopeStatus]) -> Vec<String> {
    rows.iter()
        .map(|row| {
            let synced = row.last_synced.map_or_else(
                || "never synced".to_string(),
                |at| format!("synced {}", at.format("%Y-%m-%d %H:%M:%S UTC")),
            );
            let disabled = if row.enabled { "" } else { " (disabled)" };
            format!(
                "{:<10} {:<8} {:<22} {:>3} item(s)  {synced}{disabled}",
                row.scope.to_string(),
                row.status.to_string(),
                row.file_name,
                row.items
            )
        })
        .collect()
}
