use std::io::{self, IsTerminal, Read};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use todosync_core::models::{Collection, ResolutionChoice, SyncMode};
use todosync_core::remote::GistClient;
use todosync_core::sync::{CancelResolver, ConflictResolver, PreferenceResolver, SyncEngine};
use todosync_core::util::non_blank;
use todosync_core::{DocumentSnapshot, Item};

use crate::auth::KeychainTokenProvider;
use crate::error::CliError;
use crate::resolver::PromptResolver;
use crate::settings::Context;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoListItem {
    pub id: i64,
    /// Named collection the todo belongs to, if any.
    pub file: Option<String>,
    pub text: String,
    pub completed: bool,
    pub is_markdown: bool,
    pub is_note: bool,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl TodoListItem {
    pub fn new(item: &Item, file: Option<&str>) -> Self {
        Self {
            id: item.id,
            file: file.map(str::to_string),
            text: item.text.clone(),
            completed: item.completed,
            is_markdown: item.is_markdown,
            is_note: item.is_note,
            created_at: item.creation_date,
            completed_at: item.completion_date,
        }
    }
}

/// Text from the arguments, or from piped stdin.
pub fn resolve_todo_text(parts: &[String]) -> Result<String, CliError> {
    if let Some(text) = non_blank(Some(parts.join(" "))) {
        return Ok(text);
    }
    if let Some(text) = read_piped_stdin()? {
        return Ok(text);
    }
    Err(CliError::EmptyContent)
}

pub fn read_piped_stdin() -> Result<Option<String>, CliError> {
    let stdin = io::stdin();
    if stdin.is_terminal() {
        return Ok(None);
    }

    let mut buffer = String::new();
    stdin.lock().read_to_string(&mut buffer)?;
    Ok(non_blank(Some(buffer)))
}

/// Coarse age of `then` relative to `now`, e.g. `3h ago`.
pub fn format_age(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let age = now.signed_duration_since(then);
    match (age.num_minutes(), age.num_hours(), age.num_days()) {
        (minutes, _, _) if minutes < 1 => "just now".to_string(),
        (minutes, hours, _) if hours < 1 => format!("{minutes}m ago"),
        (_, hours, days) if days < 1 => format!("{hours}h ago"),
        (_, _, days) if days < 7 => format!("{days}d ago"),
        (_, _, days) => format!("{}w ago", days / 7),
    }
}

/// One line per todo: id, checkbox, first line of text, age.
pub fn format_item_lines(items: &Collection, open_only: bool) -> Vec<String> {
    let now = Utc::now();
    items
        .iter()
        .filter(|item| !open_only || !item.completed)
        .map(|item| {
            let mark = if item.completed { "x" } else { " " };
            let preview = item.title_preview(50);
            let age = format_age(item.creation_date, now);
            let kind = if item.is_note { "  (note)" } else { "" };
            format!("{:>4}  [{mark}] {preview:<50}  {age}{kind}", item.id)
        })
        .collect()
}

/// Every todo in the document, paired with its named collection.
pub fn flatten_document(document: &DocumentSnapshot) -> Vec<TodoListItem> {
    let mut rows: Vec<TodoListItem> = document
        .todos
        .iter()
        .map(|item| TodoListItem::new(item, None))
        .collect();
    for (path, items) in document.named_or_empty() {
        rows.extend(items.iter().map(|item| TodoListItem::new(item, Some(path))));
    }
    rows
}

/// Interactive prompt on a terminal, a fixed preference when given, and
/// otherwise cancellation so conflicts stay untouched.
pub fn choose_resolver(prefer: Option<ResolutionChoice>) -> Arc<dyn ConflictResolver> {
    match prefer {
        Some(choice) => Arc::new(PreferenceResolver::new(choice)),
        None if io::stdin().is_terminal() => Arc::new(PromptResolver),
        None => Arc::new(CancelResolver),
    }
}

pub fn build_engine(
    context: &Context,
    resolver: Arc<dyn ConflictResolver>,
) -> Result<SyncEngine, CliError> {
    let settings = context.settings.clone();
    if settings.mode == SyncMode::Remote && settings.gist_id().is_none() {
        return Err(CliError::SyncNotConfigured);
    }

    let tokens = Arc::new(KeychainTokenProvider::default());
    let remote = match settings.api_base_url.as_deref() {
        Some(base_url) => GistClient::with_base_url(base_url, tokens)?,
        None => GistClient::new(tokens)?,
    };
    let engine = SyncEngine::new(context.cache(), Arc::new(remote), resolver, settings);
    engine.initialize_statuses();
    Ok(engine)
}
