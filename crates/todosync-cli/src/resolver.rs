//! Conflict resolution on the terminal.

use std::io::{self, BufRead, Write};

use async_trait::async_trait;
use todosync_core::models::{
    Collection, CollectionConflict, CollectionConflictKind, CollectionResolution, ConflictKind,
    ConflictRecord, ConflictSet, Item, ItemResolution, ResolutionChoice, Resolutions,
};
use todosync_core::sync::ConflictResolver;
use todosync_core::{DocumentScope, DocumentSnapshot};

const PREVIEW_CHARS: usize = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Answer {
    Choose(ResolutionChoice),
    Quit,
}

/// Parse one prompt answer. Single letters are accepted.
pub fn parse_answer(raw: &str) -> Option<Answer> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "l" => Some(Answer::Choose(ResolutionChoice::Local)),
        "r" => Some(Answer::Choose(ResolutionChoice::Remote)),
        "s" => Some(Answer::Choose(ResolutionChoice::Skip)),
        "q" | "quit" | "cancel" => Some(Answer::Quit),
        other => other.parse().ok().map(Answer::Choose),
    }
}

const fn item_kind_label(kind: ConflictKind) -> &'static str {
    match kind {
        ConflictKind::EditEdit => "edited on both sides",
        ConflictKind::EditDelete => "edited here, deleted remotely",
        ConflictKind::DeleteEdit => "deleted here, edited remotely",
        ConflictKind::IdCollision => "added on both sides with the same id",
    }
}

const fn collection_kind_label(kind: CollectionConflictKind) -> &'static str {
    match kind {
        CollectionConflictKind::EditEdit => "edited on both sides",
        CollectionConflictKind::EditDelete => "edited here, deleted remotely",
        CollectionConflictKind::DeleteEdit => "deleted here, edited remotely",
        CollectionConflictKind::AddedBoth => "added on both sides",
    }
}

fn describe_item(item: Option<&Item>) -> String {
    item.map_or_else(
        || "(deleted)".to_string(),
        |item| {
            let mark = if item.completed { "x" } else { " " };
            format!("[{mark}] {}", item.title_preview(PREVIEW_CHARS))
        },
    )
}

fn describe_collection(collection: Option<&Collection>) -> String {
    collection.map_or_else(
        || "(deleted)".to_string(),
        |items| format!("{} item(s)", items.len()),
    )
}

pub fn describe_item_conflict(conflict: &ConflictRecord) -> Vec<String> {
    vec![
        format!(
            "Todo {}: {}",
            conflict.item_id,
            item_kind_label(conflict.kind)
        ),
        format!("  local:  {}", describe_item(conflict.local.as_ref())),
        format!("  remote: {}", describe_item(conflict.remote.as_ref())),
    ]
}

pub fn describe_collection_conflict(conflict: &CollectionConflict) -> Vec<String> {
    vec![
        format!(
            "File {}: {}",
            conflict.path,
            collection_kind_label(conflict.kind)
        ),
        format!("  local:  {}", describe_collection(conflict.local.as_ref())),
        format!("  remote: {}", describe_collection(conflict.remote.as_ref())),
    ]
}

/// Asks on stdin about every conflict, one at a time.
#[derive(Debug, Clone, Copy, Default)]
pub struct PromptResolver;

impl PromptResolver {
    async fn ask(lines: Vec<String>) -> Option<Answer> {
        tokio::task::spawn_blocking(move || prompt_blocking(&lines))
            .await
            .ok()
            .flatten()
    }
}

fn prompt_blocking(lines: &[String]) -> Option<Answer> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    for line in lines {
        println!("{line}");
    }
    loop {
        print!("Keep [l]ocal, [r]emote, [s]kip or [q]uit? ");
        stdout.flush().ok()?;
        let mut input = String::new();
        if stdin.lock().read_line(&mut input).ok()? == 0 {
            return None;
        }
        if let Some(answer) = parse_answer(&input) {
            return Some(answer);
        }
        println!("Please answer l, r, s or q.");
    }
}

#[async_trait]
impl ConflictResolver for PromptResolver {
    async fn resolve(
        &self,
        scope: DocumentScope,
        conflicts: &ConflictSet,
        _auto_merged: &DocumentSnapshot,
        _base: &DocumentSnapshot,
    ) -> Option<Resolutions> {
        println!("{} conflict(s) in the {} document", conflicts.len(), scope);
        let mut resolutions = Resolutions::default();

        for conflict in &conflicts.items {
            match Self::ask(describe_item_conflict(conflict)).await? {
                Answer::Choose(choice) => resolutions.items.push(ItemResolution {
                    item_id: conflict.item_id,
                    choice,
                }),
                Answer::Quit => return None,
            }
        }
        for conflict in &conflicts.collections {
            match Self::ask(describe_collection_conflict(conflict)).await? {
                Answer::Choose(choice) => resolutions.collections.push(CollectionResolution {
                    path: conflict.path.clone(),
                    choice,
                }),
                Answer::Quit => return None,
            }
        }
        Some(resolutions)
    }
}
