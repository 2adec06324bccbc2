//! Todo item model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of an item, unique within its collection.
pub type ItemId = i64;

/// A single todo entry.
///
/// `id` is the unit of identity across merges; every other field is content
/// compared by structural equality.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: ItemId,
    pub text: String,
    #[serde(default)]
    pub completed: bool,
    pub creation_date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_markdown: bool,
    #[serde(default)]
    pub is_note: bool,
}

impl Item {
    /// Create an open item created now.
    #[must_use]
    pub fn new(id: ItemId, text: impl Into<String>) -> Self {
        Self {
            id,
            text: text.into(),
            completed: false,
            creation_date: Utc::now(),
            completion_date: None,
            is_markdown: false,
            is_note: false,
        }
    }

    /// Mark the item completed, stamping the completion date.
    pub fn complete(&mut self) {
        if !self.completed {
            self.completed = true;
            self.completion_date = Some(Utc::now());
        }
    }

    /// Reopen a completed item.
    pub fn reopen(&mut self) {
        self.completed = false;
        self.completion_date = None;
    }

    /// Get first line as title preview, truncated to `max_len` characters
    #[must_use]
    pub fn title_preview(&self, max_len: usize) -> String {
        self.text
            .lines()
            .next()
            .unwrap_or("")
            .chars()
            .take(max_len)
            .collect()
    }
}
