//! Document snapshot model: the unit stored remotely and compared during sync.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::item::{Item, ItemId};
use crate::{Error, Result};

/// An ordered sequence of items. Order is user-visible and merge-relevant.
pub type Collection = Vec<Item>;

/// Collections keyed by an opaque path string. `BTreeMap` keeps keys sorted
/// so serialized documents diff stably.
pub type NamedCollectionMap = BTreeMap<String, Collection>;

/// Full content of one logical document.
#[derive(Debug, Clone, Default, Eq, Serialize, Deserialize)]
pub struct DocumentSnapshot {
    #[serde(default)]
    pub todos: Collection,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files: Option<NamedCollectionMap>,
}

/// A missing named map and an empty one describe the same document.
impl PartialEq for DocumentSnapshot {
    fn eq(&self, other: &Self) -> bool {
        self.todos == other.todos && self.named_or_empty() == other.named_or_empty()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RemotePayload {
    Document(DocumentSnapshot),
    // Older documents stored only the bare todo array.
    Bare(Collection),
}

impl DocumentSnapshot {
    #[must_use]
    pub const fn new(todos: Collection) -> Self {
        Self { todos, files: None }
    }

    #[must_use]
    pub const fn with_files(todos: Collection, files: NamedCollectionMap) -> Self {
        Self {
            todos,
            files: Some(files),
        }
    }

    /// Parse remote file content. Blank content is an empty document.
    pub fn from_remote_json(raw: &str) -> Result<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        match serde_json::from_str::<RemotePayload>(raw)? {
            RemotePayload::Document(document) => Ok(document),
            RemotePayload::Bare(todos) => Ok(Self::new(todos)),
        }
    }

    /// Serialize as pretty-printed JSON for the remote file.
    pub fn to_remote_json(&self) -> Result<String> {
        let mut normalized = self.clone();
        if normalized.files.as_ref().is_some_and(BTreeMap::is_empty) {
            normalized.files = None;
        }
        Ok(serde_json::to_string_pretty(&normalized)?)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.todos.is_empty() && self.named_or_empty().is_empty()
    }

    /// Named collections, treating a missing map as empty.
    #[must_use]
    pub fn named_or_empty(&self) -> &NamedCollectionMap {
        static EMPTY: NamedCollectionMap = BTreeMap::new();
        self.files.as_ref().unwrap_or(&EMPTY)
    }

    /// Next free item id across every collection in the document.
    #[must_use]
    pub fn next_item_id(&self) -> ItemId {
        self.todos
            .iter()
            .chain(self.named_or_empty().values().flatten())
            .map(|item| item.id)
            .max()
            .map_or(1, |max| max.saturating_add(1))
    }

    /// The primary collection, or the named collection for `path`.
    #[must_use]
    pub fn collection(&self, path: Option<&str>) -> Option<&Collection> {
        match path {
            None => Some(&self.todos),
            Some(path) => self.files.as_ref()?.get(path),
        }
    }

    /// Mutable access to a collection, creating the named entry if needed.
    pub fn collection_mut(&mut self, path: Option<&str>) -> &mut Collection {
        match path {
            None => &mut self.todos,
            Some(path) => self
                .files
                .get_or_insert_with(BTreeMap::new)
                .entry(path.to_string())
                .or_default(),
        }
    }

    /// Find an item by id in the given collection.
    pub fn item_mut(&mut self, path: Option<&str>, id: ItemId) -> Result<&mut Item> {
        let collection = match path {
            None => &mut self.todos,
            Some(key) => self
                .files
                .as_mut()
                .and_then(|files| files.get_mut(key))
                .ok_or_else(|| Error::CollectionNotFound(key.to_string()))?,
        };
        collection
            .iter_mut()
            .find(|item| item.id == id)
            .ok_or(Error::ItemNotFound(id))
    }

    /// Remove an item by id from the given collection.
    pub fn remove_item(&mut self, path: Option<&str>, id: ItemId) -> Result<Item> {
        if let Some(key) = path.filter(|_| self.collection(path).is_none()) {
            return Err(Error::CollectionNotFound(key.to_string()));
        }
        let collection = self.collection_mut(path);
        let index = collection
            .iter()
            .position(|item| item.id == id)
            .ok_or(Error::ItemNotFound(id))?;
        let removed = collection.remove(index);
        if let (Some(key), Some(files)) = (path, self.files.as_mut()) {
            if files.get(key).is_some_and(Vec::is_empty) {
                files.remove(key);
            }
        }
        Ok(removed)
    }
}
