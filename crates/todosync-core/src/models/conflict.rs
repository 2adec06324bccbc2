//! Merge conflict and resolution models

use serde::{Deserialize, Serialize};

use super::document::Collection;
use super::item::{Item, ItemId};

/// How an item diverged between local and remote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConflictKind {
    /// Both sides changed the item differently.
    EditEdit,
    /// Local changed the item, remote deleted it.
    EditDelete,
    /// Local deleted the item, remote changed it.
    DeleteEdit,
    /// Both sides added the same id with different content.
    IdCollision,
}

/// Item-level conflict found by a three-way merge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictRecord {
    pub item_id: ItemId,
    pub base: Option<Item>,
    pub local: Option<Item>,
    pub remote: Option<Item>,
    pub kind: ConflictKind,
}

/// How a whole named collection diverged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollectionConflictKind {
    #[serde(rename = "collection-edit-edit")]
    EditEdit,
    #[serde(rename = "collection-edit-delete")]
    EditDelete,
    #[serde(rename = "collection-delete-edit")]
    DeleteEdit,
    #[serde(rename = "collection-added-both")]
    AddedBoth,
}

/// Path-level conflict found by a named collection merge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionConflict {
    pub path: String,
    pub base: Option<Collection>,
    pub local: Option<Collection>,
    pub remote: Option<Collection>,
    pub kind: CollectionConflictKind,
}

/// Every conflict a document merge could not settle on its own.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictSet {
    pub items: Vec<ConflictRecord>,
    pub collections: Vec<CollectionConflict>,
}

impl ConflictSet {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty() && self.collections.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len() + self.collections.len()
    }
}

/// Which side of a conflict to keep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionChoice {
    Local,
    Remote,
    /// Leave the entry out until a later sync offers it again.
    Skip,
}

impl ResolutionChoice {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Remote => "remote",
            Self::Skip => "skip",
        }
    }
}

impl std::fmt::Display for ResolutionChoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ResolutionChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" | "mine" => Ok(Self::Local),
            "remote" | "theirs" => Ok(Self::Remote),
            "skip" => Ok(Self::Skip),
            other => Err(format!(
                "unknown choice '{other}' (expected local, remote or skip)"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemResolution {
    pub item_id: ItemId,
    pub choice: ResolutionChoice,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionResolution {
    pub path: String,
    pub choice: ResolutionChoice,
}

/// Answers returned by a conflict resolver, in conflict order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolutions {
    pub items: Vec<ItemResolution>,
    pub collections: Vec<CollectionResolution>,
}

impl Resolutions {
    /// Resolve every conflict in `conflicts` the same way.
    #[must_use]
    pub fn uniform(conflicts: &ConflictSet, choice: ResolutionChoice) -> Self {
        Self {
            items: conflicts
                .items
                .iter()
                .map(|conflict| ItemResolution {
                    item_id: conflict.item_id,
                    choice,
                })
                .collect(),
            collections: conflicts
                .collections
                .iter()
                .map(|conflict| CollectionResolution {
                    path: conflict.path.clone(),
                    choice,
                })
                .collect(),
        }
    }

    #[must_use]
    pub fn item_choice(&self, item_id: ItemId) -> Option<ResolutionChoice> {
        self.items
            .iter()
            .find(|resolution| resolution.item_id == item_id)
            .map(|resolution| resolution.choice)
    }

    #[must_use]
    pub fn collection_choice(&self, path: &str) -> Option<ResolutionChoice> {
        self.collections
            .iter()
            .find(|resolution| resolution.path == path)
            .map(|resolution| resolution.choice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_kinds_serialize_with_wire_names() {
        assert_eq!(
            serde_json::to_string(&ConflictKind::EditDelete).unwrap(),
            "\"edit-delete\""
        );
        assert_eq!(
            serde_json::to_string(&CollectionConflictKind::AddedBoth).unwrap(),
            "\"collection-added-both\""
        );
    }

    #[test]
    fn uniform_resolutions_cover_every_conflict() {
        let conflicts = ConflictSet {
            items: vec![ConflictRecord {
                item_id: 3,
                base: None,
                local: Some(Item::new(3, "a")),
                remote: Some(Item::new(3, "b")),
                kind: ConflictKind::IdCollision,
            }],
            collections: vec![CollectionConflict {
                path: "src/lib.rs".to_string(),
                base: None,
                local: Some(Vec::new()),
                remote: Some(vec![Item::new(1, "x")]),
                kind: CollectionConflictKind::AddedBoth,
            }],
        };
        let resolutions = Resolutions::uniform(&conflicts, ResolutionChoice::Remote);
        assert_eq!(conflicts.len(), 2);
        assert_eq!(resolutions.item_choice(3), Some(ResolutionChoice::Remote));
        assert_eq!(
            resolutions.collection_choice("src/lib.rs"),
            Some(ResolutionChoice::Remote)
        );
        assert_eq!(resolutions.item_choice(4), None);
    }
}
