//! Three-way merge of todo documents.
//!
//! Every function here is pure: given the last common snapshot (`base`), the
//! local working copy and the current remote content, it classifies each id
//! (or path) by which sides still hold it and whether they changed it, keeps
//! whatever merges cleanly and reports the rest as conflicts.

mod collection;
mod named;
mod resolve;

pub use collection::{merge_collections, CollectionMerge};
pub use named::{merge_named_collections, NamedMerge};
pub use resolve::apply_resolutions;

use crate::models::{
    CollectionConflictKind, ConflictKind, ConflictSet, DocumentSnapshot, Item, ItemId,
};

/// Result of merging two divergent documents against their base.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentMerge {
    /// Everything that merged cleanly. Conflicted entries are left out.
    pub merged: DocumentSnapshot,
    pub conflicts: ConflictSet,
}

/// Merge the primary collection and the named collections of a document.
#[must_use]
pub fn merge_documents(
    base: &DocumentSnapshot,
    local: &DocumentSnapshot,
    remote: &DocumentSnapshot,
) -> DocumentMerge {
    let todos = merge_collections(&base.todos, &local.todos, &remote.todos);
    let named = merge_named_collections(
        base.named_or_empty(),
        local.named_or_empty(),
        remote.named_or_empty(),
    );

    let keep_named = base.files.is_some() || local.files.is_some() || remote.files.is_some();
    DocumentMerge {
        merged: DocumentSnapshot {
            todos: todos.merged,
            files: keep_named.then_some(named.merged),
        },
        conflicts: ConflictSet {
            items: todos.conflicts,
            collections: named.conflicts,
        },
    }
}

/// Replay local edits made on top of `edited_from` onto a newer snapshot.
///
/// Returns `None` when the edits cannot be replayed without a conflict.
#[must_use]
pub fn rebase(
    edited_from: &DocumentSnapshot,
    current: &DocumentSnapshot,
    onto: &DocumentSnapshot,
) -> Option<DocumentSnapshot> {
    let merge = merge_documents(edited_from, current, onto);
    merge.conflicts.is_empty().then_some(merge.merged)
}

/// How one id (or path) diverged across base, local and remote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Divergence {
    EditEdit,
    EditDelete,
    DeleteEdit,
    AddedBoth,
}

impl From<Divergence> for ConflictKind {
    fn from(value: Divergence) -> Self {
        match value {
            Divergence::EditEdit => Self::EditEdit,
            Divergence::EditDelete => Self::EditDelete,
            Divergence::DeleteEdit => Self::DeleteEdit,
            Divergence::AddedBoth => Self::IdCollision,
        }
    }
}

impl From<Divergence> for CollectionConflictKind {
    fn from(value: Divergence) -> Self {
        match value {
            Divergence::EditEdit => Self::EditEdit,
            Divergence::EditDelete => Self::EditDelete,
            Divergence::DeleteEdit => Self::DeleteEdit,
            Divergence::AddedBoth => Self::AddedBoth,
        }
    }
}

pub(crate) enum Classification<'a, T> {
    Keep(&'a T),
    Drop,
    Conflict(Divergence),
}

/// Classify one entry by presence pattern and structural equality.
pub(crate) fn classify<'a, T: PartialEq>(
    base: Option<&'a T>,
    local: Option<&'a T>,
    remote: Option<&'a T>,
) -> Classification<'a, T> {
    match (base, local, remote) {
        (Some(base), Some(local), None) => {
            if local == base {
                Classification::Drop
            } else {
                Classification::Conflict(Divergence::EditDelete)
            }
        }
        (Some(base), None, Some(remote)) => {
            if remote == base {
                Classification::Drop
            } else {
                Classification::Conflict(Divergence::DeleteEdit)
            }
        }
        (None, Some(local), Some(remote)) => {
            if local == remote {
                Classification::Keep(local)
            } else {
                Classification::Conflict(Divergence::AddedBoth)
            }
        }
        (Some(base), Some(local), Some(remote)) => {
            let local_changed = local != base;
            let remote_changed = remote != base;
            if local_changed && remote_changed && local != remote {
                Classification::Conflict(Divergence::EditEdit)
            } else if remote_changed {
                Classification::Keep(remote)
            } else {
                Classification::Keep(local)
            }
        }
        (None, Some(local), None) => Classification::Keep(local),
        (None, None, Some(remote)) => Classification::Keep(remote),
        (Some(_) | None, None, None) => Classification::Drop,
    }
}

/// Where to insert the entry at `position` of `order` into `placed`.
///
/// Goes right after the nearest earlier neighbour (in `order`) that is
/// already placed, but never past the nearest later placed neighbour.
/// Appends when no neighbour is placed yet.
pub(crate) fn insertion_index(placed: &[Item], order: &[ItemId], position: usize) -> usize {
    let index_of = |id: &ItemId| placed.iter().position(|item| item.id == *id);

    let previous = order[..position].iter().rev().find_map(index_of);
    let next = order
        .get(position + 1..)
        .and_then(|later| later.iter().find_map(index_of));

    match (previous, next) {
        (Some(previous), Some(next)) => (previous + 1).min(next),
        (Some(previous), None) => previous + 1,
        (None, Some(next)) => next,
        (None, None) => placed.len(),
    }
}
