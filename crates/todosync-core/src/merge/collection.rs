//! Three-way merge of an ordered item collection.

use std::collections::{HashMap, HashSet};

use super::{classify, insertion_index, Classification};
use crate::models::{Collection, ConflictRecord, Item, ItemId};

/// Result of merging one collection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionMerge {
    pub merged: Collection,
    pub conflicts: Vec<ConflictRecord>,
}

/// Merge `local` and `remote` against their common `base`.
///
/// Items are matched by id. The merged order follows `local`, with items
/// only `remote` placed next to their remote neighbours. Conflicted ids are
/// left out of `merged` and reported in `conflicts`.
#[must_use]
pub fn merge_collections(base: &[Item], local: &[Item], remote: &[Item]) -> CollectionMerge {
    let base_index = index_by_id(base);
    let local_index = index_by_id(local);
    let remote_index = index_by_id(remote);

    let mut seen = HashSet::new();
    let all_ids: Vec<ItemId> = local
        .iter()
        .chain(remote)
        .chain(base)
        .map(|item| item.id)
        .filter(|id| seen.insert(*id))
        .collect();

    let mut accepted: HashMap<ItemId, &Item> = HashMap::new();
    let mut conflicts = Vec::new();

    for id in all_ids {
        let in_base = base_index.get(&id).copied();
        let in_local = local_index.get(&id).copied();
        let in_remote = remote_index.get(&id).copied();

        match classify(in_base, in_local, in_remote) {
            Classification::Keep(item) => {
                accepted.insert(id, item);
            }
            Classification::Drop => {}
            Classification::Conflict(divergence) => conflicts.push(ConflictRecord {
                item_id: id,
                base: in_base.cloned(),
                local: in_local.cloned(),
                remote: in_remote.cloned(),
                kind: divergence.into(),
            }),
        }
    }

    let mut merged: Collection = Vec::with_capacity(accepted.len());
    let mut placed = HashSet::new();

    for item in local {
        if let Some(kept) = accepted.get(&item.id) {
            if placed.insert(item.id) {
                merged.push((*kept).clone());
            }
        }
    }

    let remote_order: Vec<ItemId> = remote.iter().map(|item| item.id).collect();
    for (position, item) in remote.iter().enumerate() {
        if placed.contains(&item.id) {
            continue;
        }
        let Some(kept) = accepted.get(&item.id) else {
            continue;
        };
        let at = insertion_index(&merged, &remote_order, position);
        merged.insert(at, (*kept).clone());
        placed.insert(item.id);
    }

    CollectionMerge { merged, conflicts }
}

fn index_by_id(items: &[Item]) -> HashMap<ItemId, &Item> {
    items.iter().map(|item| (item.id, item)).collect()
}
