//! Apply conflict resolutions on top of an automatic merge.

use super::{insertion_index, DocumentMerge};
use crate::models::{
    Collection, ConflictRecord, DocumentSnapshot, Item, ItemId, ResolutionChoice, Resolutions,
};

/// Build the final document from an automatic merge plus user resolutions.
///
/// Conflicts without an answer are treated as skipped. Resolved items that
/// existed in `base` go back next to their base neighbours; the rest are
/// appended in conflict order.
#[must_use]
pub fn apply_resolutions(
    merge: &DocumentMerge,
    resolutions: &Resolutions,
    base: &DocumentSnapshot,
) -> DocumentSnapshot {
    let todos = resolve_items(
        &merge.merged.todos,
        &merge.conflicts.items,
        resolutions,
        &base.todos,
    );

    let mut files = merge.merged.files.clone();
    for conflict in &merge.conflicts.collections {
        let choice = resolutions
            .collection_choice(&conflict.path)
            .unwrap_or(ResolutionChoice::Skip);
        let chosen = match choice {
            ResolutionChoice::Local => conflict.local.as_ref(),
            ResolutionChoice::Remote => conflict.remote.as_ref(),
            ResolutionChoice::Skip => None,
        };
        match chosen {
            Some(collection) => {
                files
                    .get_or_insert_with(Default::default)
                    .insert(conflict.path.clone(), collection.clone());
            }
            None => {
                if let Some(files) = files.as_mut() {
                    files.remove(&conflict.path);
                }
            }
        }
    }

    DocumentSnapshot { todos, files }
}

fn resolve_items(
    merged: &[Item],
    conflicts: &[ConflictRecord],
    resolutions: &Resolutions,
    base: &[Item],
) -> Collection {
    let mut result = merged.to_vec();
    let mut pending: Vec<Item> = conflicts
        .iter()
        .filter_map(|conflict| {
            match resolutions
                .item_choice(conflict.item_id)
                .unwrap_or(ResolutionChoice::Skip)
            {
                ResolutionChoice::Local => conflict.local.clone(),
                ResolutionChoice::Remote => conflict.remote.clone(),
                ResolutionChoice::Skip => None,
            }
        })
        .collect();

    let base_order: Vec<ItemId> = base.iter().map(|item| item.id).collect();
    for (position, base_item) in base.iter().enumerate() {
        let Some(index) = pending.iter().position(|item| item.id == base_item.id) else {
            continue;
        };
        let item = pending.remove(index);
        let at = insertion_index(&result, &base_order, position);
        result.insert(at, item);
    }

    result.extend(pending);
    result
}
