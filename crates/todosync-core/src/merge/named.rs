//! Three-way merge of path-keyed collections.
//!
//! Each path is compared as a whole: two collections are "the same" only when
//! structurally equal. A path both sides changed differently is reported as a
//! single conflict instead of being merged item by item.

use std::collections::BTreeSet;

use super::{classify, Classification};
use crate::models::{CollectionConflict, NamedCollectionMap};

/// Result of merging named collections.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamedMerge {
    pub merged: NamedCollectionMap,
    pub conflicts: Vec<CollectionConflict>,
}

#[must_use]
pub fn merge_named_collections(
    base: &NamedCollectionMap,
    local: &NamedCollectionMap,
    remote: &NamedCollectionMap,
) -> NamedMerge {
    let paths: BTreeSet<&String> = base.keys().chain(local.keys()).chain(remote.keys()).collect();

    let mut result = NamedMerge::default();
    for path in paths {
        let in_base = base.get(path);
        let in_local = local.get(path);
        let in_remote = remote.get(path);

        match classify(in_base, in_local, in_remote) {
            Classification::Keep(collection) => {
                result.merged.insert(path.clone(), collection.clone());
            }
            Classification::Drop => {}
            Classification::Conflict(divergence) => result.conflicts.push(CollectionConflict {
                path: path.clone(),
                base: in_base.cloned(),
                local: in_local.cloned(),
                remote: in_remote.cloned(),
                kind: divergence.into(),
            }),
        }
    }
    result
}
