//! Data models for todosync

mod conflict;
mod document;
mod item;
mod scope;

pub use conflict::{
    CollectionConflict, CollectionConflictKind, CollectionResolution, ConflictKind,
    ConflictRecord, ConflictSet, ItemResolution, ResolutionChoice, Resolutions,
};
pub use document::{Collection, DocumentSnapshot, NamedCollectionMap};
pub use item::{Item, ItemId};
pub use scope::{DocumentScope, SyncMode};
