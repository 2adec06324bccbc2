//! Conflict resolution seam.

use async_trait::async_trait;

use crate::models::{ConflictSet, DocumentScope, DocumentSnapshot, ResolutionChoice, Resolutions};

/// Decides how to settle merge conflicts.
///
/// `auto_merged` is everything that merged cleanly and `base` the last
/// common snapshot, both for context. Returning `None` cancels the pass:
/// nothing is written locally or remotely.
#[async_trait]
pub trait ConflictResolver: Send + Sync {
    async fn resolve(
        &self,
        scope: DocumentScope,
        conflicts: &ConflictSet,
        auto_merged: &DocumentSnapshot,
        base: &DocumentSnapshot,
    ) -> Option<Resolutions>;
}

/// Answers every conflict with the same choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreferenceResolver {
    choice: ResolutionChoice,
}

impl PreferenceResolver {
    pub const fn new(choice: ResolutionChoice) -> Self {
        Self { choice }
    }
}

#[async_trait]
impl ConflictResolver for PreferenceResolver {
    async fn resolve(
        &self,
        scope: DocumentScope,
        conflicts: &ConflictSet,
        _auto_merged: &DocumentSnapshot,
        _base: &DocumentSnapshot,
    ) -> Option<Resolutions> {
        tracing::info!(
            "Resolving {} {} conflict(s) with '{}'",
            conflicts.len(),
            scope,
            self.choice
        );
        Some(Resolutions::uniform(conflicts, self.choice))
    }
}

/// Cancels every resolution, leaving conflicted documents untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct CancelResolver;

#[async_trait]
impl ConflictResolver for CancelResolver {
    async fn resolve(
        &self,
        scope: DocumentScope,
        conflicts: &ConflictSet,
        _auto_merged: &DocumentSnapshot,
        _base: &DocumentSnapshot,
    ) -> Option<Resolutions> {
        tracing::warn!(
            "{} {} conflict(s) left unresolved",
            conflicts.len(),
            scope
        );
        None
    }
}
