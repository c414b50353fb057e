//! Store collaborator traits.
//!
//! The pipeline writes through two independent collaborators: a graph store
//! that applies [`GraphMutation`]s and an append-only log of processed text.
//! Implementations live in factgraph-graph (Neo4j), factgraph-sql (SQLite),
//! and [`crate::memory`].

use std::future::Future;

use crate::error::StoreError;
use crate::types::{GraphMutation, LogEntry};

/// A store that applies graph mutations with upsert semantics.
pub trait GraphStore: Send + Sync {
    /// Apply one payload's mutations. Implementations apply the batch
    /// atomically: on error, none of the batch is visible.
    fn apply(
        &self,
        mutations: &[GraphMutation],
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Remove every entity and relationship. Returns the number of entities
    /// removed.
    fn reset_domain(&self) -> impl Future<Output = Result<u64, StoreError>> + Send;
}

/// An append-only audit log of processed payloads.
pub trait LogStore: Send + Sync {
    /// Create the log table if it does not exist.
    fn ensure_table(&self) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn append(&self, entry: &LogEntry) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Delete every log row. Returns the number of rows removed.
    fn clear(&self) -> impl Future<Output = Result<u64, StoreError>> + Send;
}

/// Fan-out graph store: applies every batch to `primary`, then `mirror`.
///
/// Each side is atomic on its own. If the mirror fails after the primary
/// committed, the error is returned and the primary keeps the batch.
pub struct Tee<A, B> {
    pub primary: A,
    pub mirror: B,
}

impl<A, B> Tee<A, B> {
    pub fn new(primary: A, mirror: B) -> Self {
        Self { primary, mirror }
    }
}

impl<A: GraphStore, B: GraphStore> GraphStore for Tee<A, B> {
    async fn apply(&self, mutations: &[GraphMutation]) -> Result<(), StoreError> {
        self.primary.apply(mutations).await?;
        self.mirror.apply(mutations).await
    }

    /// Both sides are reset even if the first fails; the first error wins.
    async fn reset_domain(&self) -> Result<u64, StoreError> {
        let primary = self.primary.reset_domain().await;
        let mirror = self.mirror.reset_domain().await;
        match (primary, mirror) {
            (Ok(a), Ok(_)) => Ok(a),
            (Err(e), _) | (Ok(_), Err(e)) => Err(e),
        }
    }
}

impl<G: GraphStore> GraphStore for std::sync::Arc<G> {
    fn apply(
        &self,
        mutations: &[GraphMutation],
    ) -> impl Future<Output = Result<(), StoreError>> + Send {
        (**self).apply(mutations)
    }

    fn reset_domain(&self) -> impl Future<Output = Result<u64, StoreError>> + Send {
        (**self).reset_domain()
    }
}

impl<L: LogStore> LogStore for std::sync::Arc<L> {
    fn ensure_table(&self) -> impl Future<Output = Result<(), StoreError>> + Send {
        (**self).ensure_table()
    }

    fn append(&self, entry: &LogEntry) -> impl Future<Output = Result<(), StoreError>> + Send {
        (**self).append(entry)
    }

    fn clear(&self) -> impl Future<Output = Result<u64, StoreError>> + Send {
        (**self).clear()
    }
}
