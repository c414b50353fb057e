//! factgraph-graph: Neo4j store for the fact graph.
//!
//! Entities are `:Entity` nodes keyed by `name`; relationship types and
//! property names come from the closed vocabulary. Every write is a MERGE,
//! and each payload's mutations run in a single transaction.

pub mod client;
pub mod mutations;
pub mod queries;

pub use client::{GraphClient, GraphConfig, GraphError};
pub use queries::{EntityRecord, RelationshipRecord};
