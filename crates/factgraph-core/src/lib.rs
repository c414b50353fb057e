//! factgraph-core: the rule-based half of the fact ingestion platform.
//!
//! This crate owns everything between a candidate triplet and a list of
//! graph mutations:
//! - The closed vocabulary of relation and property verbs
//! - Value typing for property values (plain attributes and dates)
//! - Triplet validation and normalization
//! - Graph mutation building with upsert semantics
//! - Store traits implemented by the Neo4j, SQLite, and in-memory backends

pub mod error;
pub mod memory;
pub mod mutation;
pub mod store;
pub mod typer;
pub mod types;
pub mod validate;
pub mod vocabulary;

pub use error::{StoreError, ValueError, VocabularyError, VocabularyRejection};
pub use store::{GraphStore, LogStore, Tee};
pub use types::{
    AssertionPayload, CandidateTriplet, GraphMutation, LogEntry, LogStatus, PayloadId,
    PropertyRule, TextSource, Triplet, TypedValue, ValueKind,
};
pub use vocabulary::Vocabulary;
