//! factgraph-ingest: conversation-driven fact ingestion.
//!
//! Conversation turns produce assertion payloads; a single background worker
//! drains them in order through extraction, validation, mutation building,
//! and the graph and log stores. Ingestion failures never reach the
//! conversation.

pub mod config;
pub mod conversation;
pub mod error;
pub mod extract;
pub mod pipeline;
pub mod session;
pub mod worker;
