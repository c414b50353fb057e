//! Error types for the factgraph-ingest crate.

use factgraph_core::StoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("No text configured under key '{0}'")]
    UnknownTextKey(String),

    #[error("Payload text is empty")]
    EmptyText,

    #[error("Persistence error: {0}")]
    Persistence(#[from] StoreError),

    #[error("Ingestion queue is closed")]
    QueueClosed,

    #[error("Config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, IngestError>;
