//! Neo4j connection management and shared graph client.

use std::time::Duration;

use factgraph_core::StoreError;
use neo4rs::{ConfigBuilder, Graph, Query};
use serde::Deserialize;

/// Errors from graph operations.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("Neo4j connection error: {0}")]
    Connection(String),

    #[error("Neo4j query error: {0}")]
    Query(#[from] neo4rs::Error),

    #[error("Refusing to interpolate identifier '{0}' into Cypher")]
    InvalidIdentifier(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<GraphError> for StoreError {
    fn from(err: GraphError) -> Self {
        match err {
            GraphError::Connection(msg) => StoreError::Unavailable(msg),
            other => StoreError::Graph(other.to_string()),
        }
    }
}

/// Configuration for connecting to Neo4j.
#[derive(Debug, Clone, Deserialize)]
pub struct GraphConfig {
    #[serde(default = "default_uri")]
    pub uri: String,
    #[serde(default = "default_user")]
    pub user: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_fetch_size")]
    pub fetch_size: usize,
    /// Upper bound for connecting and preparing the schema.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

fn default_uri() -> String {
    "bolt://localhost:7687".to_string()
}

fn default_user() -> String {
    "neo4j".to_string()
}

fn default_max_connections() -> u32 {
    4
}

fn default_fetch_size() -> usize {
    256
}

fn default_connect_timeout_secs() -> u64 {
    10
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            uri: default_uri(),
            user: default_user(),
            password: "factgraph-dev".to_string(),
            max_connections: default_max_connections(),
            fetch_size: default_fetch_size(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

/// Neo4j graph client with connection pooling.
///
/// Clone is cheap (inner Arc).
#[derive(Clone)]
pub struct GraphClient {
    graph: Graph,
}

impl GraphClient {
    /// Connect to Neo4j with the given configuration.
    pub async fn connect(config: &GraphConfig) -> Result<Self, GraphError> {
        let neo_config = ConfigBuilder::default()
            .uri(&config.uri)
            .user(&config.user)
            .password(&config.password)
            .max_connections(config.max_connections as usize)
            .fetch_size(config.fetch_size)
            .build()
            .map_err(|e| GraphError::Connection(e.to_string()))?;

        let graph = Graph::connect(neo_config)
            .await
            .map_err(|e| GraphError::Connection(e.to_string()))?;

        tracing::info!(uri = %config.uri, "Connected to Neo4j");
        Ok(Self { graph })
    }

    /// Connect and create the schema, giving up after
    /// `connect_timeout_secs`.
    pub async fn connect_ready(config: &GraphConfig) -> Result<Self, GraphError> {
        let ready = async {
            let client = Self::connect(config).await?;
            client.ensure_schema().await?;
            Ok::<_, GraphError>(client)
        };
        tokio::time::timeout(Duration::from_secs(config.connect_timeout_secs), ready)
            .await
            .map_err(|_| {
                GraphError::Connection(format!(
                    "no answer from {} within {}s",
                    config.uri, config.connect_timeout_secs
                ))
            })?
    }

    /// Create the uniqueness constraint that backs entity MERGEs.
    pub async fn ensure_schema(&self) -> Result<(), GraphError> {
        self.run(neo4rs::query(
            "CREATE CONSTRAINT entity_name IF NOT EXISTS
             FOR (n:Entity) REQUIRE n.name IS UNIQUE",
        ))
        .await
    }

    /// Execute a write-only query (CREATE, MERGE, DELETE, SET).
    pub async fn run(&self, query: Query) -> Result<(), GraphError> {
        self.graph.run(query).await?;
        Ok(())
    }

    /// Execute a read query and collect all rows.
    pub async fn query_rows(&self, query: Query) -> Result<Vec<neo4rs::Row>, GraphError> {
        let mut stream = self.graph.execute(query).await?;
        let mut rows = Vec::new();
        while let Some(row) = stream.next().await? {
            rows.push(row);
        }
        Ok(rows)
    }

    /// Execute a read query and return the first row, if any.
    pub async fn query_one(&self, query: Query) -> Result<Option<neo4rs::Row>, GraphError> {
        let mut stream = self.graph.execute(query).await?;
        Ok(stream.next().await?)
    }

    /// Begin a transaction.
    pub async fn start_txn(&self) -> Result<neo4rs::Txn, GraphError> {
        Ok(self.graph.start_txn().await?)
    }
}
