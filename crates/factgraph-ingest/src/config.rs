//! Configuration for the factgraph ingestion service.
//!
//! Loaded from (in priority order):
//! 1. Environment variables (`FACTGRAPH__INGEST__SQLITE_PATH`, ...)
//! 2. Config file (`factgraph.toml` by default)
//! 3. Defaults
//!
//! Neo4j is optional: it is used only when a `[neo4j]` section exists.

use std::collections::HashMap;

use factgraph_graph::GraphConfig;
use serde::Deserialize;

use crate::error::{IngestError, Result};

/// The `[ingest]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct IngestConfig {
    /// SQLite file holding the relational mirror and the processing log.
    #[serde(default = "default_sqlite_path")]
    pub sqlite_path: String,

    /// Clear the log and reset the domain when a session starts.
    #[serde(default = "default_true")]
    pub reset_on_start: bool,

    /// Conversation turns seen before the first payload is produced.
    #[serde(default = "default_min_turns")]
    pub min_turns: usize,

    /// Named texts, selectable with `TextSource::Key`.
    #[serde(default)]
    pub texts: HashMap<String, String>,
}

fn default_sqlite_path() -> String {
    "./data/users/demo.sqlite".to_string()
}

fn default_true() -> bool {
    true
}

fn default_min_turns() -> usize {
    2
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            sqlite_path: default_sqlite_path(),
            reset_on_start: default_true(),
            min_turns: default_min_turns(),
            texts: HashMap::new(),
        }
    }
}

/// Everything the binary needs.
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub ingest: IngestConfig,
    pub neo4j: Option<GraphConfig>,
}

/// Load configuration from `{file_prefix}.toml` (optional) and the
/// environment.
pub fn load(file_prefix: &str) -> Result<AppConfig> {
    let cfg = config::Config::builder()
        .add_source(config::File::with_name(file_prefix).required(false))
        .add_source(
            config::Environment::with_prefix("FACTGRAPH")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .map_err(|e| IngestError::Config(e.to_string()))?;

    let ingest = match cfg.get::<IngestConfig>("ingest") {
        Ok(c) => c,
        Err(config::ConfigError::NotFound(_)) => IngestConfig::default(),
        Err(e) => return Err(IngestError::Config(e.to_string())),
    };

    let neo4j = match cfg.get::<GraphConfig>("neo4j") {
        Ok(c) => Some(c),
        Err(config::ConfigError::NotFound(_)) => None,
        Err(e) => return Err(IngestError::Config(e.to_string())),
    };

    Ok(AppConfig { ingest, neo4j })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = IngestConfig::default();
        assert_eq!(config.sqlite_path, "./data/users/demo.sqlite");
        assert!(config.reset_on_start);
        assert_eq!(config.min_turns, 2);
        assert!(config.texts.is_empty());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let prefix = dir.path().join("factgraph");
        std::fs::write(
            dir.path().join("factgraph.toml"),
            r#"
[ingest]
sqlite_path = "/tmp/x.sqlite"
reset_on_start = false

[ingest.texts]
demo = "Juan toma Ibuprofeno"

[neo4j]
uri = "bolt://graph:7687"
password = "secret"
"#,
        )
        .unwrap();

        let config = load(prefix.to_str().unwrap()).unwrap();
        assert_eq!(config.ingest.sqlite_path, "/tmp/x.sqlite");
        assert!(!config.ingest.reset_on_start);
        assert_eq!(config.ingest.min_turns, 2);
        assert_eq!(
            config.ingest.texts.get("demo").map(String::as_str),
            Some("Juan toma Ibuprofeno")
        );
        let neo4j = config.neo4j.unwrap();
        assert_eq!(neo4j.uri, "bolt://graph:7687");
        assert_eq!(neo4j.user, "neo4j");
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let prefix = dir.path().join("absent");
        let config = load(prefix.to_str().unwrap()).unwrap();
        assert_eq!(config.ingest.min_turns, 2);
        assert!(config.neo4j.is_none());
    }
}
