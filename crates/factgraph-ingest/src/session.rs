//! Session start: connect the graph, wipe the log and the graph domain.
//!
//! Every step is attempted; a failing step becomes a warning and the
//! session goes on.

use serde::Serialize;

use factgraph_core::{GraphStore, LogStore};
use factgraph_graph::{GraphClient, GraphConfig};

/// A reset step that did not complete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResetWarning {
    pub step: &'static str,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ResetReport {
    pub log_rows_cleared: u64,
    pub entities_removed: u64,
    pub warnings: Vec<ResetWarning>,
}

impl ResetReport {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }

    fn warn(&mut self, step: &'static str, err: impl std::fmt::Display) {
        tracing::warn!(step, error = %err, "Session reset step failed");
        self.warnings.push(ResetWarning {
            step,
            message: err.to_string(),
        });
    }
}

/// Connect to Neo4j for this session. An unreachable server is logged and
/// the session continues without it.
pub async fn open_graph(config: &GraphConfig) -> Option<GraphClient> {
    match GraphClient::connect_ready(config).await {
        Ok(client) => Some(client),
        Err(e) => {
            tracing::warn!(uri = %config.uri, error = %e, "Neo4j unavailable; continuing without it");
            None
        }
    }
}

/// Ensure the log table, clear it, and reset the graph domain.
pub async fn reset_session<G: GraphStore, L: LogStore>(graph: &G, log: &L) -> ResetReport {
    let mut report = ResetReport::default();

    match log.ensure_table().await {
        Ok(()) => match log.clear().await {
            Ok(n) => report.log_rows_cleared = n,
            Err(e) => report.warn("clear_log", e),
        },
        Err(e) => report.warn("ensure_log_table", e),
    }

    match graph.reset_domain().await {
        Ok(n) => report.entities_removed = n,
        Err(e) => report.warn("reset_graph", e),
    }

    tracing::info!(
        log_rows_cleared = report.log_rows_cleared,
        entities_removed = report.entities_removed,
        warnings = report.warnings.len(),
        "Session reset"
    );
    report
}
