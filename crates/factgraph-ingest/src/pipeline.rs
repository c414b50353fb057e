//! One payload, start to finish.
//!
//! Resolve text → extract → validate → build mutations → apply to the graph
//! → append to the log. Nothing here retries; the worker decides what a
//! failure means.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;

use factgraph_core::mutation::build_mutations;
use factgraph_core::validate::Normalizer;
use factgraph_core::{
    AssertionPayload, GraphMutation, GraphStore, LogEntry, LogStatus, LogStore, PayloadId,
    TextSource, Vocabulary,
};
use factgraph_sql::hash::text_hash;

use crate::error::{IngestError, Result};
use crate::extract::{RuleExtractor, TripletExtractor};

/// What one successful run did.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub payload_id: PayloadId,
    pub candidates: usize,
    pub accepted: usize,
    pub rejected: usize,
    pub dropped_properties: usize,
    pub mutations: Vec<GraphMutation>,
}

/// The ingestion pipeline, owned by the worker.
pub struct Pipeline<G, L, E = RuleExtractor> {
    vocab: Arc<Vocabulary>,
    extractor: E,
    graph: G,
    log: L,
    texts: HashMap<String, String>,
}

impl<G: GraphStore, L: LogStore> Pipeline<G, L, RuleExtractor> {
    /// Pipeline using the vocabulary-driven [`RuleExtractor`].
    pub fn new(vocab: Arc<Vocabulary>, graph: G, log: L) -> Self {
        let extractor = RuleExtractor::new(Arc::clone(&vocab));
        Self::with_extractor(vocab, extractor, graph, log)
    }
}

impl<G: GraphStore, L: LogStore, E: TripletExtractor> Pipeline<G, L, E> {
    pub fn with_extractor(vocab: Arc<Vocabulary>, extractor: E, graph: G, log: L) -> Self {
        Self {
            vocab,
            extractor,
            graph,
            log,
            texts: HashMap::new(),
        }
    }

    /// Named texts for [`TextSource::Key`] payloads.
    pub fn with_texts(mut self, texts: HashMap<String, String>) -> Self {
        self.texts = texts;
        self
    }

    pub fn graph(&self) -> &G {
        &self.graph
    }

    pub fn log(&self) -> &L {
        &self.log
    }

    fn resolve_text<'a>(&'a self, source: &'a TextSource) -> Result<&'a str> {
        let text = match source {
            TextSource::Literal(text) => text.as_str(),
            TextSource::Key(key) => self
                .texts
                .get(key)
                .map(String::as_str)
                .ok_or_else(|| IngestError::UnknownTextKey(key.clone()))?,
        };
        if text.trim().is_empty() {
            return Err(IngestError::EmptyText);
        }
        Ok(text)
    }

    /// Run one payload through every stage.
    pub async fn process(&self, payload: &AssertionPayload) -> Result<RunReport> {
        let text = self.resolve_text(&payload.source)?;

        let candidates = self.extractor.extract(text, payload.id);
        let batch = Normalizer::new(&self.vocab).normalize_batch(&candidates);
        let mutations = build_mutations(&batch.triplets);

        let report = RunReport {
            payload_id: payload.id,
            candidates: candidates.len(),
            accepted: batch.triplets.len(),
            rejected: batch.rejections.len(),
            dropped_properties: batch.value_errors.len(),
            mutations,
        };

        tracing::debug!(
            payload_id = %payload.id,
            candidates = report.candidates,
            accepted = report.accepted,
            rejected = report.rejected,
            "Payload validated"
        );

        if let Err(err) = self.graph.apply(&report.mutations).await {
            let entry = log_entry(text, &report, LogStatus::Failed, Some(err.to_string()));
            if let Err(log_err) = self.log.append(&entry).await {
                tracing::warn!(
                    payload_id = %payload.id,
                    error = %log_err,
                    "Could not record failed payload"
                );
            }
            return Err(err.into());
        }

        self.log
            .append(&log_entry(text, &report, LogStatus::Applied, None))
            .await?;

        tracing::info!(
            payload_id = %payload.id,
            mutations = report.mutations.len(),
            "Payload applied"
        );
        Ok(report)
    }
}

fn log_entry(text: &str, report: &RunReport, status: LogStatus, error: Option<String>) -> LogEntry {
    LogEntry {
        payload_id: report.payload_id,
        text: text.to_string(),
        text_hash: text_hash(text),
        status,
        candidates: report.candidates as u32,
        accepted: report.accepted as u32,
        rejected: report.rejected as u32,
        dropped_properties: report.dropped_properties as u32,
        mutations: report.mutations.len() as u32,
        error,
        logged_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use factgraph_core::memory::{MemoryGraph, MemoryLog};
    use factgraph_core::{StoreError, TypedValue};

    use super::*;

    struct DownGraph;

    impl GraphStore for DownGraph {
        async fn apply(&self, _mutations: &[GraphMutation]) -> std::result::Result<(), StoreError> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }

        async fn reset_domain(&self) -> std::result::Result<u64, StoreError> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }
    }

    fn pipeline() -> Pipeline<MemoryGraph, MemoryLog> {
        let vocab = Arc::new(Vocabulary::builtin().unwrap());
        Pipeline::new(vocab, MemoryGraph::new(), MemoryLog::new())
    }

    #[tokio::test]
    async fn relation_reaches_graph_and_log() {
        let p = pipeline();
        let payload = AssertionPayload::literal("Juan toma Ibuprofeno");

        let report = p.process(&payload).await.unwrap();

        assert_eq!(report.accepted, 1);
        assert_eq!(
            report.mutations,
            vec![
                GraphMutation::UpsertNode {
                    id: "Juan".to_string()
                },
                GraphMutation::UpsertNode {
                    id: "Ibuprofeno".to_string()
                },
                GraphMutation::UpsertRelationship {
                    from: "Juan".to_string(),
                    rel_type: "TOMA".to_string(),
                    to: "Ibuprofeno".to_string(),
                },
            ]
        );
        assert!(p.graph().has_relationship("Juan", "TOMA", "Ibuprofeno"));

        let entries = p.log().entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].payload_id, payload.id);
        assert_eq!(entries[0].status, LogStatus::Applied);
        assert_eq!(entries[0].text_hash, text_hash("Juan toma Ibuprofeno"));
    }

    #[tokio::test]
    async fn date_property_is_typed() {
        let p = pipeline();
        let report = p
            .process(&AssertionPayload::literal("Juan inicio: 10/01/2020"))
            .await
            .unwrap();

        let date = TypedValue::Date(NaiveDate::from_ymd_opt(2020, 1, 10).unwrap());
        assert_eq!(
            report.mutations,
            vec![
                GraphMutation::UpsertNode {
                    id: "Juan".to_string()
                },
                GraphMutation::SetProperty {
                    node: "Juan".to_string(),
                    attribute: "fecha_inicio".to_string(),
                    value: date.clone(),
                },
            ]
        );
        assert_eq!(p.graph().property("Juan", "fecha_inicio"), Some(date));
    }

    #[tokio::test]
    async fn bad_date_drops_property_but_keeps_node() {
        let p = pipeline();
        let report = p
            .process(&AssertionPayload::literal("Juan inicio: not-a-date"))
            .await
            .unwrap();

        assert_eq!(report.dropped_properties, 1);
        assert_eq!(
            report.mutations,
            vec![GraphMutation::UpsertNode {
                id: "Juan".to_string()
            }]
        );
        assert!(p.graph().has_node("Juan"));
        assert_eq!(p.graph().property("Juan", "fecha_inicio"), None);
    }

    #[tokio::test]
    async fn unknown_predicate_is_rejected() {
        let p = pipeline();
        let report = p
            .process(&AssertionPayload::literal(
                "Juan | odia | Lunes\nJuan toma Ibuprofeno",
            ))
            .await
            .unwrap();

        assert_eq!(report.candidates, 2);
        assert_eq!(report.rejected, 1);
        assert_eq!(report.accepted, 1);
        assert!(!p.graph().has_node("Lunes"));
    }

    #[tokio::test]
    async fn replay_is_idempotent() {
        let p = pipeline();
        let text = "Juan toma Ibuprofeno\nJuan padece Migraña";
        p.process(&AssertionPayload::literal(text)).await.unwrap();
        let nodes = p.graph().node_count();
        let rels = p.graph().relationship_count();

        p.process(&AssertionPayload::literal(text)).await.unwrap();

        assert_eq!(p.graph().node_count(), nodes);
        assert_eq!(p.graph().relationship_count(), rels);
        assert_eq!(p.log().entries().len(), 2);
    }

    #[tokio::test]
    async fn keyed_text_resolves_from_catalog() {
        let texts = HashMap::from([("demo".to_string(), "Ana padece Asma".to_string())]);
        let p = pipeline().with_texts(texts);

        p.process(&AssertionPayload::keyed("demo")).await.unwrap();
        assert!(p.graph().has_relationship("Ana", "PADECE", "Asma"));

        let err = p.process(&AssertionPayload::keyed("missing")).await.unwrap_err();
        assert!(matches!(err, IngestError::UnknownTextKey(k) if k == "missing"));
    }

    #[tokio::test]
    async fn empty_text_is_refused() {
        let p = pipeline();
        let err = p.process(&AssertionPayload::literal("  \n ")).await.unwrap_err();
        assert!(matches!(err, IngestError::EmptyText));
        assert!(p.log().entries().is_empty());
    }

    #[tokio::test]
    async fn graph_failure_logs_failed_entry() {
        let vocab = Arc::new(Vocabulary::builtin().unwrap());
        let p = Pipeline::new(vocab, DownGraph, MemoryLog::new());

        let err = p
            .process(&AssertionPayload::literal("Juan toma Ibuprofeno"))
            .await
            .unwrap_err();

        assert!(matches!(err, IngestError::Persistence(StoreError::Unavailable(_))));
        let entries = p.log().entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].status, LogStatus::Failed);
        assert_eq!(entries[0].error.as_deref(), Some("Store unavailable: connection refused"));
    }
}
