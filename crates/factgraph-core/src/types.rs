//! Core domain types shared by every factgraph crate.
//!
//! A conversation turn produces an [`AssertionPayload`]; the extractor turns
//! its text into [`CandidateTriplet`]s; validation yields [`Triplet`]s; the
//! mutation builder emits [`GraphMutation`]s for the stores.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ── Payloads ──────────────────────────────────────────────────────

/// Unique identifier for an assertion payload.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct PayloadId(pub Uuid);

impl PayloadId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PayloadId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PayloadId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where a pipeline run takes its input text from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum TextSource {
    /// Use this text as-is.
    Literal(String),
    /// Look the text up by name in the configured text catalog.
    Key(String),
}

/// The unit placed on the ingestion queue, consumed exactly once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssertionPayload {
    pub id: PayloadId,
    pub source: TextSource,
    pub created_at: DateTime<Utc>,
}

impl AssertionPayload {
    pub fn new(source: TextSource) -> Self {
        Self {
            id: PayloadId::new(),
            source,
            created_at: Utc::now(),
        }
    }

    pub fn literal(text: impl Into<String>) -> Self {
        Self::new(TextSource::Literal(text.into()))
    }

    pub fn keyed(key: impl Into<String>) -> Self {
        Self::new(TextSource::Key(key.into()))
    }
}

// ── Triplets ──────────────────────────────────────────────────────

/// A raw (subject, predicate, object) record as produced by extraction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CandidateTriplet {
    pub subject: String,
    pub predicate: String,
    pub object: String,
    pub payload_id: PayloadId,
}

impl CandidateTriplet {
    pub fn new(
        subject: impl Into<String>,
        predicate: impl Into<String>,
        object: impl Into<String>,
        payload_id: PayloadId,
    ) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object: object.into(),
            payload_id,
        }
    }
}

/// How a property value is stored.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    Node,
    Date,
}

/// The attribute a property verb writes to, and the kind of value it holds.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct PropertyRule {
    pub attribute: &'static str,
    pub kind: ValueKind,
}

/// A property value after type resolution.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum TypedValue {
    Node(String),
    Date(NaiveDate),
}

impl TypedValue {
    /// Text form used by stores without a native date type.
    pub fn as_text(&self) -> String {
        match self {
            TypedValue::Node(s) => s.clone(),
            TypedValue::Date(d) => d.format("%Y-%m-%d").to_string(),
        }
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            TypedValue::Node(_) => ValueKind::Node,
            TypedValue::Date(_) => ValueKind::Date,
        }
    }
}

/// A validated, normalized fact.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "triplet_type", rename_all = "snake_case")]
pub enum Triplet {
    /// An edge between two entities.
    Relation {
        subject: String,
        relation_type: String,
        object: String,
        payload_id: PayloadId,
    },
    /// An attribute assignment. `value` is `None` when typing failed and the
    /// property was dropped; the subject entity is still upserted.
    Property {
        subject: String,
        attribute: String,
        value: Option<TypedValue>,
        payload_id: PayloadId,
    },
}

impl Triplet {
    pub fn subject(&self) -> &str {
        match self {
            Triplet::Relation { subject, .. } | Triplet::Property { subject, .. } => subject,
        }
    }
}

// ── Mutations ─────────────────────────────────────────────────────

/// An idempotent write against the graph. Entities are identified by name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum GraphMutation {
    UpsertNode {
        id: String,
    },
    UpsertRelationship {
        from: String,
        rel_type: String,
        to: String,
    },
    SetProperty {
        node: String,
        attribute: String,
        value: TypedValue,
    },
}

// ── Audit log ─────────────────────────────────────────────────────

/// Outcome recorded for a processed payload.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogStatus {
    Applied,
    Failed,
}

impl LogStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogStatus::Applied => "applied",
            LogStatus::Failed => "failed",
        }
    }
}

/// One row of the append-only processing log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogEntry {
    pub payload_id: PayloadId,
    pub text: String,
    /// BLAKE3 hex digest of `text`.
    pub text_hash: String,
    pub status: LogStatus,
    pub candidates: u32,
    pub accepted: u32,
    pub rejected: u32,
    pub dropped_properties: u32,
    pub mutations: u32,
    pub error: Option<String>,
    pub logged_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mutation_serializes_with_op_tag() {
        let m = GraphMutation::UpsertRelationship {
            from: "Juan".to_string(),
            rel_type: "TOMA".to_string(),
            to: "Ibuprofeno".to_string(),
        };
        let json = serde_json::to_string(&m).unwrap();
        assert!(json.contains("\"op\":\"upsert_relationship\""));
        assert!(json.contains("\"rel_type\":\"TOMA\""));
    }

    #[test]
    fn date_value_text_form_is_iso() {
        let v = TypedValue::Date(NaiveDate::from_ymd_opt(2020, 1, 10).unwrap());
        assert_eq!(v.as_text(), "2020-01-10");
        assert_eq!(v.kind(), ValueKind::Date);
    }

    #[test]
    fn text_source_tags() {
        let json = serde_json::to_string(&TextSource::Key("demo".to_string())).unwrap();
        assert_eq!(json, r#"{"kind":"key","value":"demo"}"#);
    }

    #[test]
    fn payload_ids_are_unique() {
        let a = AssertionPayload::literal("Juan toma Ibuprofeno");
        let b = AssertionPayload::literal("Juan toma Ibuprofeno");
        assert_ne!(a.id, b.id);
    }
}
