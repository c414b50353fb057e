//! Write operations for the fact graph.
//!
//! All mutations use MERGE (upsert) semantics so replaying a payload leaves
//! the graph unchanged. Entities are identified by `name`. Relationship types
//! and attribute names are interpolated into Cypher, so they are checked
//! against a strict identifier pattern first.

use chrono::Utc;
use neo4rs::{query, Query};

use factgraph_core::{GraphMutation, GraphStore, StoreError, TypedValue};

use crate::client::{GraphClient, GraphError};

/// Node properties managed by the store itself.
const RESERVED_ATTRIBUTES: &[&str] = &["name", "first_seen"];

impl GraphClient {
    /// Apply a batch of mutations in a single transaction.
    ///
    /// Queries are built (and identifiers checked) before the transaction
    /// starts; on any failure the transaction is rolled back.
    pub async fn apply_mutations(&self, mutations: &[GraphMutation]) -> Result<(), GraphError> {
        if mutations.is_empty() {
            return Ok(());
        }

        let now = Utc::now().to_rfc3339();
        let queries = mutations
            .iter()
            .map(|m| mutation_query(m, &now))
            .collect::<Result<Vec<_>, _>>()?;

        let mut txn = self.start_txn().await?;
        for q in queries {
            if let Err(e) = txn.run(q).await {
                if let Err(rollback) = txn.rollback().await {
                    tracing::warn!(error = %rollback, "Rollback failed");
                }
                return Err(e.into());
            }
        }
        txn.commit().await?;

        tracing::debug!(mutations = mutations.len(), "Graph batch committed");
        Ok(())
    }

    /// Delete every entity and its relationships. Returns the entity count.
    pub async fn clear_entities(&self) -> Result<i64, GraphError> {
        let q = query(
            "MATCH (n:Entity)
             DETACH DELETE n
             RETURN count(n) AS cnt",
        );

        match self.query_one(q).await? {
            Some(row) => Ok(row.get::<i64>("cnt").unwrap_or(0)),
            None => Ok(0),
        }
    }
}

impl GraphStore for GraphClient {
    async fn apply(&self, mutations: &[GraphMutation]) -> Result<(), StoreError> {
        Ok(self.apply_mutations(mutations).await?)
    }

    async fn reset_domain(&self) -> Result<u64, StoreError> {
        let removed = self.clear_entities().await?;
        tracing::info!(removed, "Neo4j domain reset");
        Ok(removed.max(0) as u64)
    }
}

// ── Cypher ───────────────────────────────────────────────────────

/// Cypher text for a mutation.
pub fn mutation_cypher(mutation: &GraphMutation) -> Result<String, GraphError> {
    let cypher = match mutation {
        GraphMutation::UpsertNode { .. } => "MERGE (n:Entity {name: $id})
             ON CREATE SET n.first_seen = $now"
            .to_string(),
        GraphMutation::UpsertRelationship { rel_type, .. } => {
            check_relation_type(rel_type)?;
            format!(
                "MERGE (a:Entity {{name: $from}})
                 ON CREATE SET a.first_seen = $now
                 MERGE (b:Entity {{name: $to}})
                 ON CREATE SET b.first_seen = $now
                 MERGE (a)-[r:{rel_type}]->(b)
                 ON CREATE SET r.first_seen = $now"
            )
        }
        GraphMutation::SetProperty { attribute, .. } => {
            check_attribute(attribute)?;
            format!(
                "MERGE (n:Entity {{name: $node}})
                 ON CREATE SET n.first_seen = $now
                 SET n.{attribute} = $value"
            )
        }
    };
    Ok(cypher)
}

/// Parameterized query for a mutation.
pub fn mutation_query(mutation: &GraphMutation, now: &str) -> Result<Query, GraphError> {
    let cypher = mutation_cypher(mutation)?;
    let q = query(&cypher).param("now", now.to_string());

    let q = match mutation {
        GraphMutation::UpsertNode { id } => q.param("id", id.clone()),
        GraphMutation::UpsertRelationship { from, to, .. } => {
            q.param("from", from.clone()).param("to", to.clone())
        }
        GraphMutation::SetProperty { node, value, .. } => {
            let q = q.param("node", node.clone());
            match value {
                TypedValue::Node(s) => q.param("value", s.clone()),
                TypedValue::Date(d) => q.param("value", *d),
            }
        }
    };
    Ok(q)
}

fn check_relation_type(s: &str) -> Result<(), GraphError> {
    let mut chars = s.chars();
    let ok = matches!(chars.next(), Some(c) if c.is_ascii_uppercase())
        && chars.all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_');
    if ok {
        Ok(())
    } else {
        Err(GraphError::InvalidIdentifier(s.to_string()))
    }
}

fn check_attribute(s: &str) -> Result<(), GraphError> {
    let mut chars = s.chars();
    let ok = matches!(chars.next(), Some(c) if c.is_ascii_lowercase())
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        && !RESERVED_ATTRIBUTES.contains(&s);
    if ok {
        Ok(())
    } else {
        Err(GraphError::InvalidIdentifier(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    #[test]
    fn relationship_cypher_uses_canonical_type() {
        let cypher = mutation_cypher(&GraphMutation::UpsertRelationship {
            from: "Juan".to_string(),
            rel_type: "TOMA".to_string(),
            to: "Ibuprofeno".to_string(),
        })
        .unwrap();
        assert!(cypher.contains("MERGE (a)-[r:TOMA]->(b)"));
        assert!(!cypher.contains("Juan"));
    }

    #[test]
    fn property_cypher_sets_attribute() {
        let cypher = mutation_cypher(&GraphMutation::SetProperty {
            node: "Juan".to_string(),
            attribute: "fecha_inicio".to_string(),
            value: TypedValue::Date(NaiveDate::from_ymd_opt(2020, 1, 10).unwrap()),
        })
        .unwrap();
        assert!(cypher.contains("SET n.fecha_inicio = $value"));
    }

    #[test]
    fn injected_identifiers_are_refused() {
        let err = mutation_cypher(&GraphMutation::UpsertRelationship {
            from: "a".to_string(),
            rel_type: "TOMA]->(x) DETACH DELETE x //".to_string(),
            to: "b".to_string(),
        })
        .unwrap_err();
        assert!(matches!(err, GraphError::InvalidIdentifier(_)));

        let err = mutation_cypher(&GraphMutation::SetProperty {
            node: "a".to_string(),
            attribute: "name".to_string(),
            value: TypedValue::Node("x".to_string()),
        })
        .unwrap_err();
        assert!(matches!(err, GraphError::InvalidIdentifier(_)));
    }

    #[test]
    fn node_cypher_is_a_merge() {
        let cypher = mutation_cypher(&GraphMutation::UpsertNode {
            id: "Juan".to_string(),
        })
        .unwrap();
        assert!(cypher.starts_with("MERGE (n:Entity {name: $id})"));
    }
}
