//! Relational mirror of the fact graph.
//!
//! Every mutation becomes an `INSERT .. ON CONFLICT` so the mirror shares
//! the graph's upsert semantics. A batch runs in one transaction; sqlx rolls
//! it back if the transaction is dropped before commit.

use chrono::Utc;
use sqlx::{Sqlite, Transaction};

use factgraph_core::{GraphMutation, GraphStore, StoreError, TypedValue, ValueKind};

use crate::{Result, SqlError, SqliteDatabase};

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS entities (
        name TEXT PRIMARY KEY,
        first_seen TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS relationships (
        from_name TEXT NOT NULL REFERENCES entities(name),
        rel_type TEXT NOT NULL,
        to_name TEXT NOT NULL REFERENCES entities(name),
        first_seen TEXT NOT NULL,
        PRIMARY KEY (from_name, rel_type, to_name)
    )",
    "CREATE TABLE IF NOT EXISTS properties (
        entity TEXT NOT NULL REFERENCES entities(name),
        attribute TEXT NOT NULL,
        kind TEXT NOT NULL,
        value TEXT NOT NULL,
        PRIMARY KEY (entity, attribute)
    )",
];

/// A mirrored relationship row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorRelationship {
    pub from: String,
    pub rel_type: String,
    pub to: String,
}

/// SQLite-backed mirror of the fact graph.
#[derive(Clone)]
pub struct SqliteMirror {
    db: SqliteDatabase,
}

impl SqliteMirror {
    /// Create the mirror, ensuring its tables exist.
    pub async fn new(db: SqliteDatabase) -> Result<Self> {
        for stmt in SCHEMA {
            sqlx::query(stmt).execute(db.pool()).await?;
        }
        Ok(Self { db })
    }

    /// Apply a batch in one transaction.
    pub async fn apply_mutations(&self, mutations: &[GraphMutation]) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        let mut tx = self.db.pool().begin().await?;

        for mutation in mutations {
            apply_one(&mut tx, mutation, &now).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Delete every mirrored fact. Returns the number of entities removed.
    pub async fn clear(&self) -> Result<u64> {
        let mut tx = self.db.pool().begin().await?;
        sqlx::query("DELETE FROM properties")
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM relationships")
            .execute(&mut *tx)
            .await?;
        let removed = sqlx::query("DELETE FROM entities")
            .execute(&mut *tx)
            .await?
            .rows_affected();
        tx.commit().await?;
        Ok(removed)
    }

    pub async fn entity_count(&self) -> Result<i64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM entities")
            .fetch_one(self.db.pool())
            .await?;
        Ok(row.0)
    }

    pub async fn relationships(&self) -> Result<Vec<MirrorRelationship>> {
        let rows: Vec<(String, String, String)> = sqlx::query_as(
            "SELECT from_name, rel_type, to_name FROM relationships
             ORDER BY from_name, rel_type, to_name",
        )
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows
            .into_iter()
            .map(|(from, rel_type, to)| MirrorRelationship { from, rel_type, to })
            .collect())
    }

    /// Read back a typed property.
    pub async fn property(&self, entity: &str, attribute: &str) -> Result<Option<TypedValue>> {
        let row: Option<(String, String)> = sqlx::query_as(
            "SELECT kind, value FROM properties WHERE entity = ? AND attribute = ?",
        )
        .bind(entity)
        .bind(attribute)
        .fetch_optional(self.db.pool())
        .await?;

        row.map(|(kind, value)| decode_value(&kind, value)).transpose()
    }
}

async fn apply_one(
    tx: &mut Transaction<'_, Sqlite>,
    mutation: &GraphMutation,
    now: &str,
) -> Result<()> {
    match mutation {
        GraphMutation::UpsertNode { id } => {
            upsert_entity(tx, id, now).await?;
        }
        GraphMutation::UpsertRelationship { from, rel_type, to } => {
            upsert_entity(tx, from, now).await?;
            upsert_entity(tx, to, now).await?;
            sqlx::query(
                "INSERT INTO relationships (from_name, rel_type, to_name, first_seen)
                 VALUES (?, ?, ?, ?)
                 ON CONFLICT(from_name, rel_type, to_name) DO NOTHING",
            )
            .bind(from)
            .bind(rel_type)
            .bind(to)
            .bind(now)
            .execute(&mut **tx)
            .await?;
        }
        GraphMutation::SetProperty {
            node,
            attribute,
            value,
        } => {
            upsert_entity(tx, node, now).await?;
            sqlx::query(
                "INSERT INTO properties (entity, attribute, kind, value)
                 VALUES (?, ?, ?, ?)
                 ON CONFLICT(entity, attribute) DO UPDATE SET
                   kind = excluded.kind, value = excluded.value",
            )
            .bind(node)
            .bind(attribute)
            .bind(kind_name(value.kind()))
            .bind(value.as_text())
            .execute(&mut **tx)
            .await?;
        }
    }
    Ok(())
}

async fn upsert_entity(tx: &mut Transaction<'_, Sqlite>, name: &str, now: &str) -> Result<()> {
    sqlx::query(
        "INSERT INTO entities (name, first_seen) VALUES (?, ?)
         ON CONFLICT(name) DO NOTHING",
    )
    .bind(name)
    .bind(now)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

fn kind_name(kind: ValueKind) -> &'static str {
    match kind {
        ValueKind::Node => "node",
        ValueKind::Date => "date",
    }
}

fn decode_value(kind: &str, value: String) -> Result<TypedValue> {
    match kind {
        "node" => Ok(TypedValue::Node(value)),
        "date" => chrono::NaiveDate::parse_from_str(&value, "%Y-%m-%d")
            .map(TypedValue::Date)
            .map_err(|e| SqlError::Corrupt(format!("bad date '{value}': {e}"))),
        other => Err(SqlError::Corrupt(format!("unknown value kind '{other}'"))),
    }
}

impl GraphStore for SqliteMirror {
    async fn apply(&self, mutations: &[GraphMutation]) -> std::result::Result<(), StoreError> {
        self.apply_mutations(mutations)
            .await
            .map_err(|e| StoreError::Graph(e.to_string()))
    }

    async fn reset_domain(&self) -> std::result::Result<u64, StoreError> {
        let removed = self
            .clear()
            .await
            .map_err(|e| StoreError::Graph(e.to_string()))?;
        tracing::info!(removed, "SQLite mirror reset");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    async fn mirror() -> SqliteMirror {
        SqliteMirror::new(SqliteDatabase::in_memory().await.unwrap())
            .await
            .unwrap()
    }

    fn toma(from: &str, to: &str) -> Vec<GraphMutation> {
        vec![
            GraphMutation::UpsertNode {
                id: from.to_string(),
            },
            GraphMutation::UpsertNode { id: to.to_string() },
            GraphMutation::UpsertRelationship {
                from: from.to_string(),
                rel_type: "TOMA".to_string(),
                to: to.to_string(),
            },
        ]
    }

    #[tokio::test]
    async fn relation_upsert_is_idempotent() {
        let mirror = mirror().await;
        let muts = toma("Juan", "Ibuprofeno");

        mirror.apply(&muts).await.unwrap();
        mirror.apply(&muts).await.unwrap();

        assert_eq!(mirror.entity_count().await.unwrap(), 2);
        assert_eq!(
            mirror.relationships().await.unwrap(),
            vec![MirrorRelationship {
                from: "Juan".to_string(),
                rel_type: "TOMA".to_string(),
                to: "Ibuprofeno".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn properties_round_trip_with_kind() {
        let mirror = mirror().await;
        let date = NaiveDate::from_ymd_opt(2020, 1, 10).unwrap();
        mirror
            .apply(&[
                GraphMutation::SetProperty {
                    node: "Juan".to_string(),
                    attribute: "fecha_inicio".to_string(),
                    value: TypedValue::Date(date),
                },
                GraphMutation::SetProperty {
                    node: "Juan".to_string(),
                    attribute: "periodicidad".to_string(),
                    value: TypedValue::Node("cada 8 horas".to_string()),
                },
            ])
            .await
            .unwrap();

        assert_eq!(
            mirror.property("Juan", "fecha_inicio").await.unwrap(),
            Some(TypedValue::Date(date))
        );
        assert_eq!(
            mirror.property("Juan", "periodicidad").await.unwrap(),
            Some(TypedValue::Node("cada 8 horas".to_string()))
        );
        assert_eq!(mirror.property("Juan", "edad").await.unwrap(), None);
    }

    #[tokio::test]
    async fn set_property_overwrites() {
        let mirror = mirror().await;
        for value in ["leve", "alta"] {
            mirror
                .apply(&[GraphMutation::SetProperty {
                    node: "Migraña".to_string(),
                    attribute: "gravedad".to_string(),
                    value: TypedValue::Node(value.to_string()),
                }])
                .await
                .unwrap();
        }
        assert_eq!(
            mirror.property("Migraña", "gravedad").await.unwrap(),
            Some(TypedValue::Node("alta".to_string()))
        );
    }

    #[tokio::test]
    async fn failing_batch_writes_nothing() {
        let mirror = mirror().await;
        sqlx::query("DROP TABLE properties")
            .execute(mirror.db.pool())
            .await
            .unwrap();

        let mut muts = toma("Juan", "Ibuprofeno");
        muts.push(GraphMutation::SetProperty {
            node: "Juan".to_string(),
            attribute: "edad".to_string(),
            value: TypedValue::Node("80".to_string()),
        });

        assert!(mirror.apply(&muts).await.is_err());
        assert_eq!(mirror.entity_count().await.unwrap(), 0);
        assert!(mirror.relationships().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn reset_removes_everything() {
        let mirror = mirror().await;
        mirror.apply(&toma("Ana", "Paracetamol")).await.unwrap();

        assert_eq!(mirror.reset_domain().await.unwrap(), 2);
        assert_eq!(mirror.entity_count().await.unwrap(), 0);
        assert!(mirror.relationships().await.unwrap().is_empty());
    }
}
