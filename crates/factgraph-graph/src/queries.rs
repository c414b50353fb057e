//! Read operations for inspecting the fact graph.

use chrono::NaiveDate;
use neo4rs::query;

use crate::client::{GraphClient, GraphError};

/// An entity with its attributes.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct EntityRecord {
    pub name: String,
    pub properties: serde_json::Value,
}

/// A relationship between two entities.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RelationshipRecord {
    pub from: String,
    pub rel_type: String,
    pub to: String,
}

impl GraphClient {
    /// Look up an entity by name.
    pub async fn get_entity(&self, name: &str) -> Result<Option<EntityRecord>, GraphError> {
        let q = query("MATCH (n:Entity {name: $name}) RETURN n").param("name", name.to_string());

        match self.query_one(q).await? {
            Some(row) => {
                let node: neo4rs::Node = row.get("n").map_err(|e| {
                    GraphError::Serialization(format!("Failed to deserialize node: {e}"))
                })?;
                Ok(Some(entity_record(&node)))
            }
            None => Ok(None),
        }
    }

    /// Count relationships of any type between two entities.
    pub async fn count_relationships(&self, from: &str, to: &str) -> Result<i64, GraphError> {
        let q = query(
            "MATCH (a:Entity {name: $from})-[r]->(b:Entity {name: $to})
             RETURN count(r) AS cnt",
        )
        .param("from", from.to_string())
        .param("to", to.to_string());

        match self.query_one(q).await? {
            Some(row) => Ok(row.get::<i64>("cnt").unwrap_or(0)),
            None => Ok(0),
        }
    }

    /// Outgoing relationships of an entity.
    pub async fn relationships_from(
        &self,
        name: &str,
    ) -> Result<Vec<RelationshipRecord>, GraphError> {
        let q = query(
            "MATCH (a:Entity {name: $name})-[r]->(b:Entity)
             RETURN type(r) AS rel_type, b.name AS to
             ORDER BY rel_type, to",
        )
        .param("name", name.to_string());

        let rows = self.query_rows(q).await?;
        Ok(rows
            .into_iter()
            .map(|row| RelationshipRecord {
                from: name.to_string(),
                rel_type: row.get("rel_type").unwrap_or_default(),
                to: row.get("to").unwrap_or_default(),
            })
            .collect())
    }
}

/// Convert a neo4rs::Node to an EntityRecord. Dates are rendered as ISO text.
fn entity_record(node: &neo4rs::Node) -> EntityRecord {
    let name: String = node.get("name").unwrap_or_default();

    let mut props = serde_json::Map::new();
    for key in node.keys() {
        if key == "name" {
            continue;
        }
        let value = if let Ok(s) = node.get::<String>(key) {
            serde_json::Value::String(s)
        } else if let Ok(d) = node.get::<NaiveDate>(key) {
            serde_json::Value::String(d.format("%Y-%m-%d").to_string())
        } else if let Ok(i) = node.get::<i64>(key) {
            serde_json::Value::from(i)
        } else {
            continue;
        };
        props.insert(key.to_string(), value);
    }

    EntityRecord {
        name,
        properties: serde_json::Value::Object(props),
    }
}
