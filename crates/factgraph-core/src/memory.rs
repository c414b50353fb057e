//! In-memory stores, used for dry runs and tests.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};

use crate::error::StoreError;
use crate::store::{GraphStore, LogStore};
use crate::types::{GraphMutation, LogEntry, TypedValue};

#[derive(Debug, Clone, Default)]
struct GraphState {
    nodes: BTreeMap<String, BTreeMap<String, TypedValue>>,
    relationships: BTreeSet<(String, String, String)>,
}

impl GraphState {
    fn apply(&mut self, mutation: &GraphMutation) {
        match mutation {
            GraphMutation::UpsertNode { id } => {
                self.nodes.entry(id.clone()).or_default();
            }
            GraphMutation::UpsertRelationship { from, rel_type, to } => {
                self.nodes.entry(from.clone()).or_default();
                self.nodes.entry(to.clone()).or_default();
                self.relationships
                    .insert((from.clone(), rel_type.clone(), to.clone()));
            }
            GraphMutation::SetProperty {
                node,
                attribute,
                value,
            } => {
                self.nodes
                    .entry(node.clone())
                    .or_default()
                    .insert(attribute.clone(), value.clone());
            }
        }
    }
}

/// A property graph held in memory. Entities are keyed by name.
#[derive(Debug, Default)]
pub struct MemoryGraph {
    state: Mutex<GraphState>,
}

impl MemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, GraphState>, StoreError> {
        self.state
            .lock()
            .map_err(|_| StoreError::Graph("memory graph lock poisoned".to_string()))
    }

    pub fn node_count(&self) -> usize {
        self.lock().map(|s| s.nodes.len()).unwrap_or(0)
    }

    pub fn relationship_count(&self) -> usize {
        self.lock().map(|s| s.relationships.len()).unwrap_or(0)
    }

    pub fn has_node(&self, id: &str) -> bool {
        self.lock().map(|s| s.nodes.contains_key(id)).unwrap_or(false)
    }

    pub fn has_relationship(&self, from: &str, rel_type: &str, to: &str) -> bool {
        self.lock()
            .map(|s| {
                s.relationships
                    .contains(&(from.to_string(), rel_type.to_string(), to.to_string()))
            })
            .unwrap_or(false)
    }

    pub fn property(&self, node: &str, attribute: &str) -> Option<TypedValue> {
        self.lock()
            .ok()?
            .nodes
            .get(node)
            .and_then(|props| props.get(attribute).cloned())
    }

    /// Entity names, sorted.
    pub fn node_ids(&self) -> Vec<String> {
        self.lock()
            .map(|s| s.nodes.keys().cloned().collect())
            .unwrap_or_default()
    }
}

impl GraphStore for MemoryGraph {
    /// Applies to a copy and swaps it in, so a batch is all-or-nothing.
    async fn apply(&self, mutations: &[GraphMutation]) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        let mut next = state.clone();
        for mutation in mutations {
            next.apply(mutation);
        }
        *state = next;
        Ok(())
    }

    async fn reset_domain(&self) -> Result<u64, StoreError> {
        let mut state = self.lock()?;
        let removed = state.nodes.len() as u64;
        *state = GraphState::default();
        Ok(removed)
    }
}

/// An append-only log held in memory.
#[derive(Debug, Default)]
pub struct MemoryLog {
    entries: Mutex<Vec<LogEntry>>,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Vec<LogEntry>>, StoreError> {
        self.entries
            .lock()
            .map_err(|_| StoreError::Log("memory log lock poisoned".to_string()))
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

impl LogStore for MemoryLog {
    async fn ensure_table(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn append(&self, entry: &LogEntry) -> Result<(), StoreError> {
        self.lock()?.push(entry.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<u64, StoreError> {
        let mut entries = self.lock()?;
        let removed = entries.len() as u64;
        entries.clear();
        Ok(removed)
    }
}
