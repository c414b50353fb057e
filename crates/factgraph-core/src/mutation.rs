//! Graph mutation building.
//!
//! Every mutation is an upsert, so replaying the same triplets converges to
//! the same graph. Nothing here ever deletes.

use std::collections::HashSet;

use crate::types::{GraphMutation, Triplet};

/// Mutations for a single triplet.
pub fn mutations_for(triplet: &Triplet) -> Vec<GraphMutation> {
    match triplet {
        Triplet::Relation {
            subject,
            relation_type,
            object,
            ..
        } => vec![
            GraphMutation::UpsertNode {
                id: subject.clone(),
            },
            GraphMutation::UpsertNode { id: object.clone() },
            GraphMutation::UpsertRelationship {
                from: subject.clone(),
                rel_type: relation_type.clone(),
                to: object.clone(),
            },
        ],
        Triplet::Property {
            subject,
            attribute,
            value,
            ..
        } => {
            let mut out = vec![GraphMutation::UpsertNode {
                id: subject.clone(),
            }];
            if let Some(value) = value {
                out.push(GraphMutation::SetProperty {
                    node: subject.clone(),
                    attribute: attribute.clone(),
                    value: value.clone(),
                });
            }
            out
        }
    }
}

/// Mutations for a batch, in triplet order. A node upserted earlier in the
/// batch is not upserted again.
pub fn build_mutations(triplets: &[Triplet]) -> Vec<GraphMutation> {
    let mut seen_nodes: HashSet<String> = HashSet::new();
    let mut out = Vec::with_capacity(triplets.len() * 3);

    for mutation in triplets.iter().flat_map(mutations_for) {
        if let GraphMutation::UpsertNode { id } = &mutation {
            if !seen_nodes.insert(id.clone()) {
                continue;
            }
        }
        out.push(mutation);
    }

    out
}
