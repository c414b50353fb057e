//! Triplet validation and normalization against the closed vocabulary.
//!
//! Unknown predicates are dropped rather than stored as free-form edges.
//! Failures are per triplet: a rejected candidate never aborts its batch.

use crate::error::{ValueError, VocabularyRejection};
use crate::typer;
use crate::types::{CandidateTriplet, Triplet};
use crate::vocabulary::Vocabulary;

/// A candidate that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    pub triplet: Triplet,
    /// Set when the property value could not be typed and was dropped.
    pub dropped_value: Option<ValueError>,
}

/// Outcome of validating a batch of candidates.
#[derive(Debug, Clone, Default)]
pub struct NormalizedBatch {
    pub triplets: Vec<Triplet>,
    pub rejections: Vec<VocabularyRejection>,
    pub value_errors: Vec<ValueError>,
}

impl NormalizedBatch {
    pub fn candidates(&self) -> usize {
        self.triplets.len() + self.rejections.len()
    }
}

/// Validates candidates against a shared vocabulary.
pub struct Normalizer<'v> {
    vocab: &'v Vocabulary,
}

impl<'v> Normalizer<'v> {
    pub fn new(vocab: &'v Vocabulary) -> Self {
        Self { vocab }
    }

    /// Validate and normalize a single candidate.
    pub fn normalize(
        &self,
        candidate: &CandidateTriplet,
    ) -> Result<Normalized, VocabularyRejection> {
        let subject = normalize_name(&candidate.subject);
        if subject.is_empty() {
            return Err(VocabularyRejection::EmptySubject {
                predicate: candidate.predicate.clone(),
            });
        }

        if let Some(relation_type) = self.vocab.relation_type(&candidate.predicate) {
            let object = normalize_name(&candidate.object);
            if object.is_empty() {
                return Err(VocabularyRejection::EmptyObject {
                    subject,
                    predicate: candidate.predicate.clone(),
                });
            }
            return Ok(Normalized {
                triplet: Triplet::Relation {
                    subject,
                    relation_type: relation_type.to_string(),
                    object,
                    payload_id: candidate.payload_id,
                },
                dropped_value: None,
            });
        }

        if let Some(rule) = self.vocab.property_rule(&candidate.predicate) {
            let verb = crate::vocabulary::normalize_predicate(&candidate.predicate);
            let (value, dropped_value) = match typer::resolve(&candidate.object, rule.kind, &verb)
            {
                Ok(v) => (Some(v), None),
                Err(e) => (None, Some(e)),
            };
            return Ok(Normalized {
                triplet: Triplet::Property {
                    subject,
                    attribute: rule.attribute.to_string(),
                    value,
                    payload_id: candidate.payload_id,
                },
                dropped_value,
            });
        }

        Err(VocabularyRejection::UnknownPredicate {
            subject,
            predicate: candidate.predicate.clone(),
        })
    }

    /// Validate a batch, skipping rejected candidates and dropping untypable
    /// values. Every rejection and dropped value is logged and returned.
    pub fn normalize_batch(&self, candidates: &[CandidateTriplet]) -> NormalizedBatch {
        let mut batch = NormalizedBatch::default();

        for candidate in candidates {
            match self.normalize(candidate) {
                Ok(normalized) => {
                    if let Some(err) = normalized.dropped_value {
                        tracing::warn!(
                            payload_id = %candidate.payload_id,
                            subject = %candidate.subject,
                            error = %err,
                            "Property value dropped"
                        );
                        batch.value_errors.push(err);
                    }
                    batch.triplets.push(normalized.triplet);
                }
                Err(rejection) => {
                    tracing::warn!(
                        payload_id = %candidate.payload_id,
                        error = %rejection,
                        "Triplet rejected"
                    );
                    batch.rejections.push(rejection);
                }
            }
        }

        batch
    }
}

/// Entity names are trimmed with internal whitespace collapsed. Case is kept.
pub fn normalize_name(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}
