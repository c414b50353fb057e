//! Candidate triplet extraction from payload text.
//!
//! [`RuleExtractor`] is line-oriented. A line is either an explicit
//! `subject | predicate | object` record, or free text in which the leftmost
//! vocabulary verb splits subject from object:
//!
//! ```text
//! Juan toma Ibuprofeno
//! Juan | inicio | 10/01/2020
//! Usuario: Ibuprofeno se toma cada 8 horas.
//! ```
//!
//! Explicit records pass any predicate through; validation decides later.

use std::sync::Arc;

use factgraph_core::{CandidateTriplet, PayloadId, Vocabulary};

/// Turns payload text into candidate triplets.
pub trait TripletExtractor: Send + Sync {
    fn extract(&self, text: &str, payload_id: PayloadId) -> Vec<CandidateTriplet>;
}

/// Speaker prefixes stripped from the start of a line.
const SPEAKER_TAGS: &[&str] = &["usuario", "user", "asistente", "assistant", "bot", "llm"];

/// Vocabulary-driven line extractor.
pub struct RuleExtractor {
    /// Verb phrases as lowercase tokens, longest first.
    phrases: Vec<Vec<String>>,
}

impl RuleExtractor {
    pub fn new(vocab: Arc<Vocabulary>) -> Self {
        let mut phrases: Vec<Vec<String>> = vocab
            .verbs()
            .into_iter()
            .map(|v| v.split_whitespace().map(str::to_string).collect())
            .collect();
        phrases.sort_by(|a, b| b.len().cmp(&a.len()));
        Self { phrases }
    }

    fn extract_line(&self, line: &str, payload_id: PayloadId) -> Option<CandidateTriplet> {
        let line = strip_speaker(line.trim());
        if line.is_empty() {
            return None;
        }

        if line.contains('|') {
            let parts: Vec<&str> = line.split('|').map(str::trim).collect();
            return match parts.as_slice() {
                [s, p, o] if !s.is_empty() && !p.is_empty() => Some(CandidateTriplet::new(
                    *s,
                    *p,
                    trim_object(o),
                    payload_id,
                )),
                _ => None,
            };
        }

        let tokens: Vec<&str> = line.split_whitespace().collect();
        for start in 1..tokens.len() {
            for phrase in &self.phrases {
                let end = start + phrase.len();
                if end >= tokens.len() {
                    continue;
                }
                let matches = tokens[start..end]
                    .iter()
                    .zip(phrase)
                    .all(|(tok, word)| token_word(tok) == *word);
                if !matches {
                    continue;
                }
                let object = trim_object(&tokens[end..].join(" "));
                if object.is_empty() {
                    continue;
                }
                return Some(CandidateTriplet::new(
                    tokens[..start].join(" "),
                    phrase.join(" "),
                    object,
                    payload_id,
                ));
            }
        }

        tracing::trace!(line = %line, "No triplet in line");
        None
    }
}

impl TripletExtractor for RuleExtractor {
    fn extract(&self, text: &str, payload_id: PayloadId) -> Vec<CandidateTriplet> {
        text.lines()
            .filter_map(|line| self.extract_line(line, payload_id))
            .collect()
    }
}

fn strip_speaker(line: &str) -> &str {
    if let Some((head, rest)) = line.split_once(':') {
        if SPEAKER_TAGS.contains(&head.trim().to_lowercase().as_str()) {
            return rest.trim();
        }
    }
    line
}

/// A token compared against vocabulary words: lowercase, without trailing
/// `:` or `,`.
fn token_word(token: &str) -> String {
    token
        .trim_end_matches(|c| c == ':' || c == ',')
        .to_lowercase()
}

fn trim_object(object: &str) -> String {
    object
        .trim()
        .trim_end_matches(|c| c == '.' || c == '!' || c == ';')
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> RuleExtractor {
        RuleExtractor::new(Arc::new(Vocabulary::builtin().unwrap()))
    }

    fn spo(c: &CandidateTriplet) -> (&str, &str, &str) {
        (&c.subject, &c.predicate, &c.object)
    }

    #[test]
    fn relation_sentence() {
        let out = extractor().extract("Juan toma Ibuprofeno", PayloadId::new());
        assert_eq!(out.len(), 1);
        assert_eq!(spo(&out[0]), ("Juan", "toma", "Ibuprofeno"));
    }

    #[test]
    fn property_with_colon() {
        let out = extractor().extract("Juan inicio: 10/01/2020.", PayloadId::new());
        assert_eq!(spo(&out[0]), ("Juan", "inicio", "10/01/2020"));
    }

    #[test]
    fn multi_word_verb_wins_over_its_suffix() {
        let out = extractor().extract("Ibuprofeno se toma cada 8 horas", PayloadId::new());
        assert_eq!(spo(&out[0]), ("Ibuprofeno", "se toma", "cada 8 horas"));
    }

    #[test]
    fn multi_word_subject() {
        let out = extractor().extract("Mi madre padece diabetes", PayloadId::new());
        assert_eq!(spo(&out[0]), ("Mi madre", "padece", "diabetes"));
    }

    #[test]
    fn pipe_records_pass_any_predicate() {
        let out = extractor().extract("Juan | odia | los lunes", PayloadId::new());
        assert_eq!(spo(&out[0]), ("Juan", "odia", "los lunes"));
    }

    #[test]
    fn speaker_tags_are_stripped() {
        let text = "Asistente: ¿Qué medicación toma?\nUsuario: Ana toma Paracetamol.";
        let out = extractor().extract(text, PayloadId::new());
        assert_eq!(out.len(), 1);
        assert_eq!(spo(&out[0]), ("Ana", "toma", "Paracetamol"));
    }

    #[test]
    fn lines_without_facts_yield_nothing() {
        let ex = extractor();
        assert!(ex.extract("Hola, ¿qué tal?", PayloadId::new()).is_empty());
        assert!(ex.extract("toma Ibuprofeno", PayloadId::new()).is_empty());
        assert!(ex.extract("Juan toma", PayloadId::new()).is_empty());
        assert!(ex.extract("a | b", PayloadId::new()).is_empty());
    }

    #[test]
    fn every_candidate_carries_the_payload_id() {
        let id = PayloadId::new();
        let out = extractor().extract("Juan toma Ibuprofeno\nJuan edad 80", id);
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|c| c.payload_id == id));
    }
}
