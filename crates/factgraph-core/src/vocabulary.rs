//! The closed vocabulary of relation and property verbs.
//!
//! Anything outside these tables is dropped by validation, which keeps the
//! graph schema bounded. Tables are checked once when loaded; a malformed
//! table is a start-up error, never a runtime surprise.

use std::collections::{HashMap, HashSet};

use crate::error::VocabularyError;
use crate::types::{PropertyRule, ValueKind};

/// Relation verb → persisted relationship type.
pub const RELATION_VERBS: &[(&str, &str)] =
    &[("padece", "PADECE"), ("toma", "TOMA"), ("realiza", "REALIZA")];

/// Property verbs accepted by validation.
pub const ALLOWED_PROPERTIES: &[&str] = &[
    "categoria",
    "frecuencia",
    "gravedad",
    "inicio",
    "fecha_inicio",
    "fin",
    "se toma",
    "periodicidad",
    "edad",
];

/// Property verb → (attribute, value kind).
pub const PROPERTY_VERBS: &[(&str, &str, ValueKind)] = &[
    ("categoria", "categoria", ValueKind::Node),
    ("frecuencia", "frecuencia", ValueKind::Node),
    ("gravedad", "gravedad", ValueKind::Node),
    ("inicio", "fecha_inicio", ValueKind::Date),
    ("fecha_inicio", "fecha_inicio", ValueKind::Date),
    ("fin", "fecha_fin", ValueKind::Date),
    ("se toma", "periodicidad", ValueKind::Node),
    ("periodicidad", "periodicidad", ValueKind::Node),
    ("edad", "edad", ValueKind::Node),
];

/// Immutable lookup tables for the closed vocabulary.
///
/// Built once at start-up and shared read-only (typically behind an `Arc`).
#[derive(Debug, Clone)]
pub struct Vocabulary {
    relations: HashMap<&'static str, &'static str>,
    properties: HashMap<&'static str, PropertyRule>,
}

impl Vocabulary {
    /// The built-in health-domain vocabulary.
    pub fn builtin() -> Result<Self, VocabularyError> {
        Self::from_tables(RELATION_VERBS, ALLOWED_PROPERTIES, PROPERTY_VERBS)
    }

    /// Build and validate a vocabulary from raw tables.
    pub fn from_tables(
        relations: &[(&'static str, &'static str)],
        allowed_properties: &[&'static str],
        rules: &[(&'static str, &'static str, ValueKind)],
    ) -> Result<Self, VocabularyError> {
        let mut relation_map = HashMap::with_capacity(relations.len());
        for &(verb, rel_type) in relations {
            check_verb(verb)?;
            if !is_relation_type(rel_type) {
                return Err(VocabularyError::InvalidRelationType(rel_type.to_string()));
            }
            if relation_map.insert(verb, rel_type).is_some() {
                return Err(VocabularyError::DuplicateVerb(verb.to_string()));
            }
        }

        let mut allowed = HashSet::with_capacity(allowed_properties.len());
        for &verb in allowed_properties {
            check_verb(verb)?;
            if relation_map.contains_key(verb) {
                return Err(VocabularyError::AmbiguousVerb(verb.to_string()));
            }
            if !allowed.insert(verb) {
                return Err(VocabularyError::DuplicateVerb(verb.to_string()));
            }
        }

        let mut property_map = HashMap::with_capacity(rules.len());
        for &(verb, attribute, kind) in rules {
            if !allowed.contains(verb) {
                return Err(VocabularyError::OrphanRule(verb.to_string()));
            }
            if !is_attribute_name(attribute) {
                return Err(VocabularyError::InvalidAttribute(attribute.to_string()));
            }
            if property_map
                .insert(verb, PropertyRule { attribute, kind })
                .is_some()
            {
                return Err(VocabularyError::DuplicateVerb(verb.to_string()));
            }
        }

        if let Some(missing) = allowed.iter().find(|v| !property_map.contains_key(*v)) {
            return Err(VocabularyError::MissingRule(missing.to_string()));
        }

        // Synonyms must agree on the kind of the attribute they write.
        let mut kinds: HashMap<&str, ValueKind> = HashMap::new();
        for rule in property_map.values() {
            if let Some(prev) = kinds.insert(rule.attribute, rule.kind) {
                if prev != rule.kind {
                    return Err(VocabularyError::ConflictingKinds(rule.attribute.to_string()));
                }
            }
        }

        tracing::debug!(
            relations = relation_map.len(),
            properties = property_map.len(),
            "Vocabulary loaded"
        );

        Ok(Self {
            relations: relation_map,
            properties: property_map,
        })
    }

    pub fn is_allowed_relation(&self, verb: &str) -> bool {
        self.relations.contains_key(normalize_predicate(verb).as_str())
    }

    pub fn is_allowed_property(&self, verb: &str) -> bool {
        self.properties.contains_key(normalize_predicate(verb).as_str())
    }

    /// Canonical relationship type for a relation verb.
    pub fn relation_type(&self, verb: &str) -> Option<&'static str> {
        self.relations
            .get(normalize_predicate(verb).as_str())
            .copied()
    }

    pub fn property_rule(&self, verb: &str) -> Option<PropertyRule> {
        self.properties
            .get(normalize_predicate(verb).as_str())
            .copied()
    }

    /// Every verb in the vocabulary, relations first, longest phrases first.
    pub fn verbs(&self) -> Vec<&'static str> {
        let mut relations: Vec<_> = self.relations.keys().copied().collect();
        let mut properties: Vec<_> = self.properties.keys().copied().collect();
        relations.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));
        properties.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));
        relations.extend(properties);
        relations
    }
}

/// Normalize the spelling of a predicate before lookup: trim, lowercase,
/// collapse internal whitespace, strip one trailing `:`.
pub fn normalize_predicate(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase();
    let collapsed = lowered.split_whitespace().collect::<Vec<_>>().join(" ");
    match collapsed.strip_suffix(':') {
        Some(stripped) => stripped.trim_end().to_string(),
        None => collapsed,
    }
}

fn check_verb(verb: &str) -> Result<(), VocabularyError> {
    if verb.is_empty() || normalize_predicate(verb) != verb {
        return Err(VocabularyError::InvalidVerb(verb.to_string()));
    }
    Ok(())
}

fn is_relation_type(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_uppercase())
        && chars.all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

fn is_attribute_name(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_lowercase())
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_vocabulary_loads() {
        let vocab = Vocabulary::builtin().unwrap();
        assert!(vocab.is_allowed_relation("toma"));
        assert!(vocab.is_allowed_relation("padece"));
        assert!(!vocab.is_allowed_relation("suffers-from"));
        assert!(vocab.is_allowed_property("se toma"));
        assert!(!vocab.is_allowed_property("toma"));
        assert_eq!(vocab.relation_type("realiza"), Some("REALIZA"));
    }

    #[test]
    fn lookup_normalizes_spelling() {
        let vocab = Vocabulary::builtin().unwrap();
        assert_eq!(vocab.relation_type("  Toma "), Some("TOMA"));
        assert!(vocab.is_allowed_property("Se   Toma"));
        let rule = vocab.property_rule("inicio:").unwrap();
        assert_eq!(rule.attribute, "fecha_inicio");
        assert_eq!(rule.kind, ValueKind::Date);
    }

    #[test]
    fn synonyms_share_an_attribute() {
        let vocab = Vocabulary::builtin().unwrap();
        assert_eq!(
            vocab.property_rule("se toma"),
            vocab.property_rule("periodicidad")
        );
        assert_eq!(
            vocab.property_rule("inicio"),
            vocab.property_rule("fecha_inicio")
        );
    }

    #[test]
    fn allowed_property_without_rule_fails_fast() {
        let err = Vocabulary::from_tables(
            RELATION_VERBS,
            &["categoria", "edad"],
            &[("categoria", "categoria", ValueKind::Node)],
        )
        .unwrap_err();
        assert_eq!(err, VocabularyError::MissingRule("edad".to_string()));
    }

    #[test]
    fn rule_for_unlisted_verb_fails_fast() {
        let err = Vocabulary::from_tables(
            RELATION_VERBS,
            &["categoria"],
            &[
                ("categoria", "categoria", ValueKind::Node),
                ("dosis", "dosis", ValueKind::Node),
            ],
        )
        .unwrap_err();
        assert_eq!(err, VocabularyError::OrphanRule("dosis".to_string()));
    }

    #[test]
    fn verb_in_both_tables_is_rejected() {
        let err = Vocabulary::from_tables(
            &[("toma", "TOMA")],
            &["toma"],
            &[("toma", "toma", ValueKind::Node)],
        )
        .unwrap_err();
        assert_eq!(err, VocabularyError::AmbiguousVerb("toma".to_string()));
    }

    #[test]
    fn bad_identifiers_are_rejected() {
        let err = Vocabulary::from_tables(&[("toma", "toma-x")], &[], &[]).unwrap_err();
        assert_eq!(err, VocabularyError::InvalidRelationType("toma-x".to_string()));

        let err = Vocabulary::from_tables(
            &[],
            &["inicio"],
            &[("inicio", "Fecha Inicio", ValueKind::Date)],
        )
        .unwrap_err();
        assert_eq!(
            err,
            VocabularyError::InvalidAttribute("Fecha Inicio".to_string())
        );

        let err = Vocabulary::from_tables(&[("Toma", "TOMA")], &[], &[]).unwrap_err();
        assert_eq!(err, VocabularyError::InvalidVerb("Toma".to_string()));
    }

    #[test]
    fn synonyms_with_different_kinds_are_rejected() {
        let err = Vocabulary::from_tables(
            &[],
            &["inicio", "empieza"],
            &[
                ("inicio", "fecha_inicio", ValueKind::Date),
                ("empieza", "fecha_inicio", ValueKind::Node),
            ],
        )
        .unwrap_err();
        assert_eq!(
            err,
            VocabularyError::ConflictingKinds("fecha_inicio".to_string())
        );
    }

    #[test]
    fn verbs_list_longest_first_within_group() {
        let vocab = Vocabulary::builtin().unwrap();
        let verbs = vocab.verbs();
        assert_eq!(verbs.len(), 12);
        let se_toma = verbs.iter().position(|v| *v == "se toma").unwrap();
        let fin = verbs.iter().position(|v| *v == "fin").unwrap();
        assert!(se_toma < fin);
    }

    #[test]
    fn normalize_predicate_strips_colon() {
        assert_eq!(normalize_predicate(" Inicio : "), "inicio");
        assert_eq!(normalize_predicate("se\ttoma"), "se toma");
    }
}
