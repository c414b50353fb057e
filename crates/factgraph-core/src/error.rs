use thiserror::Error;

/// A predicate outside the closed vocabulary, or a malformed candidate.
///
/// Rejections concern a single triplet: the batch it came from continues.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VocabularyRejection {
    #[error("Predicate '{predicate}' is not in the vocabulary (subject '{subject}')")]
    UnknownPredicate { subject: String, predicate: String },

    #[error("Triplet with predicate '{predicate}' has an empty subject")]
    EmptySubject { predicate: String },

    #[error("Relation '{predicate}' on subject '{subject}' has an empty object")]
    EmptyObject { subject: String, predicate: String },
}

/// A property value that could not be typed. Only that property is dropped.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValueError {
    #[error("No date format matches '{raw}' for property '{verb}'")]
    DateParse { raw: String, verb: String },

    #[error("Empty value for property '{verb}'")]
    EmptyValue { verb: String },
}

/// A malformed vocabulary table, detected when the table is loaded.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VocabularyError {
    #[error("Property verb '{0}' is allowed but has no attribute rule")]
    MissingRule(String),

    #[error("Rule defined for property verb '{0}' which is not in the allow-list")]
    OrphanRule(String),

    #[error("Verb '{0}' is declared both as a relation and as a property")]
    AmbiguousVerb(String),

    #[error("Verb '{0}' is declared more than once")]
    DuplicateVerb(String),

    #[error("Verb '{0}' is empty or not in normalized form")]
    InvalidVerb(String),

    #[error("Relationship type '{0}' must match [A-Z][A-Z0-9_]*")]
    InvalidRelationType(String),

    #[error("Attribute name '{0}' must match [a-z][a-z0-9_]*")]
    InvalidAttribute(String),

    #[error("Attribute '{0}' is written by verbs with different value kinds")]
    ConflictingKinds(String),
}

/// Failure reported by a store collaborator (graph store or log store).
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Graph store error: {0}")]
    Graph(String),

    #[error("Log store error: {0}")]
    Log(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}
