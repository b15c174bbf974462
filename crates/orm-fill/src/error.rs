//! Error types for nested relation filling
//!
//! `ModelError` is what record and relation collaborators report; `FillError`
//! is what the fill engine surfaces to callers, always naming the relation
//! that failed when there is one.

use std::fmt;

use crate::relationships::RelationshipType;

/// Result type alias for collaborator operations
pub type ModelResult<T> = Result<T, ModelError>;

/// Result type alias for fill operations
pub type FillResult<T> = Result<T, FillError>;

/// Error types reported by records and relation handles
#[derive(Debug, Clone, PartialEq)]
pub enum ModelError {
    /// Database connection or query error
    Database(String),
    /// Model not found in database
    NotFound(String),
    /// Model validation failed
    Validation(String),
    /// Primary key is missing or invalid
    MissingPrimaryKey,
    /// Relationship resolution failed
    Relationship(String),
    /// Serialization/deserialization error
    Serialization(String),
    /// Schema error
    Schema(String),
    /// Configuration error
    Configuration(String),
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelError::Database(msg) => write!(f, "Database error: {}", msg),
            ModelError::NotFound(table) => write!(f, "Record not found in table '{}'", table),
            ModelError::Validation(msg) => write!(f, "Validation error: {}", msg),
            ModelError::MissingPrimaryKey => write!(f, "Primary key is missing or invalid"),
            ModelError::Relationship(msg) => write!(f, "Relationship error: {}", msg),
            ModelError::Serialization(msg) => write!(f, "Serialization error: {}", msg),
            ModelError::Schema(msg) => write!(f, "Schema error: {}", msg),
            ModelError::Configuration(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for ModelError {}

// Convert from serde_json errors
impl From<serde_json::Error> for ModelError {
    fn from(err: serde_json::Error) -> Self {
        ModelError::Serialization(err.to_string())
    }
}

/// Errors raised while filling a model and its relations
#[derive(Debug, thiserror::Error)]
pub enum FillError {
    #[error("Relation '{relation}' is a {kind:?} relation, which cannot be filled")]
    UnsupportedRelationKind {
        relation: String,
        kind: RelationshipType,
    },

    #[error("No related record for relation '{relation}' matches {criteria}")]
    RelatedRecordNotFound { relation: String, criteria: String },

    #[error("Relation '{relation}' is declared fillable but has no registered accessor")]
    MissingAccessor { relation: String },

    #[error("Invalid payload for relation '{relation}': {reason}")]
    InvalidPayload { relation: String, reason: String },

    #[error("Relation '{relation}' failed: {source}")]
    Relation {
        relation: String,
        #[source]
        source: ModelError,
    },

    #[error(transparent)]
    Model(#[from] ModelError),
}

impl FillError {
    /// Build a closure that tags a collaborator error with the relation name
    pub(crate) fn relation(name: &str) -> impl FnOnce(ModelError) -> FillError + '_ {
        move |source| FillError::Relation {
            relation: name.to_string(),
            source,
        }
    }

    pub(crate) fn invalid_payload(relation: &str, reason: impl Into<String>) -> Self {
        FillError::InvalidPayload {
            relation: relation.to_string(),
            reason: reason.into(),
        }
    }

    /// The relation this error is attributed to, if any
    pub fn relation_name(&self) -> Option<&str> {
        match self {
            FillError::UnsupportedRelationKind { relation, .. }
            | FillError::RelatedRecordNotFound { relation, .. }
            | FillError::MissingAccessor { relation }
            | FillError::InvalidPayload { relation, .. }
            | FillError::Relation { relation, .. } => Some(relation),
            FillError::Model(_) => None,
        }
    }
}
