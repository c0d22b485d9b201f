//! Error types for the core model and the pre-submit validation gate.

/// Mutation failures raised by [`crate::core::model::SchemaModel`].
///
/// Structural problems are never healed: every operation that would break an
/// invariant returns one of these and leaves the model untouched.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelError {
    #[error("Table '{0}' does not exist")]
    UnknownTable(String),

    #[error("Column '{column}' does not exist on table '{table}'")]
    UnknownColumn { table: String, column: String },

    #[error("Relationship '{0}' does not exist")]
    UnknownRelationship(String),

    #[error("Relationship endpoints must both name a table")]
    EmptyEndpoint,

    #[error("Relationship '{0}' is system-derived and read-only")]
    ReadOnlyRelationship(String),

    #[error("Confidence score {0} is outside [0, 1]")]
    InvalidConfidence(f64),

    #[error("Metric '{scope}' has no entry named '{name}'")]
    UnknownMetric { scope: String, name: String },

    #[error("Invalid name '{name}': {reason}")]
    InvalidName { name: String, reason: String },
}

/// Fatal pre-submit failures. Raised before any network call; submission is
/// blocked and the in-memory model is left unchanged.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmitValidationError {
    #[error("Schema has no tables")]
    NoTables,

    #[error("Schema id is empty")]
    MissingSchemaId,

    #[error("Schema display name is empty")]
    MissingDisplayName,

    #[error("Connection configuration is empty")]
    MissingConnectionConfig,
}

/// Payload failed to serialize; aborts before any network call.
#[derive(Debug, thiserror::Error)]
#[error("Failed to serialize schema payload: {0}")]
pub struct TransformError(#[from] pub serde_json::Error);
