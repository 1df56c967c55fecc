use crate::ident::RelationshipPair;

pub type RelationshipResult<T> = Result<T, RelationshipError>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RelationshipError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("invalid column reference {text:?}: {reason}")]
    InvalidName { text: String, reason: String },

    #[error("unknown table: {0}")]
    UnknownTable(String),

    #[error("relationship {0} does not exist")]
    RelationshipNotFound(RelationshipPair),

    #[error("relationship {0} already exists")]
    DuplicateRelationship(RelationshipPair),

    #[error("relationship {0} is already active")]
    AlreadyActive(RelationshipPair),

    #[error("relationship {0} is not active")]
    NotActive(RelationshipPair),

    #[error(
        "activating {relationship} would create an alternate path between {foreign_table} and {primary_table}"
    )]
    AlternatePath {
        relationship: RelationshipPair,
        primary_table: String,
        foreign_table: String,
    },

    #[error("cycle detected among active relationships: {}", .path.join(" -> "))]
    CycleDetected { path: Vec<String> },

    #[error("relationship walk from {table} exceeded the maximum depth of {max_depth}")]
    DepthExceeded { table: String, max_depth: usize },

    #[error("table {table} already holds a reference for {relationship}")]
    ReferenceConflict {
        table: String,
        relationship: RelationshipPair,
    },

    #[error("table {table} holds no reference for {relationship}")]
    ReferenceMissing {
        table: String,
        relationship: RelationshipPair,
    },

    #[error("external model error: {0}")]
    External(String),
}
