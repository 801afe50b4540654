use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    #[error("Query has neither a relation nor raw SQL")]
    MissingRelation,

    #[error("Invalid identifier: {0:?}")]
    InvalidIdentifier(String),

    #[error("Unsupported operator: {0}")]
    UnsupportedOperator(String),

    #[error("Unsupported value for {key}: {reason}")]
    UnsupportedValue { key: String, reason: String },

    #[error("Invalid filter parameter {key}: {reason}")]
    InvalidParameter { key: String, reason: String },

    #[error("Empty update for record {0}")]
    EmptyUpdate(String),
}
