use thiserror::Error;

use crate::query::CompileError;

/// Postgres: insufficient_privilege
pub const INSUFFICIENT_PRIVILEGE: &str = "42501";
/// Postgres: undefined_table (also raised for a missing schema)
pub const UNDEFINED_TABLE: &str = "42P01";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error("Database error {code}: {message}")]
    Database { code: String, message: String, status: u16 },

    #[error("Database unavailable: {0}")]
    Unavailable(String),

    #[error("Could not decode database response: {0}")]
    Decode(String),

    #[error("Could not unmarshal database JSON: {0}")]
    Unmarshal(#[from] serde_json::Error),

    #[error("Query cancelled")]
    Cancelled,
}

impl StoreError {
    pub fn database(code: impl Into<String>, message: impl Into<String>) -> Self {
        let code = code.into();
        let status = status_for_db_code(&code);
        StoreError::Database {
            code,
            message: message.into(),
            status,
        }
    }

    /// HTTP status the caller should answer with
    pub fn status_code(&self) -> u16 {
        match self {
            StoreError::Compile(_) => 400,
            StoreError::Database { status, .. } => *status,
            StoreError::Unavailable(_) | StoreError::Cancelled => 503,
            StoreError::Decode(_) | StoreError::Unmarshal(_) => 500,
        }
    }

    /// Vendor error code, empty for anything that did not come from the database
    pub fn db_code(&self) -> &str {
        match self {
            StoreError::Database { code, .. } => code,
            _ => "",
        }
    }
}

/// Fixed translation from Postgres SQLSTATE to HTTP status
pub fn status_for_db_code(code: &str) -> u16 {
    match code {
        INSUFFICIENT_PRIVILEGE => 403,
        UNDEFINED_TABLE => 404,
        _ => 400,
    }
}

/// Sort a driver error into the store taxonomy. `RowNotFound` is the
/// driver's zero-rows sentinel and comes back as `Ok(None)`.
pub fn classify(err: sqlx::Error) -> Result<Option<String>, StoreError> {
    match err {
        sqlx::Error::RowNotFound => Ok(None),
        sqlx::Error::Database(db) => {
            let code = db.code().map(|c| c.into_owned()).unwrap_or_default();
            Err(StoreError::database(code, db.message()))
        }
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) | sqlx::Error::ColumnNotFound(_) | sqlx::Error::ColumnIndexOutOfBounds { .. } => {
            Err(StoreError::Decode(err.to_string()))
        }
        other => Err(StoreError::Unavailable(other.to_string())),
    }
}
