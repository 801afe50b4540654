use async_trait::async_trait;
use sqlx::{Executor as _, PgPool, Row};

use super::error::{classify, StoreError};

/// One database round-trip that yields a single JSON text column.
///
/// `Ok(None)` means the database produced no rows or a NULL (an empty
/// `array_agg`), which callers treat as an empty result.
#[async_trait]
pub trait JsonExecutor: Send + Sync {
    async fn query_json(&self, sql: &str) -> Result<Option<String>, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}

/// Executor backed by a sqlx Postgres pool
#[derive(Clone)]
pub struct PgExecutor {
    pool: PgPool,
}

impl PgExecutor {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JsonExecutor for PgExecutor {
    async fn query_json(&self, sql: &str) -> Result<Option<String>, StoreError> {
        // A bare &str has no arguments, so sqlx uses the simple query
        // protocol: the SET prefixes and the statement run as one implicit
        // transaction, which is what scopes SET LOCAL ROLE.
        let row = match self.pool.fetch_optional(sql).await {
            Ok(Some(row)) => row,
            Ok(None) => return Ok(None),
            Err(e) => return classify(e),
        };

        // json/jsonb come back in text format here; read the bytes as-is
        // rather than round-tripping them through serde_json.
        match row.try_get_unchecked::<Option<String>, _>(0) {
            Ok(json) => Ok(json),
            Err(e) => classify(e),
        }
    }

    async fn ping(&self) -> Result<(), StoreError> {
        match self.pool.execute("SELECT 1").await {
            Ok(_) => Ok(()),
            Err(e) => classify(e).map(|_| ()),
        }
    }
}
