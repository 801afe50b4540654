use std::str::FromStr;
use std::time::Duration;

use sqlx::{
    postgres::{PgConnectOptions, PgPoolOptions},
    Executor, PgPool,
};
use thiserror::Error;
use tracing::info;

use crate::config::DatabaseConfig;

/// Errors from pool construction
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Invalid database URL")]
    InvalidDatabaseUrl,

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Builds the process-wide pool every request shares
pub struct DatabaseManager;

impl DatabaseManager {
    /// Connect with the configured limits. The pool is owned by the caller;
    /// there is no global registry.
    pub async fn connect(config: &DatabaseConfig) -> Result<PgPool, DatabaseError> {
        if config.url.is_empty() {
            return Err(DatabaseError::ConfigMissing("DATABASE_URL"));
        }
        let target = Self::redacted_url(&config.url)?;
        let options = Self::connect_options(config)?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout))
            // `SET my.user_id` is session level; clear it before the
            // connection goes back to the pool
            .after_release(|conn, _meta| {
                Box::pin(async move {
                    conn.execute("RESET my.user_id").await?;
                    Ok(true)
                })
            })
            .connect_with(options)
            .await?;

        info!("Created database pool for: {} (max {} connections)", target, config.max_connections);
        Ok(pool)
    }

    /// Connection options from the URL, plus a server-side statement
    /// timeout. Dropping a query future does not stop the statement on the
    /// server; the timeout bounds how long an abandoned one holds its
    /// connection.
    fn connect_options(config: &DatabaseConfig) -> Result<PgConnectOptions, DatabaseError> {
        let options = PgConnectOptions::from_str(&config.url).map_err(|_| DatabaseError::InvalidDatabaseUrl)?;
        Ok(match statement_timeout(config.statement_timeout_ms) {
            Some(setting) => options.options([setting]),
            None => options,
        })
    }

    /// Connection string with the password masked, for logs
    fn redacted_url(raw: &str) -> Result<String, DatabaseError> {
        let mut url = url::Url::parse(raw).map_err(|_| DatabaseError::InvalidDatabaseUrl)?;
        if url.password().is_some() {
            url.set_password(Some("***")).map_err(|_| DatabaseError::InvalidDatabaseUrl)?;
        }
        Ok(url.into())
    }
}

/// Startup parameter for `statement_timeout`, or None when disabled
fn statement_timeout(ms: u64) -> Option<(&'static str, String)> {
    (ms > 0).then(|| ("statement_timeout", format!("{}ms", ms)))
}
