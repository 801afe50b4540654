pub mod error;
pub mod executor;

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cache::QueryCache;
use crate::config::DatabaseConfig;
use crate::query::{compile, literal, Cardinality, CompiledQuery, Query, Relation};

pub use error::{status_for_db_code, StoreError};
pub use executor::{JsonExecutor, PgExecutor};

/// Logging knobs the store reads from `DatabaseConfig`
#[derive(Debug, Clone)]
pub struct StoreOptions {
    pub enable_query_logging: bool,
    pub enable_slow_query_warning: bool,
    pub slow_query_threshold: Duration,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            enable_query_logging: false,
            enable_slow_query_warning: true,
            slow_query_threshold: Duration::from_millis(1000),
        }
    }
}

impl From<&DatabaseConfig> for StoreOptions {
    fn from(config: &DatabaseConfig) -> Self {
        Self {
            enable_query_logging: config.enable_query_logging,
            enable_slow_query_warning: config.enable_slow_query_warning,
            slow_query_threshold: Duration::from_millis(config.slow_query_threshold_ms),
        }
    }
}

/// Structured form of a query result, picked by cardinality
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutput {
    List(Vec<Map<String, Value>>),
    Single(Option<Map<String, Value>>),
}

impl QueryOutput {
    pub fn is_empty(&self) -> bool {
        match self {
            QueryOutput::List(rows) => rows.is_empty(),
            QueryOutput::Single(row) => row.is_none(),
        }
    }
}

/// Compiles queries, consults the cache and runs one round-trip per query.
///
/// The JSON text the database produced is returned untouched; an empty
/// string means zero rows.
#[derive(Clone)]
pub struct Store {
    executor: Arc<dyn JsonExecutor>,
    cache: Option<Arc<QueryCache>>,
    options: StoreOptions,
}

impl Store {
    pub fn new(executor: Arc<dyn JsonExecutor>) -> Self {
        Self {
            executor,
            cache: None,
            options: StoreOptions::default(),
        }
    }

    pub fn with_cache(mut self, cache: Arc<QueryCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_options(mut self, options: StoreOptions) -> Self {
        self.options = options;
        self
    }

    pub fn cache(&self) -> Option<&Arc<QueryCache>> {
        self.cache.as_ref()
    }

    pub async fn execute(&self, query: &Query, token: &CancellationToken) -> Result<String, StoreError> {
        let compiled = compile(query)?;
        self.run(&compiled, token).await
    }

    /// Run an already compiled query. A captured cache key is only honoured
    /// when the store has a cache.
    ///
    /// Cancellation drops the client side of the round-trip only; the
    /// statement runs on until it finishes or the pool's
    /// `statement_timeout` ends it.
    pub async fn run(&self, compiled: &CompiledQuery, token: &CancellationToken) -> Result<String, StoreError> {
        let cache = self.cache.as_ref().zip(compiled.cache_key.as_deref());

        if let Some((cache, key)) = cache {
            if let Some(hit) = cache.get(key) {
                debug!("Cache hit ({} bytes)", hit.len());
                return Ok(hit);
            }
        }

        if self.options.enable_query_logging {
            info!("Executing query: {}", compiled.sql);
        }

        let started = Instant::now();
        let result = tokio::select! {
            biased;
            _ = token.cancelled() => {
                debug!("Query cancelled before completion");
                return Err(StoreError::Cancelled);
            }
            result = self.executor.query_json(&compiled.sql) => result,
        };
        let elapsed = started.elapsed();

        if self.options.enable_slow_query_warning && elapsed >= self.options.slow_query_threshold {
            warn!("Slow query ({} ms): {}", elapsed.as_millis(), compiled.sql);
        }

        let json = match result {
            Ok(json) => json.unwrap_or_default(),
            Err(e) => {
                debug!("Query failed: {}", e);
                return Err(e);
            }
        };

        if let Some((cache, key)) = cache {
            cache.set(key, json.clone());
        }
        Ok(json)
    }

    /// Forget cached reads of a relation after a write to it
    pub fn invalidate(&self, relation: &Relation) -> usize {
        let Some(cache) = self.cache.as_ref() else {
            return 0;
        };
        match literal::relation(relation) {
            Ok(rendered) => {
                let dropped = cache.invalidate_relation(&rendered);
                if dropped > 0 {
                    debug!("Invalidated {} cached reads of {}", dropped, rendered);
                }
                dropped
            }
            Err(_) => 0,
        }
    }

    /// Execute and decode the JSON into generic records
    pub async fn execute_and_unmarshal(&self, query: &Query, token: &CancellationToken) -> Result<QueryOutput, StoreError> {
        let json = self.execute(query, token).await?;
        unmarshal(&json, query.cardinality)
    }

    pub async fn ping(&self) -> Result<(), StoreError> {
        self.executor.ping().await
    }
}

/// Decode database JSON. The empty string is an empty result, not an error.
pub fn unmarshal(json: &str, cardinality: Cardinality) -> Result<QueryOutput, StoreError> {
    let json = json.trim();
    match cardinality {
        Cardinality::List if json.is_empty() => Ok(QueryOutput::List(Vec::new())),
        Cardinality::List => Ok(QueryOutput::List(serde_json::from_str(json)?)),
        Cardinality::Single if json.is_empty() => Ok(QueryOutput::Single(None)),
        Cardinality::Single => Ok(QueryOutput::Single(Some(serde_json::from_str(json)?))),
    }
}
