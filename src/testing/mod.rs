use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::store::{JsonExecutor, StoreError};

/// In-memory executor for tests.
///
/// Outcomes are scripted in order with [`respond`](Self::respond),
/// [`respond_empty`](Self::respond_empty) and [`fail`](Self::fail); once the
/// script runs out every query yields zero rows. Each SQL string received is
/// recorded and can be read back with [`executed`](Self::executed).
#[derive(Default)]
pub struct MockExecutor {
    script: Mutex<VecDeque<Result<Option<String>, StoreError>>>,
    executed: Mutex<Vec<String>>,
    delay: Option<Duration>,
    unhealthy: Mutex<bool>,
}

impl MockExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep this long inside every query
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn respond(&self, json: impl Into<String>) {
        self.script.lock().push_back(Ok(Some(json.into())));
    }

    pub fn respond_empty(&self) {
        self.script.lock().push_back(Ok(None));
    }

    pub fn fail(&self, error: StoreError) {
        self.script.lock().push_back(Err(error));
    }

    /// Make `ping` fail until flipped back
    pub fn set_unhealthy(&self, unhealthy: bool) {
        *self.unhealthy.lock() = unhealthy;
    }

    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().clone()
    }

    pub fn last_sql(&self) -> Option<String> {
        self.executed.lock().last().cloned()
    }
}

#[async_trait]
impl JsonExecutor for MockExecutor {
    async fn query_json(&self, sql: &str) -> Result<Option<String>, StoreError> {
        self.executed.lock().push(sql.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.script.lock().pop_front().unwrap_or(Ok(None))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        if *self.unhealthy.lock() {
            Err(StoreError::Unavailable("mock executor marked unhealthy".to_string()))
        } else {
            Ok(())
        }
    }
}
