use std::time::Duration;

use moka::sync::Cache;

pub const DEFAULT_TTL: Duration = Duration::from_secs(60);

/// TTL cache from compiled SQL to the JSON it produced.
///
/// Inserting restarts an entry's TTL. Expired entries read as absent and
/// moka evicts them during its own maintenance. A miss followed by two
/// concurrent fills just computes the value twice.
#[derive(Clone)]
pub struct QueryCache {
    ttl: Duration,
    entries: Cache<String, String>,
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl QueryCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Cache::builder().time_to_live(ttl).build(),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key)
    }

    /// Insert or refresh
    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn remove(&self, key: &str) -> Option<String> {
        self.entries.remove(key)
    }

    /// Drop every entry whose SQL reads from `relation` (the rendered
    /// `schema.table`), returning how many went
    pub fn invalidate_relation(&self, relation: &str) -> usize {
        let stale: Vec<_> = self
            .entries
            .iter()
            .filter(|(key, _)| reads_from(key, relation))
            .map(|(key, _)| key)
            .collect();
        for key in &stale {
            self.entries.invalidate(key.as_str());
        }
        stale.len()
    }

    /// Live entry count after pending evictions have run
    pub fn len(&self) -> usize {
        self.entries.run_pending_tasks();
        self.entries.entry_count() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// `FROM <relation>` followed by a clause boundary, so `shop.products` does
/// not match `shop.products_archive`
fn reads_from(sql: &str, relation: &str) -> bool {
    let needle = format!("FROM {}", relation);
    sql.match_indices(&needle).any(|(at, _)| {
        matches!(
            sql[at + needle.len()..].chars().next(),
            None | Some(' ') | Some(')') | Some(';')
        )
    })
}
