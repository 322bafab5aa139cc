//! Explicit cache for slow-moving provider data.
//!
//! Entries are keyed by `(operation, arguments)` and carry the time they were
//! fetched plus a freshness window. Provider transaction and balance data
//! changes slowly, so those fetches default to a daily window; a stale entry
//! is simply absent and the caller re-fetches.

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use std::collections::HashMap;

/// Freshness window for transaction and balance fetches.
pub fn daily() -> Duration {
    Duration::hours(24)
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    operation: &'static str,
    args: String,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    fetched_at: DateTime<Utc>,
    max_age: Duration,
    value: Value,
}

/// In-memory fetch cache. Single-session, so no interior locking.
#[derive(Debug, Default)]
pub struct FetchCache {
    entries: HashMap<CacheKey, CacheEntry>,
}

impl FetchCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// A cached value, if one exists and is still inside its window.
    pub fn get(&self, operation: &'static str, args: &str, now: DateTime<Utc>) -> Option<&Value> {
        let key = CacheKey {
            operation,
            args: args.to_string(),
        };
        let entry = self.entries.get(&key)?;
        if now - entry.fetched_at < entry.max_age {
            Some(&entry.value)
        } else {
            None
        }
    }

    pub fn put(
        &mut self,
        operation: &'static str,
        args: &str,
        value: Value,
        max_age: Duration,
        now: DateTime<Utc>,
    ) {
        self.entries.insert(
            CacheKey {
                operation,
                args: args.to_string(),
            },
            CacheEntry {
                fetched_at: now,
                max_age,
                value,
            },
        );
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn fresh_entries_hit_stale_entries_miss() {
        let mut cache = FetchCache::new();
        let now = Utc::now();
        cache.put("transactions", "acct-1", json!({"ok": true}), daily(), now);

        assert!(cache.get("transactions", "acct-1", now).is_some());
        assert!(
            cache
                .get("transactions", "acct-1", now + Duration::hours(23))
                .is_some()
        );
        assert!(
            cache
                .get("transactions", "acct-1", now + Duration::hours(25))
                .is_none()
        );
    }

    #[test]
    fn keys_distinguish_operation_and_args() {
        let mut cache = FetchCache::new();
        let now = Utc::now();
        cache.put("transactions", "acct-1", json!(1), daily(), now);

        assert!(cache.get("balances", "acct-1", now).is_none());
        assert!(cache.get("transactions", "acct-2", now).is_none());
    }
}
