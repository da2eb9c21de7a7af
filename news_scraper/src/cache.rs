use chrono::{DateTime, TimeDelta, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::ArticleRecord;

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub data: Arc<Vec<ArticleRecord>>,
    pub fetched_at: DateTime<Utc>,
}

/// Last listing per category key. Stale entries stay until overwritten;
/// they are simply not served.
#[derive(Clone, Debug)]
pub struct CategoryCache {
    entries: Arc<DashMap<String, CacheEntry>>,
    ttl: TimeDelta,
}

impl CategoryCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            ttl: TimeDelta::from_std(ttl).unwrap_or_else(|_| TimeDelta::days(36_500)),
        }
    }

    pub fn get(&self, key: &str) -> Option<CacheEntry> {
        self.get_at(key, Utc::now())
    }

    pub fn get_at(&self, key: &str, now: DateTime<Utc>) -> Option<CacheEntry> {
        let entry = self.entries.get(key)?;
        if now - entry.fetched_at < self.ttl {
            Some(entry.value().clone())
        } else {
            None
        }
    }

    pub fn put(&self, key: &str, data: Vec<ArticleRecord>) -> CacheEntry {
        self.put_at(key, data, Utc::now())
    }

    pub fn put_at(&self, key: &str, data: Vec<ArticleRecord>, now: DateTime<Utc>) -> CacheEntry {
        let entry = CacheEntry {
            data: Arc::new(data),
            fetched_at: now,
        };
        self.entries.insert(key.to_string(), entry.clone());
        entry
    }

    /// Entry regardless of freshness.
    pub fn peek(&self, key: &str) -> Option<CacheEntry> {
        self.entries.get(key).map(|e| e.value().clone())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
