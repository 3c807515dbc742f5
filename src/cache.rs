// src/cache.rs
use chrono::{DateTime, Duration, NaiveDate, Utc};
use dashmap::DashMap;
use log::debug;
use std::sync::Arc;

use crate::models::{Constituents, MacroSeries, MonthlyPriceSeries};

/// Fetch function plus the arguments it was called with.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Constituents,
    PriceHistory {
        ticker: String,
        start: NaiveDate,
        end: NaiveDate,
    },
    MacroSeries {
        code: String,
        start: NaiveDate,
        end: NaiveDate,
    },
}

#[derive(Debug, Clone)]
pub enum CachedValue {
    Constituents(Arc<Constituents>),
    Prices(Arc<MonthlyPriceSeries>),
    Macro(Arc<MacroSeries>),
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: CachedValue,
    fetched_at: DateTime<Utc>,
}

/// Process-wide memo of successful fetches. Entries older than the TTL are
/// misses; `clear` and `invalidate` drop entries on demand.
/// One year.
pub const MAX_TTL_MINUTES: i64 = 525_600;

pub struct FetchCache {
    entries: DashMap<CacheKey, CacheEntry>,
    ttl: Option<Duration>,
}

impl FetchCache {
    /// `ttl_minutes <= 0` keeps entries until they are invalidated. Values
    /// above `MAX_TTL_MINUTES` are capped.
    pub fn new(ttl_minutes: i64) -> Self {
        Self {
            entries: DashMap::new(),
            ttl: (ttl_minutes > 0).then(|| Duration::minutes(ttl_minutes.min(MAX_TTL_MINUTES))),
        }
    }

    fn is_fresh(&self, entry: &CacheEntry, now: DateTime<Utc>) -> bool {
        match self.ttl {
            Some(ttl) => now < entry.fetched_at + ttl,
            None => true,
        }
    }

    pub fn get(&self, key: &CacheKey) -> Option<CachedValue> {
        self.get_at(key, Utc::now())
    }

    pub fn get_at(&self, key: &CacheKey, now: DateTime<Utc>) -> Option<CachedValue> {
        let entry = self.entries.get(key)?;
        if self.is_fresh(entry.value(), now) {
            debug!("Cache hit for {:?}", key);
            return Some(entry.value().value.clone());
        }
        drop(entry); // Release the read lock
        debug!("Cache entry for {:?} expired", key);
        // A concurrent insert may have refreshed the entry since the read.
        self.entries.remove_if(key, |_, e| !self.is_fresh(e, now));
        None
    }

    pub fn insert(&self, key: CacheKey, value: CachedValue) {
        self.insert_at(key, value, Utc::now());
    }

    pub fn insert_at(&self, key: CacheKey, value: CachedValue, fetched_at: DateTime<Utc>) {
        self.entries.insert(key, CacheEntry { value, fetched_at });
    }

    pub fn invalidate(&self, key: &CacheKey) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Drops every entry and returns how many were held.
    pub fn clear(&self) -> usize {
        let count = self.entries.len();
        self.entries.clear();
        count
    }

    pub fn purge_expired(&self) -> usize {
        self.purge_expired_at(Utc::now())
    }

    pub fn purge_expired_at(&self, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| self.is_fresh(entry, now));
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
