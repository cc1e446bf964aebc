//! Per-session cache of loaded price series.
//!
//! Keyed by `(ticker, start, end)`. Entries live until the session ends or are
//! dropped explicitly with [`SessionCache::invalidate`] or
//! [`SessionCache::clear`]; there is no time-based expiry. Nothing is written
//! to disk.

use crate::domain::PriceSeries;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub ticker: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl CacheKey {
    pub fn new(ticker: impl Into<String>, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            ticker: ticker.into(),
            start,
            end,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

#[derive(Debug, Default)]
pub struct SessionCache {
    entries: HashMap<CacheKey, Arc<PriceSeries>>,
    hits: u64,
    misses: u64,
}

impl SessionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a series, counting the hit or miss.
    pub fn get(&mut self, key: &CacheKey) -> Option<Arc<PriceSeries>> {
        match self.entries.get(key) {
            Some(series) => {
                self.hits += 1;
                Some(Arc::clone(series))
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Store a series. A later insert for the same key replaces the earlier one.
    pub fn insert(&mut self, key: CacheKey, series: Arc<PriceSeries>) -> Option<Arc<PriceSeries>> {
        self.entries.insert(key, series)
    }

    /// Drop every entry for `ticker`, whatever its date range. Returns how many went.
    pub fn invalidate(&mut self, ticker: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|k, _| k.ticker != ticker);
        before - self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            hits: self.hits,
            misses: self.misses,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::provider::DataSource;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn series(ticker: &str) -> Arc<PriceSeries> {
        Arc::new(PriceSeries::new(
            ticker,
            d(2016, 1, 1),
            d(2024, 1, 1),
            DataSource::Synthetic,
            vec![],
        ))
    }

    #[test]
    fn hit_returns_same_allocation() {
        let mut cache = SessionCache::new();
        let key = CacheKey::new("GM", d(2016, 1, 1), d(2024, 1, 1));
        let s = series("GM");
        cache.insert(key.clone(), Arc::clone(&s));
        let got = cache.get(&key).unwrap();
        assert!(Arc::ptr_eq(&s, &got));
        assert_eq!(cache.stats().hits, 1);
        assert_eq!(cache.stats().misses, 0);
    }

    #[test]
    fn different_range_is_a_miss() {
        let mut cache = SessionCache::new();
        cache.insert(CacheKey::new("GM", d(2016, 1, 1), d(2024, 1, 1)), series("GM"));
        assert!(cache
            .get(&CacheKey::new("GM", d(2016, 1, 1), d(2024, 1, 2)))
            .is_none());
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn invalidate_drops_all_ranges_for_ticker() {
        let mut cache = SessionCache::new();
        cache.insert(CacheKey::new("GM", d(2016, 1, 1), d(2024, 1, 1)), series("GM"));
        cache.insert(CacheKey::new("GM", d(2017, 1, 1), d(2024, 1, 1)), series("GM"));
        cache.insert(CacheKey::new("F", d(2016, 1, 1), d(2024, 1, 1)), series("F"));
        assert_eq!(cache.invalidate("GM"), 2);
        assert_eq!(cache.len(), 1);
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn last_insert_wins() {
        let mut cache = SessionCache::new();
        let key = CacheKey::new("DAL", d(2016, 1, 1), d(2024, 1, 1));
        let first = series("DAL");
        let second = series("DAL");
        assert!(cache.insert(key.clone(), first).is_none());
        assert!(cache.insert(key.clone(), Arc::clone(&second)).is_some());
        assert!(Arc::ptr_eq(&cache.get(&key).unwrap(), &second));
    }
}
