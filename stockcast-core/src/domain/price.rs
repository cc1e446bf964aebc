//! Daily price records and the cleaned price series handed to the preparer.

use crate::data::provider::DataSource;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One trading day of cleaned price data.
///
/// Every value field is optional. After the fill policy has run a field is only
/// `None` when the whole column had no usable value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRecord {
    pub date: NaiveDate,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub adj_close: Option<f64>,
    pub volume: Option<f64>,
}

impl PriceRecord {
    /// A record with every value set to `value` (volume left empty).
    pub fn flat(date: NaiveDate, value: f64) -> Self {
        Self {
            date,
            open: Some(value),
            high: Some(value),
            low: Some(value),
            close: Some(value),
            adj_close: Some(value),
            volume: None,
        }
    }

    /// True when the close is present and finite.
    pub fn has_usable_close(&self) -> bool {
        self.close.is_some_and(f64::is_finite)
    }
}

/// Per-column count of records still missing a value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingCounts {
    pub open: usize,
    pub high: usize,
    pub low: usize,
    pub close: usize,
    pub adj_close: usize,
    pub volume: usize,
}

impl MissingCounts {
    pub fn total(&self) -> usize {
        self.open + self.high + self.low + self.close + self.adj_close + self.volume
    }
}

/// Cleaned, date-ordered price history for one ticker over one date range.
///
/// Records are strictly increasing by date. Series are immutable once built and
/// shared behind `Arc` between the session cache and pipeline stages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    pub ticker: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub source: DataSource,
    records: Vec<PriceRecord>,
}

impl PriceSeries {
    /// Build a series. Records must already be sorted by date with no duplicates.
    pub fn new(
        ticker: impl Into<String>,
        start: NaiveDate,
        end: NaiveDate,
        source: DataSource,
        records: Vec<PriceRecord>,
    ) -> Self {
        debug_assert!(
            records.windows(2).all(|w| w[0].date < w[1].date),
            "price records must be strictly increasing by date"
        );
        Self {
            ticker: ticker.into(),
            start,
            end,
            source,
            records,
        }
    }

    pub fn records(&self) -> &[PriceRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.records.first().map(|r| r.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.records.last().map(|r| r.date)
    }

    /// The last `n` records (fewer if the series is shorter).
    pub fn tail(&self, n: usize) -> &[PriceRecord] {
        let start = self.records.len().saturating_sub(n);
        &self.records[start..]
    }

    pub fn missing_counts(&self) -> MissingCounts {
        let mut counts = MissingCounts::default();
        for r in &self.records {
            counts.open += usize::from(r.open.is_none());
            counts.high += usize::from(r.high.is_none());
            counts.low += usize::from(r.low.is_none());
            counts.close += usize::from(r.close.is_none());
            counts.adj_close += usize::from(r.adj_close.is_none());
            counts.volume += usize::from(r.volume.is_none());
        }
        counts
    }

    /// BLAKE3 fingerprint of the records, stable across runs.
    ///
    /// Used to label exported reports so two runs over identical data can be
    /// recognised.
    pub fn dataset_hash(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.ticker.as_bytes());
        for r in &self.records {
            hasher.update(r.date.to_string().as_bytes());
            for v in [r.open, r.high, r.low, r.close, r.adj_close, r.volume] {
                match v {
                    Some(x) => hasher.update(&x.to_le_bytes()),
                    None => hasher.update(b"-"),
                };
            }
        }
        hasher.finalize().to_hex().to_string()
    }
}
