//! Data loader: validated, cached, cleaned price history for one ticker.
//!
//! Order of work for a load:
//! 1. Validate the ticker against the allowed set and the date range
//! 2. Serve from the session cache when the exact `(ticker, start, end)` is held
//! 3. Fetch from the provider, normalize types, order and dedupe rows
//! 4. Apply the fill policy per column and cache the finished series
//!
//! Validation failures never reach the provider.

use super::cache::{CacheKey, SessionCache};
use super::fill::FillPolicy;
use super::normalize::normalize_frame;
use super::provider::DataProvider;
use super::tickers::AllowedTickers;
use crate::domain::PriceSeries;
use crate::error::PipelineError;
use chrono::NaiveDate;
use std::sync::Arc;

pub struct DataLoader {
    provider: Box<dyn DataProvider>,
    tickers: AllowedTickers,
    fill: FillPolicy,
    cache: SessionCache,
}

impl DataLoader {
    pub fn new(provider: Box<dyn DataProvider>, tickers: AllowedTickers, fill: FillPolicy) -> Self {
        Self {
            provider,
            tickers,
            fill,
            cache: SessionCache::new(),
        }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn tickers(&self) -> &AllowedTickers {
        &self.tickers
    }

    pub fn fill_policy(&self) -> FillPolicy {
        self.fill
    }

    pub fn cache(&self) -> &SessionCache {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut SessionCache {
        &mut self.cache
    }

    /// Load the cleaned daily history for `ticker` over `start..=end`.
    pub fn load(
        &mut self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Arc<PriceSeries>, PipelineError> {
        let symbol = self
            .tickers
            .canonicalize(ticker)
            .ok_or_else(|| {
                PipelineError::InvalidRequest(format!(
                    "ticker '{}' is not one of: {}",
                    ticker.trim(),
                    self.tickers.iter().collect::<Vec<_>>().join(", ")
                ))
            })?
            .to_string();
        if start > end {
            return Err(PipelineError::InvalidRequest(format!(
                "start date {start} is after end date {end}"
            )));
        }

        let key = CacheKey::new(symbol.as_str(), start, end);
        if let Some(series) = self.cache.get(&key) {
            tracing::debug!(ticker = %symbol, %start, %end, "session cache hit");
            return Ok(series);
        }

        let series = Arc::new(self.fetch_clean(&symbol, start, end)?);
        self.cache.insert(key, Arc::clone(&series));
        Ok(series)
    }

    fn fetch_clean(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries, PipelineError> {
        tracing::info!(
            ticker = symbol,
            %start,
            %end,
            provider = self.provider.name(),
            "fetching price history"
        );
        let fetched = self
            .provider
            .fetch(symbol, start, end)
            .map_err(|e| PipelineError::unavailable(symbol, e.to_string()))?;
        if fetched.row_count() == 0 {
            return Err(PipelineError::unavailable(symbol, "provider returned no rows"));
        }

        let (mut columns, stats) = normalize_frame(&fetched.frame)
            .map_err(|e| PipelineError::unavailable(symbol, e.to_string()))?;
        if stats.duplicate_dates > 0 || stats.null_dates > 0 {
            tracing::debug!(
                ticker = symbol,
                duplicates = stats.duplicate_dates,
                null_dates = stats.null_dates,
                "dropped rows during normalization"
            );
        }
        if columns.is_empty() {
            return Err(PipelineError::unavailable(symbol, "no dated rows in provider data"));
        }

        for (column, report) in columns.fill(self.fill) {
            if report.still_missing == columns.len() {
                tracing::warn!(ticker = symbol, column, "column has no usable values");
            } else if report.filled() > 0 {
                tracing::debug!(
                    ticker = symbol,
                    column,
                    forward = report.forward_filled,
                    backward = report.backward_filled,
                    "filled missing values"
                );
            }
        }

        let rows = columns.len();
        let series = PriceSeries::new(symbol, start, end, fetched.source, columns.into_records());
        tracing::info!(ticker = symbol, rows, source = ?series.source, "price history loaded");
        Ok(series)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::provider::{numeric_frame, DataError, DataSource, FetchResult};
    use crate::data::SyntheticProvider;
    use crate::error::ErrorKind;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    /// Counts fetches and serves a fixed close column.
    struct FixedProvider {
        calls: Arc<AtomicUsize>,
        closes: Vec<Option<f64>>,
        fail: bool,
    }

    impl DataProvider for FixedProvider {
        fn name(&self) -> &str {
            "fixed"
        }

        fn fetch(
            &self,
            symbol: &str,
            start: NaiveDate,
            _end: NaiveDate,
        ) -> Result<FetchResult, DataError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(DataError::NetworkUnreachable("offline".into()));
            }
            let dates: Vec<NaiveDate> = (0..self.closes.len())
                .map(|i| start + chrono::Duration::days(i as i64))
                .collect();
            let frame = numeric_frame(&dates, vec![("close", self.closes.clone())])?;
            Ok(FetchResult {
                symbol: symbol.to_string(),
                frame,
                source: DataSource::CsvImport,
            })
        }

        fn is_available(&self) -> bool {
            !self.fail
        }
    }

    fn loader(closes: Vec<Option<f64>>, fail: bool) -> (DataLoader, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let provider = FixedProvider {
            calls: Arc::clone(&calls),
            closes,
            fail,
        };
        let loader = DataLoader::new(
            Box::new(provider),
            AllowedTickers::default(),
            FillPolicy::default(),
        );
        (loader, calls)
    }

    #[test]
    fn unknown_ticker_rejected_before_fetch() {
        let (mut loader, calls) = loader(vec![Some(1.0)], false);
        let err = loader.load("AAPL", d(2016, 1, 1), d(2024, 1, 1)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn inverted_range_rejected_before_fetch() {
        let (mut loader, calls) = loader(vec![Some(1.0)], false);
        let err = loader.load("GM", d(2024, 1, 2), d(2024, 1, 1)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn second_load_is_served_from_cache() {
        let (mut loader, calls) = loader(vec![Some(1.0), Some(2.0)], false);
        let a = loader.load("gm", d(2024, 1, 1), d(2024, 2, 1)).unwrap();
        let b = loader.load("GM", d(2024, 1, 1), d(2024, 2, 1)).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(a.ticker, "GM");
        assert_eq!(loader.cache().stats().hits, 1);
    }

    #[test]
    fn invalidated_ticker_is_refetched() {
        let (mut loader, calls) = loader(vec![Some(1.0)], false);
        loader.load("F", d(2024, 1, 1), d(2024, 2, 1)).unwrap();
        loader.cache_mut().invalidate("F");
        loader.load("F", d(2024, 1, 1), d(2024, 2, 1)).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn provider_failure_is_data_unavailable() {
        let (mut loader, _) = loader(vec![], true);
        let err = loader.load("UAL", d(2024, 1, 1), d(2024, 2, 1)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DataUnavailable);
        assert!(loader.cache().is_empty());
    }

    #[test]
    fn zero_rows_is_data_unavailable() {
        let (mut loader, _) = loader(vec![], false);
        let err = loader.load("UAL", d(2024, 1, 1), d(2024, 2, 1)).unwrap_err();
        assert_eq!(
            err,
            PipelineError::DataUnavailable {
                symbol: "UAL".into(),
                reason: "provider returned no rows".into()
            }
        );
    }

    #[test]
    fn gaps_are_filled_in_loaded_series() {
        let (mut loader, _) = loader(vec![None, Some(2.0), None, Some(4.0)], false);
        let series = loader.load("CVS", d(2024, 1, 1), d(2024, 2, 1)).unwrap();
        let closes: Vec<_> = series.records().iter().map(|r| r.close).collect();
        assert_eq!(closes, vec![Some(2.0), Some(2.0), Some(2.0), Some(4.0)]);
        assert_eq!(series.missing_counts().close, 0);
        // Columns absent from the provider stay empty
        assert_eq!(series.missing_counts().open, 4);
    }

    #[test]
    fn synthetic_gaps_fill_completely() {
        let mut loader = DataLoader::new(
            Box::new(SyntheticProvider::default().with_missing_every(4)),
            AllowedTickers::default(),
            FillPolicy::default(),
        );
        let series = loader.load("DAL", d(2023, 1, 1), d(2023, 6, 30)).unwrap();
        let missing = series.missing_counts();
        assert_eq!(missing.open, 0);
        assert_eq!(missing.close, 0);
        assert_eq!(series.source, DataSource::Synthetic);
    }
}
