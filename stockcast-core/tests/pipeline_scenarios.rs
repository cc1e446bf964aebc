//! End-to-end scenarios through loader → preparer → requestor.
//!
//! Tests:
//! 1. 500 daily rows with gaps load fully filled and forecast to 865 points
//! 2. A ticker outside the allowed set never reaches the provider
//! 3. A single usable row fails with InsufficientData
//! 4. Identical closes give a flat forecast
//! 5. Repeated loads are served from the session cache
//! 6. Cross-validation leaves the production forecast untouched

use chrono::NaiveDate;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use stockcast_core::data::provider::numeric_frame;
use stockcast_core::data::{
    AllowedTickers, DataError, DataLoader, DataProvider, DataSource, FetchResult, FillPolicy,
};
use stockcast_core::forecast::{
    cross_validate, AdditiveEngine, CrossValidationConfig, ForecastRequestor,
};
use stockcast_core::prepare::prepare;
use stockcast_core::{ErrorKind, PipelineError};

// ── Helpers ──────────────────────────────────────────────────────────

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

/// Serves `n` consecutive daily rows from `start`. Every `gap_every`th row has
/// no open or close. Closes come from `close_at`.
struct ScriptedProvider {
    calls: Arc<AtomicUsize>,
    n: usize,
    gap_every: usize,
    close_at: fn(usize) -> f64,
}

impl DataProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        _end: NaiveDate,
    ) -> Result<FetchResult, DataError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let dates: Vec<NaiveDate> = (0..self.n)
            .map(|i| start + chrono::Duration::days(i as i64))
            .collect();
        let gap = |i: usize| self.gap_every > 0 && i % self.gap_every == self.gap_every - 1;
        let close: Vec<Option<f64>> = (0..self.n)
            .map(|i| (!gap(i)).then(|| (self.close_at)(i)))
            .collect();
        let open = close.clone();
        let frame = numeric_frame(
            &dates,
            vec![
                ("open", open),
                ("high", close.clone()),
                ("low", close.clone()),
                ("close", close),
            ],
        )?;
        Ok(FetchResult {
            symbol: symbol.to_string(),
            frame,
            source: DataSource::CsvImport,
        })
    }

    fn is_available(&self) -> bool {
        true
    }
}

fn loader(n: usize, gap_every: usize, close_at: fn(usize) -> f64) -> (DataLoader, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let provider = ScriptedProvider {
        calls: Arc::clone(&calls),
        n,
        gap_every,
        close_at,
    };
    (
        DataLoader::new(Box::new(provider), AllowedTickers::default(), FillPolicy::default()),
        calls,
    )
}

fn wavy(i: usize) -> f64 {
    40.0 + (i as f64 / 15.0).sin() * 2.0 + i as f64 * 0.01
}

// ── 1. Gaps fill, grid length ────────────────────────────────────────

#[test]
fn five_hundred_rows_with_gaps_forecast_to_865_points() {
    let (mut loader, _) = loader(500, 7, wavy);
    let series = loader.load("GM", d(2016, 1, 1), d(2024, 1, 1)).unwrap();

    let missing = series.missing_counts();
    assert_eq!(missing.open, 0);
    assert_eq!(missing.close, 0);

    let training = prepare(&series);
    assert_eq!(training.len(), 500);

    let requestor = ForecastRequestor::new(AdditiveEngine::default());
    let outcome = requestor.forecast(&training, 365).unwrap();
    assert_eq!(outcome.points.len(), 865);
    assert!(outcome
        .points
        .windows(2)
        .all(|w| w[0].timestamp < w[1].timestamp));
    for p in &outcome.points {
        let (lo, mid, hi) = (
            p.lower_bound.unwrap(),
            p.predicted.unwrap(),
            p.upper_bound.unwrap(),
        );
        assert!(lo <= mid && mid <= hi, "{lo} {mid} {hi}");
    }
}

// ── 2. Allowed set ───────────────────────────────────────────────────

#[test]
fn disallowed_ticker_never_calls_provider() {
    let (mut loader, calls) = loader(10, 0, wavy);
    let err = loader.load("TSLA", d(2016, 1, 1), d(2024, 1, 1)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidRequest);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

// ── 3. One row ───────────────────────────────────────────────────────

#[test]
fn single_row_is_insufficient() {
    let (mut loader, _) = loader(1, 0, wavy);
    let series = loader.load("F", d(2016, 1, 1), d(2024, 1, 1)).unwrap();
    let training = prepare(&series);
    assert_eq!(training.len(), 1);
    let err = ForecastRequestor::new(AdditiveEngine::default())
        .forecast(&training, 365)
        .unwrap_err();
    assert_eq!(
        err,
        PipelineError::InsufficientData {
            available: 1,
            required: 2
        }
    );
}

// ── 4. Flat history ──────────────────────────────────────────────────

#[test]
fn identical_closes_forecast_flat() {
    let (mut loader, _) = loader(90, 0, |_| 17.25);
    let series = loader.load("UAL", d(2016, 1, 1), d(2024, 1, 1)).unwrap();
    let training = prepare(&series);
    let requestor = ForecastRequestor::new(AdditiveEngine::default());
    let a = requestor.forecast(&training, 365).unwrap();
    let b = requestor.forecast(&training, 365).unwrap();
    assert_eq!(a.points, b.points);
    assert!(a.points.iter().all(|p| p.predicted == Some(17.25)));
}

// ── 5. Cache ─────────────────────────────────────────────────────────

#[test]
fn identical_loads_fetch_once() {
    let (mut loader, calls) = loader(30, 0, wavy);
    let first = loader.load("DAL", d(2016, 1, 1), d(2024, 1, 1)).unwrap();
    let second = loader.load("dal", d(2016, 1, 1), d(2024, 1, 1)).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    loader.load("DAL", d(2017, 1, 1), d(2024, 1, 1)).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

// ── 6. Cross-validation isolation ────────────────────────────────────

#[test]
fn cross_validation_does_not_change_forecast() {
    let (mut loader, _) = loader(400, 0, wavy);
    let series = loader.load("CVS", d(2016, 1, 1), d(2024, 1, 1)).unwrap();
    let training = prepare(&series);
    let requestor = ForecastRequestor::new(AdditiveEngine::default());

    let before = requestor.forecast(&training, 365).unwrap();
    let cfg = CrossValidationConfig {
        initial_days: 200,
        period_days: 60,
        horizon_days: 60,
    };
    let cv = cross_validate(requestor.engine(), &training, &cfg).unwrap();
    assert!(!cv.rows.is_empty());
    let after = requestor.forecast(&training, 365).unwrap();
    assert_eq!(before.points, after.points);
}
