//! Criterion benchmarks for StockCast hot paths.
//!
//! Benchmarks:
//! 1. Additive engine fit over growing histories
//! 2. Prediction over a four-year grid
//! 3. Frame normalization + fill on a provider frame

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use stockcast_core::data::fill::FillPolicy;
use stockcast_core::data::normalize::normalize_frame;
use stockcast_core::data::{DataProvider, SyntheticProvider};
use stockcast_core::domain::TrainingPoint;
use stockcast_core::forecast::{forecast_grid, AdditiveEngine, FittedModel, ForecastEngine};

// ── Helpers ──────────────────────────────────────────────────────────

fn make_training(n: usize) -> Vec<TrainingPoint> {
    let base = chrono::NaiveDate::from_ymd_opt(2016, 1, 4).unwrap();
    (0..n)
        .map(|i| {
            let value = 100.0 + (i as f64 * 0.05).sin() * 8.0 + i as f64 * 0.02;
            TrainingPoint::new(base + chrono::Duration::days(i as i64), value)
        })
        .collect()
}

// ── 1. Fit ───────────────────────────────────────────────────────────

fn bench_fit(c: &mut Criterion) {
    let engine = AdditiveEngine::default();
    let mut group = c.benchmark_group("additive_fit");
    for n in [250usize, 1000, 2500] {
        let training = make_training(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &training, |b, t| {
            b.iter(|| engine.fit(black_box(t)).unwrap())
        });
    }
    group.finish();
}

// ── 2. Predict ───────────────────────────────────────────────────────

fn bench_predict(c: &mut Criterion) {
    let training = make_training(2000);
    let fitted = AdditiveEngine::default().fit(&training).unwrap();
    let grid = forecast_grid(&training, 4 * 365);
    c.bench_function("additive_predict_4y", |b| {
        b.iter(|| fitted.predict(black_box(&grid)).unwrap())
    });
}

// ── 3. Normalize + fill ──────────────────────────────────────────────

fn bench_normalize(c: &mut Criterion) {
    let start = chrono::NaiveDate::from_ymd_opt(2016, 1, 1).unwrap();
    let end = chrono::NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();
    let fetched = SyntheticProvider::default()
        .with_missing_every(9)
        .fetch("GM", start, end)
        .unwrap();
    c.bench_function("normalize_and_fill", |b| {
        b.iter(|| {
            let (mut cols, _) = normalize_frame(black_box(&fetched.frame)).unwrap();
            cols.fill(FillPolicy::default());
            cols.into_records()
        })
    });
}

criterion_group!(benches, bench_fit, bench_predict, bench_normalize);
criterion_main!(benches);
