//! Forecast accuracy metrics over cross-validation rows, grouped by horizon.

use super::cross_validation::CvRow;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Share of rows in each rolling window.
pub const DEFAULT_ROLLING_WINDOW: f64 = 0.1;

/// Accuracy over the window of rows ending at one forecast horizon.
///
/// Percentage errors are fractions (0.05 = 5%). `mape` and `mdape` are `None`
/// when any actual value is zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HorizonMetrics {
    pub horizon_days: i64,
    pub mse: f64,
    pub rmse: f64,
    pub mae: f64,
    pub mape: Option<f64>,
    pub mdape: Option<f64>,
    pub smape: f64,
    pub coverage: f64,
}

fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    Some(if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    })
}

/// Actuals smaller than this in magnitude make percentage errors undefined.
const ZERO_ACTUAL: f64 = 1e-8;

/// Sorted rows grouped by horizon: `(horizon_days, row range)`.
fn horizon_groups(sorted: &[CvRow]) -> Vec<(i64, Range<usize>)> {
    let mut groups: Vec<(i64, Range<usize>)> = Vec::new();
    for (i, row) in sorted.iter().enumerate() {
        let h = row.horizon_days();
        match groups.last_mut() {
            Some((last, range)) if *last == h => range.end = i + 1,
            _ => groups.push((h, i..i + 1)),
        }
    }
    groups
}

/// Mean over the `w` rows ending at each horizon group. The earliest group
/// that only partly fits the window contributes in proportion to its mean.
/// `None` where fewer than `w` rows are available.
fn rolling_mean_by_h(values: &[f64], groups: &[(i64, Range<usize>)], w: usize) -> Vec<Option<f64>> {
    let sums: Vec<f64> = groups
        .iter()
        .map(|(_, r)| values[r.clone()].iter().sum())
        .collect();
    let counts: Vec<usize> = groups.iter().map(|(_, r)| r.len()).collect();

    let mut out = vec![None; groups.len()];
    let mut trailing = groups.len();
    let (mut x_sum, mut n_sum) = (0.0, 0usize);
    for i in (0..groups.len()).rev() {
        x_sum += sums[i];
        n_sum += counts[i];
        while n_sum >= w {
            let excess = (n_sum - w) as f64 * sums[i] / counts[i] as f64;
            let t = trailing - 1;
            out[t] = Some((x_sum - excess) / w as f64);
            x_sum -= sums[t];
            n_sum -= counts[t];
            trailing = t;
        }
    }
    out
}

/// Median over every row of a horizon group plus as many preceding rows as
/// needed to reach `w`. `None` where fewer than `w` rows are available.
fn rolling_median_by_h(values: &[f64], groups: &[(i64, Range<usize>)], w: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; groups.len()];
    for (g, (_, range)) in groups.iter().enumerate().rev() {
        let mut xs: Vec<f64> = values[range.clone()].to_vec();
        let mut next = range.start;
        while xs.len() < w && next > 0 {
            next -= 1;
            xs.push(values[next]);
        }
        if xs.len() < w {
            break;
        }
        out[g] = median(&mut xs);
    }
    out
}

/// Rolling accuracy metrics by horizon.
///
/// Rows are sorted by horizon and the window holds
/// `clamp(floor(rolling_window · n), 1, n)` rows. For each distinct horizon
/// the means cover the `w` rows ending at that horizon's last row, weighting a
/// partially included earliest horizon by its mean; `mdape` takes the median
/// over the whole horizon group plus the preceding rows needed to reach `w`.
/// Horizons with fewer than `w` rows at or before them are skipped. `mape` and
/// `mdape` are `None` everywhere when any actual value is zero.
pub fn performance_metrics(rows: &[CvRow], rolling_window: f64) -> Vec<HorizonMetrics> {
    if rows.is_empty() {
        return Vec::new();
    }
    let mut sorted: Vec<CvRow> = rows.to_vec();
    sorted.sort_by_key(|r| r.horizon_days());

    let n = sorted.len();
    let w = ((rolling_window.max(0.0) * n as f64).floor() as usize).clamp(1, n);
    let groups = horizon_groups(&sorted);

    let squared: Vec<f64> = sorted.iter().map(|r| (r.actual - r.predicted).powi(2)).collect();
    let absolute: Vec<f64> = sorted.iter().map(|r| (r.actual - r.predicted).abs()).collect();
    let symmetric: Vec<f64> = sorted
        .iter()
        .map(|r| {
            let denom = (r.actual.abs() + r.predicted.abs()) / 2.0;
            if denom == 0.0 {
                0.0
            } else {
                (r.actual - r.predicted).abs() / denom
            }
        })
        .collect();
    let covered: Vec<f64> = sorted
        .iter()
        .map(|r| f64::from(u8::from(r.lower <= r.actual && r.actual <= r.upper)))
        .collect();
    let percentage: Option<Vec<f64>> = sorted
        .iter()
        .all(|r| r.actual.abs() >= ZERO_ACTUAL)
        .then(|| {
            sorted
                .iter()
                .map(|r| ((r.actual - r.predicted) / r.actual).abs())
                .collect()
        });

    let mse = rolling_mean_by_h(&squared, &groups, w);
    let mae = rolling_mean_by_h(&absolute, &groups, w);
    let smape = rolling_mean_by_h(&symmetric, &groups, w);
    let coverage = rolling_mean_by_h(&covered, &groups, w);
    let mape = percentage.as_ref().map(|p| rolling_mean_by_h(p, &groups, w));
    let mdape = percentage.as_ref().map(|p| rolling_median_by_h(p, &groups, w));

    groups
        .iter()
        .enumerate()
        .filter_map(|(g, (h, _))| {
            let mse = mse[g]?;
            Some(HorizonMetrics {
                horizon_days: *h,
                mse,
                rmse: mse.sqrt(),
                mae: mae[g]?,
                mape: mape.as_ref().and_then(|m| m[g]),
                mdape: mdape.as_ref().and_then(|m| m[g]),
                smape: smape[g]?,
                coverage: coverage[g]?,
            })
        })
        .collect()
}

/// Absolute percentage error per row, for scatter plots against horizon.
pub fn absolute_percentage_errors(rows: &[CvRow]) -> Vec<(i64, Option<f64>)> {
    rows.iter()
        .map(|r| {
            let ape = (r.actual != 0.0).then(|| ((r.actual - r.predicted) / r.actual).abs());
            (r.horizon_days(), ape)
        })
        .collect()
}
