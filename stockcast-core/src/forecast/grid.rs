//! Prediction grid construction.

use crate::domain::TrainingPoint;
use chrono::NaiveDate;

/// `horizon_days` consecutive calendar days following `last`.
pub fn future_dates(last: NaiveDate, horizon_days: u32) -> Vec<NaiveDate> {
    (1..=i64::from(horizon_days))
        .map(|i| last + chrono::Duration::days(i))
        .collect()
}

/// Every training timestamp followed by `horizon_days` future calendar days.
///
/// Future dates include weekends and holidays; the grid never skips a day after
/// the last observation.
pub fn forecast_grid(training: &[TrainingPoint], horizon_days: u32) -> Vec<NaiveDate> {
    let mut grid: Vec<NaiveDate> = training.iter().map(|p| p.timestamp).collect();
    if let Some(last) = training.last() {
        grid.extend(future_dates(last.timestamp, horizon_days));
    }
    grid
}
