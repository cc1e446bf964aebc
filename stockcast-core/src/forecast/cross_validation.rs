//! Rolling-origin cross-validation.
//!
//! Cutoffs step back from `last - horizon` by `period` days while at least
//! `initial` days of history precede them. For each cutoff a fresh model is fit
//! on the points up to and including the cutoff and scored on the points in
//! `(cutoff, cutoff + horizon]`. The training series is never modified.

use super::engine::{FittedModel, ForecastEngine};
use super::requestor::MIN_TRAINING_POINTS;
use crate::domain::TrainingPoint;
use crate::error::PipelineError;
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// Upper bound on each window length: one hundred years of days.
pub const MAX_WINDOW_DAYS: u32 = 36_525;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrossValidationConfig {
    pub initial_days: u32,
    pub period_days: u32,
    pub horizon_days: u32,
}

impl Default for CrossValidationConfig {
    fn default() -> Self {
        Self {
            initial_days: 730,
            period_days: 180,
            horizon_days: 365,
        }
    }
}

impl CrossValidationConfig {
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.period_days == 0 || self.horizon_days == 0 {
            return Err(PipelineError::InvalidRequest(
                "cross-validation period and horizon must be at least one day".into(),
            ));
        }
        for (name, days) in [
            ("initial", self.initial_days),
            ("period", self.period_days),
            ("horizon", self.horizon_days),
        ] {
            if days > MAX_WINDOW_DAYS {
                return Err(PipelineError::InvalidRequest(format!(
                    "cross-validation {name} of {days} days exceeds {MAX_WINDOW_DAYS}"
                )));
            }
        }
        Ok(())
    }
}

fn out_of_range(what: &str) -> PipelineError {
    PipelineError::InvalidRequest(format!("cross-validation {what} falls outside the calendar"))
}

/// One held-out observation scored against the fold's forecast.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CvRow {
    pub cutoff: NaiveDate,
    pub timestamp: NaiveDate,
    pub actual: f64,
    pub predicted: f64,
    pub lower: f64,
    pub upper: f64,
}

impl CvRow {
    /// Days between the cutoff and the scored date.
    pub fn horizon_days(&self) -> i64 {
        (self.timestamp - self.cutoff).num_days()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossValidationResult {
    pub cutoffs: Vec<NaiveDate>,
    pub rows: Vec<CvRow>,
}

/// Cutoff dates in ascending order, skipping any whose evaluation window holds
/// no observations or that leave fewer than two training points at or before
/// them.
pub fn generate_cutoffs(
    training: &[TrainingPoint],
    config: &CrossValidationConfig,
) -> Result<Vec<NaiveDate>, PipelineError> {
    config.validate()?;
    let (Some(first), Some(last)) = (training.first(), training.last()) else {
        return Err(PipelineError::InsufficientData {
            available: 0,
            required: MIN_TRAINING_POINTS,
        });
    };
    let horizon = Duration::days(i64::from(config.horizon_days));
    let period = Duration::days(i64::from(config.period_days));
    let earliest = first
        .timestamp
        .checked_add_signed(Duration::days(i64::from(config.initial_days)))
        .ok_or_else(|| out_of_range("initial window"))?;

    let mut cutoffs = Vec::new();
    let mut next = Some(
        last.timestamp
            .checked_sub_signed(horizon)
            .ok_or_else(|| out_of_range("horizon"))?,
    );
    while let Some(cutoff) = next.filter(|c| *c >= earliest) {
        let window_end = cutoff
            .checked_add_signed(horizon)
            .ok_or_else(|| out_of_range("horizon"))?;
        let split = training.partition_point(|p| p.timestamp <= cutoff);
        let has_eval = training[split..]
            .first()
            .is_some_and(|p| p.timestamp <= window_end);
        if has_eval && split >= MIN_TRAINING_POINTS {
            cutoffs.push(cutoff);
        }
        next = cutoff.checked_sub_signed(period);
    }
    cutoffs.reverse();

    if cutoffs.is_empty() {
        let span = (last.timestamp - first.timestamp).num_days();
        let needed = i64::from(config.initial_days) + i64::from(config.horizon_days);
        return Err(PipelineError::InsufficientData {
            available: span.max(0) as usize,
            required: needed as usize,
        });
    }
    Ok(cutoffs)
}

/// Run rolling-origin cross-validation with `engine`.
pub fn cross_validate<E: ForecastEngine>(
    engine: &E,
    training: &[TrainingPoint],
    config: &CrossValidationConfig,
) -> Result<CrossValidationResult, PipelineError> {
    let cutoffs = generate_cutoffs(training, config)?;
    let horizon = Duration::days(i64::from(config.horizon_days));
    tracing::info!(
        folds = cutoffs.len(),
        initial = config.initial_days,
        period = config.period_days,
        horizon = config.horizon_days,
        "running cross-validation"
    );

    let mut rows = Vec::new();
    for &cutoff in &cutoffs {
        let split = training.partition_point(|p| p.timestamp <= cutoff);
        let (history, rest) = training.split_at(split);
        let held_out: Vec<&TrainingPoint> = rest
            .iter()
            .take_while(|p| p.timestamp <= cutoff + horizon)
            .collect();

        let fitted = engine
            .fit(history)
            .map_err(|e| PipelineError::FitFailed(format!("fold at {cutoff}: {e}")))?;
        let dates: Vec<NaiveDate> = held_out.iter().map(|p| p.timestamp).collect();
        let preds = fitted
            .predict(&dates)
            .map_err(|e| PipelineError::FitFailed(format!("fold at {cutoff}: {e}")))?;

        rows.extend(held_out.iter().zip(&preds).map(|(actual, p)| CvRow {
            cutoff,
            timestamp: actual.timestamp,
            actual: actual.value,
            predicted: p.yhat,
            lower: p.yhat_lower,
            upper: p.yhat_upper,
        }));
        tracing::debug!(%cutoff, train = history.len(), scored = held_out.len(), "fold complete");
    }

    Ok(CrossValidationResult { cutoffs, rows })
}
