//! Forecast requestor: one fit and one predict per request.
//!
//! The requestor owns an engine, builds the prediction grid (history plus the
//! requested horizon), and converts engine output into [`ForecastPoint`]s,
//! mapping non-finite values to `None`. Engine failures surface as
//! `PipelineError::FitFailed`.

use super::engine::{EngineError, FittedModel, ForecastEngine};
use super::grid::forecast_grid;
use crate::domain::{Changepoint, ComponentPoint, ForecastPoint, TrainingPoint};
use crate::error::PipelineError;
use chrono::NaiveDate;

/// Fewest training points a forecast can be fitted on.
pub const MIN_TRAINING_POINTS: usize = 2;

/// Rate changes smaller than this are not reported as changepoints.
pub const DEFAULT_CHANGEPOINT_THRESHOLD: f64 = 0.01;

fn finite(v: f64) -> Option<f64> {
    v.is_finite().then_some(v)
}

fn fit_failed(err: EngineError) -> PipelineError {
    PipelineError::FitFailed(err.to_string())
}

#[derive(Debug)]
pub struct ForecastOutcome<F> {
    pub points: Vec<ForecastPoint>,
    pub fitted: F,
    pub grid: Vec<NaiveDate>,
    pub history_len: usize,
    pub horizon_days: u32,
    changepoint_threshold: f64,
}

impl<F: FittedModel> ForecastOutcome<F> {
    /// The points past the end of the training history.
    pub fn future(&self) -> &[ForecastPoint] {
        &self.points[self.history_len.min(self.points.len())..]
    }

    /// Trend and seasonal decomposition over the same grid as `points`.
    pub fn components(&self) -> Result<Vec<ComponentPoint>, PipelineError> {
        self.fitted.components(&self.grid).map_err(fit_failed)
    }

    /// Changepoints whose rate change clears the requestor's threshold.
    pub fn changepoints(&self) -> Vec<Changepoint> {
        self.fitted.changepoints(self.changepoint_threshold)
    }
}

#[derive(Debug, Clone)]
pub struct ForecastRequestor<E> {
    engine: E,
    changepoint_threshold: f64,
}

impl<E: ForecastEngine> ForecastRequestor<E> {
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            changepoint_threshold: DEFAULT_CHANGEPOINT_THRESHOLD,
        }
    }

    pub fn with_changepoint_threshold(mut self, threshold: f64) -> Self {
        self.changepoint_threshold = threshold;
        self
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Fit on `training` and predict over history plus `horizon_days` future days.
    pub fn forecast(
        &self,
        training: &[TrainingPoint],
        horizon_days: u32,
    ) -> Result<ForecastOutcome<E::Fitted>, PipelineError> {
        if training.len() < MIN_TRAINING_POINTS {
            return Err(PipelineError::InsufficientData {
                available: training.len(),
                required: MIN_TRAINING_POINTS,
            });
        }

        let grid = forecast_grid(training, horizon_days);
        tracing::info!(
            engine = self.engine.name(),
            history = training.len(),
            horizon_days,
            "fitting forecast model"
        );
        let fitted = self.engine.fit(training).map_err(fit_failed)?;
        let predictions = fitted.predict(&grid).map_err(fit_failed)?;
        if predictions.len() != grid.len() {
            return Err(PipelineError::FitFailed(format!(
                "engine returned {} predictions for {} grid dates",
                predictions.len(),
                grid.len()
            )));
        }

        let points: Vec<ForecastPoint> = grid
            .iter()
            .zip(&predictions)
            .map(|(&timestamp, p)| ForecastPoint {
                timestamp,
                predicted: finite(p.yhat),
                lower_bound: finite(p.yhat_lower),
                upper_bound: finite(p.yhat_upper),
            })
            .collect();

        let non_finite = points.iter().filter(|p| p.predicted.is_none()).count();
        if non_finite > 0 {
            tracing::warn!(non_finite, "engine produced non-finite predictions");
        }

        Ok(ForecastOutcome {
            points,
            fitted,
            grid,
            history_len: training.len(),
            horizon_days,
            changepoint_threshold: self.changepoint_threshold,
        })
    }
}
