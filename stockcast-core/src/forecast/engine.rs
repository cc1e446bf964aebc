//! Forecasting engine abstraction.
//!
//! An engine turns a training series into a fitted model; a fitted model turns
//! a grid of dates into predictions with uncertainty bounds. Fitting consumes
//! nothing and mutates nothing, so one engine value can serve many requests.

use crate::domain::{Changepoint, ComponentPoint, TrainingPoint};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("need at least {required} observations, got {available}")]
    TooFewObservations { available: usize, required: usize },

    #[error("non-finite training value at {0}")]
    NonFiniteInput(NaiveDate),

    #[error("training timestamps are not strictly increasing at {0}")]
    Unordered(NaiveDate),

    #[error("training timestamps span zero days")]
    ZeroSpan,

    #[error("normal equations are singular (pivot {pivot})")]
    Singular { pivot: usize },

    #[error("prediction grid is empty")]
    EmptyGrid,

    #[error("invalid engine parameter: {0}")]
    InvalidParameter(String),
}

/// Raw engine output for one grid date, before non-finite screening.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub timestamp: NaiveDate,
    pub yhat: f64,
    pub yhat_lower: f64,
    pub yhat_upper: f64,
}

pub trait ForecastEngine {
    type Fitted: FittedModel;

    fn name(&self) -> &str;

    /// Fit a fresh model to `training`.
    fn fit(&self, training: &[TrainingPoint]) -> Result<Self::Fitted, EngineError>;
}

pub trait FittedModel: std::fmt::Debug {
    /// One prediction per grid date, in grid order.
    fn predict(&self, grid: &[NaiveDate]) -> Result<Vec<Prediction>, EngineError>;

    /// Additive components per grid date, in grid order.
    fn components(&self, grid: &[NaiveDate]) -> Result<Vec<ComponentPoint>, EngineError>;

    /// Trend changepoints whose rate change magnitude is at least `threshold`.
    fn changepoints(&self, threshold: f64) -> Vec<Changepoint>;
}
