//! Forecasting: engine abstraction, the additive trend/seasonality engine, the
//! request-level requestor and rolling-origin cross-validation.

pub mod additive;
pub mod cross_validation;
pub mod engine;
pub mod grid;
pub mod linalg;
pub mod metrics;
pub mod requestor;

pub use additive::{AdditiveEngine, EngineConfig, FittedAdditive, SeasonalityMode};
pub use cross_validation::{
    cross_validate, generate_cutoffs, CrossValidationConfig, CrossValidationResult, CvRow,
};
pub use engine::{EngineError, FittedModel, ForecastEngine, Prediction};
pub use grid::{forecast_grid, future_dates};
pub use metrics::{
    absolute_percentage_errors, performance_metrics, HorizonMetrics, DEFAULT_ROLLING_WINDOW,
};
pub use requestor::{
    ForecastOutcome, ForecastRequestor, DEFAULT_CHANGEPOINT_THRESHOLD, MIN_TRAINING_POINTS,
};
