//! Additive trend + seasonality forecasting engine.
//!
//! The model is `y(t) = trend(t) + yearly(t) + weekly(t) + noise`:
//! - trend is piecewise linear, with potential changepoints spread over the
//!   first part of the history
//! - yearly and weekly terms are Fourier series (periods 365.25 and 7 days)
//! - coefficients come from a ridge-penalized least-squares fit; changepoint
//!   and seasonality coefficients are shrunk toward zero by their prior scales
//!
//! Time is scaled so the history spans `[0, 1]` and values are divided by the
//! largest absolute value. Uncertainty bounds combine residual noise with the
//! variance of future trend changes, which grows with distance past the history.

use super::engine::{EngineError, FittedModel, ForecastEngine, Prediction};
use super::linalg::NormalEquations;
use crate::data::provider::epoch;
use crate::domain::{Changepoint, ComponentPoint, TrainingPoint};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};
use std::f64::consts::PI;

const YEAR_DAYS: f64 = 365.25;
const WEEK_DAYS: f64 = 7.0;

/// Near-zero penalty for intercept and base slope, keeping the system definite.
const BASE_PENALTY: f64 = 1e-8;
/// Noise variance assumed for the first pass (scaled units).
const INITIAL_NOISE_VAR: f64 = 1e-2;
const MIN_NOISE_VAR: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeasonalityMode {
    /// Yearly when the history covers two years, weekly when it covers two weeks.
    #[default]
    Auto,
    Enabled,
    Disabled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub n_changepoints: usize,
    /// Fraction of the history (from the start) where changepoints may sit.
    pub changepoint_range: f64,
    pub changepoint_prior_scale: f64,
    pub seasonality_prior_scale: f64,
    pub yearly_seasonality: SeasonalityMode,
    pub weekly_seasonality: SeasonalityMode,
    pub yearly_order: usize,
    pub weekly_order: usize,
    /// Probability mass inside the uncertainty interval.
    pub interval_width: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            n_changepoints: 25,
            changepoint_range: 0.8,
            changepoint_prior_scale: 0.05,
            seasonality_prior_scale: 10.0,
            yearly_seasonality: SeasonalityMode::Auto,
            weekly_seasonality: SeasonalityMode::Auto,
            yearly_order: 10,
            weekly_order: 3,
            interval_width: 0.8,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), EngineError> {
        if !(self.changepoint_range > 0.0 && self.changepoint_range <= 1.0) {
            return Err(EngineError::InvalidParameter(format!(
                "changepoint_range must be in (0, 1], got {}",
                self.changepoint_range
            )));
        }
        for (name, v) in [
            ("changepoint_prior_scale", self.changepoint_prior_scale),
            ("seasonality_prior_scale", self.seasonality_prior_scale),
        ] {
            if !(v.is_finite() && v > 0.0) {
                return Err(EngineError::InvalidParameter(format!(
                    "{name} must be positive, got {v}"
                )));
            }
        }
        if !(self.interval_width > 0.0 && self.interval_width < 1.0) {
            return Err(EngineError::InvalidParameter(format!(
                "interval_width must be in (0, 1), got {}",
                self.interval_width
            )));
        }
        if self.yearly_order == 0 || self.weekly_order == 0 {
            return Err(EngineError::InvalidParameter(
                "Fourier orders must be at least 1; disable the seasonality instead".into(),
            ));
        }
        Ok(())
    }

    /// Two-sided normal quantile for `interval_width`.
    pub fn interval_z(&self) -> Result<f64, EngineError> {
        let normal =
            Normal::new(0.0, 1.0).map_err(|e| EngineError::InvalidParameter(e.to_string()))?;
        Ok(normal.inverse_cdf(0.5 + self.interval_width / 2.0))
    }
}

#[derive(Debug, Clone, Default)]
pub struct AdditiveEngine {
    config: EngineConfig,
}

impl AdditiveEngine {
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

/// Column layout of the design matrix: `[1, t, hinges.., yearly.., weekly..]`.
#[derive(Debug, Clone, PartialEq)]
struct Layout {
    changepoints_t: Vec<f64>,
    yearly_order: Option<usize>,
    weekly_order: Option<usize>,
}

impl Layout {
    fn hinge_start(&self) -> usize {
        2
    }

    fn yearly_start(&self) -> usize {
        self.hinge_start() + self.changepoints_t.len()
    }

    fn weekly_start(&self) -> usize {
        self.yearly_start() + 2 * self.yearly_order.unwrap_or(0)
    }

    fn width(&self) -> usize {
        self.weekly_start() + 2 * self.weekly_order.unwrap_or(0)
    }

    fn row(&self, t: f64, epoch_days: f64, out: &mut Vec<f64>) {
        out.clear();
        out.push(1.0);
        out.push(t);
        out.extend(self.changepoints_t.iter().map(|s| (t - s).max(0.0)));
        if let Some(order) = self.yearly_order {
            fourier(epoch_days, YEAR_DAYS, order, out);
        }
        if let Some(order) = self.weekly_order {
            fourier(epoch_days, WEEK_DAYS, order, out);
        }
    }

    fn penalties(&self, noise_var: f64, config: &EngineConfig) -> Vec<f64> {
        let cp = noise_var / config.changepoint_prior_scale.powi(2);
        let season = noise_var / config.seasonality_prior_scale.powi(2);
        let mut p = vec![BASE_PENALTY, BASE_PENALTY];
        p.extend(std::iter::repeat(cp).take(self.changepoints_t.len()));
        p.extend(std::iter::repeat(season).take(self.width() - self.yearly_start()));
        p
    }
}

fn fourier(epoch_days: f64, period: f64, order: usize, out: &mut Vec<f64>) {
    for k in 1..=order {
        let x = 2.0 * PI * k as f64 * epoch_days / period;
        out.push(x.sin());
        out.push(x.cos());
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// A fitted additive model.
#[derive(Debug, Clone)]
pub struct FittedAdditive {
    first: NaiveDate,
    span_days: f64,
    y_scale: f64,
    layout: Layout,
    beta: Vec<f64>,
    changepoint_dates: Vec<NaiveDate>,
    /// Residual standard deviation, scaled units.
    sigma: f64,
    z: f64,
    history_len: usize,
}

impl FittedAdditive {
    pub fn history_len(&self) -> usize {
        self.history_len
    }

    pub fn has_yearly(&self) -> bool {
        self.layout.yearly_order.is_some()
    }

    pub fn has_weekly(&self) -> bool {
        self.layout.weekly_order.is_some()
    }

    pub fn changepoint_count(&self) -> usize {
        self.layout.changepoints_t.len()
    }

    fn deltas(&self) -> &[f64] {
        let start = self.layout.hinge_start();
        &self.beta[start..start + self.layout.changepoints_t.len()]
    }

    fn scaled_time(&self, date: NaiveDate) -> f64 {
        (date - self.first).num_days() as f64 / self.span_days
    }

    /// (trend, yearly, weekly) in scaled units.
    fn parts(&self, date: NaiveDate, row: &mut Vec<f64>) -> (f64, Option<f64>, Option<f64>) {
        let t = self.scaled_time(date);
        let epoch_days = (date - epoch()).num_days() as f64;
        self.layout.row(t, epoch_days, row);

        let ys = self.layout.yearly_start();
        let ws = self.layout.weekly_start();
        let end = self.layout.width();
        let trend = dot(&row[..ys], &self.beta[..ys]);
        let yearly = self
            .layout
            .yearly_order
            .map(|_| dot(&row[ys..ws], &self.beta[ys..ws]));
        let weekly = self
            .layout
            .weekly_order
            .map(|_| dot(&row[ws..end], &self.beta[ws..end]));
        (trend, yearly, weekly)
    }

    /// Variance of the trend at scaled time `t` from future changepoints.
    fn trend_variance(&self, t: f64) -> f64 {
        let h = t - 1.0;
        let deltas = self.deltas();
        if h <= 0.0 || deltas.is_empty() {
            return 0.0;
        }
        let rate = deltas.len() as f64;
        let b = deltas.iter().map(|d| d.abs()).sum::<f64>() / deltas.len() as f64 + 1e-8;
        2.0 * rate * b * b * h.powi(3) / 3.0
    }
}

impl FittedModel for FittedAdditive {
    fn predict(&self, grid: &[NaiveDate]) -> Result<Vec<Prediction>, EngineError> {
        if grid.is_empty() {
            return Err(EngineError::EmptyGrid);
        }
        let mut row = Vec::with_capacity(self.layout.width());
        Ok(grid
            .iter()
            .map(|&date| {
                let (trend, yearly, weekly) = self.parts(date, &mut row);
                let yhat = trend + yearly.unwrap_or(0.0) + weekly.unwrap_or(0.0);
                let t = self.scaled_time(date);
                let half =
                    self.z * (self.sigma * self.sigma + self.trend_variance(t)).sqrt();
                Prediction {
                    timestamp: date,
                    yhat: yhat * self.y_scale,
                    yhat_lower: (yhat - half) * self.y_scale,
                    yhat_upper: (yhat + half) * self.y_scale,
                }
            })
            .collect())
    }

    fn components(&self, grid: &[NaiveDate]) -> Result<Vec<ComponentPoint>, EngineError> {
        if grid.is_empty() {
            return Err(EngineError::EmptyGrid);
        }
        let mut row = Vec::with_capacity(self.layout.width());
        Ok(grid
            .iter()
            .map(|&date| {
                let (trend, yearly, weekly) = self.parts(date, &mut row);
                ComponentPoint {
                    timestamp: date,
                    trend: trend * self.y_scale,
                    yearly: yearly.map(|v| v * self.y_scale),
                    weekly: weekly.map(|v| v * self.y_scale),
                }
            })
            .collect())
    }

    fn changepoints(&self, threshold: f64) -> Vec<Changepoint> {
        self.changepoint_dates
            .iter()
            .zip(self.deltas())
            .filter(|(_, d)| d.abs() >= threshold)
            .map(|(&timestamp, &rate_change)| Changepoint {
                timestamp,
                rate_change,
            })
            .collect()
    }
}

fn check_training(training: &[TrainingPoint]) -> Result<(), EngineError> {
    if training.len() < 2 {
        return Err(EngineError::TooFewObservations {
            available: training.len(),
            required: 2,
        });
    }
    for (i, p) in training.iter().enumerate() {
        if !p.value.is_finite() {
            return Err(EngineError::NonFiniteInput(p.timestamp));
        }
        if i > 0 && p.timestamp <= training[i - 1].timestamp {
            return Err(EngineError::Unordered(p.timestamp));
        }
    }
    Ok(())
}

/// Indices of potential changepoints, evenly spaced over the first
/// `range` share of the history, never at the first observation.
fn changepoint_indices(n: usize, requested: usize, range: f64) -> Vec<usize> {
    let hist_size = ((n as f64) * range).floor() as usize;
    let count = requested.min(hist_size.saturating_sub(1));
    if count == 0 {
        return Vec::new();
    }
    let step = (hist_size - 1) as f64 / count as f64;
    (1..=count)
        .map(|j| (j as f64 * step).round() as usize)
        .collect()
}

impl AdditiveEngine {
    fn seasonality_enabled(mode: SeasonalityMode, span_days: f64, min_span: f64) -> bool {
        match mode {
            SeasonalityMode::Auto => span_days >= min_span,
            SeasonalityMode::Enabled => true,
            SeasonalityMode::Disabled => false,
        }
    }

    fn solve_pass(
        &self,
        layout: &Layout,
        ts: &[f64],
        epoch_days: &[f64],
        ys: &[f64],
        noise_var: f64,
    ) -> Result<(Vec<f64>, f64), EngineError> {
        let mut ne = NormalEquations::new(layout.width());
        let mut row = Vec::with_capacity(layout.width());
        for i in 0..ys.len() {
            layout.row(ts[i], epoch_days[i], &mut row);
            ne.add_row(&row, ys[i]);
        }
        let beta = ne.solve(&layout.penalties(noise_var, &self.config))?;

        let mut sse = 0.0;
        for i in 0..ys.len() {
            layout.row(ts[i], epoch_days[i], &mut row);
            let r = ys[i] - dot(&row, &beta);
            sse += r * r;
        }
        Ok((beta, sse / ys.len() as f64))
    }
}

impl ForecastEngine for AdditiveEngine {
    type Fitted = FittedAdditive;

    fn name(&self) -> &str {
        "additive"
    }

    fn fit(&self, training: &[TrainingPoint]) -> Result<FittedAdditive, EngineError> {
        self.config.validate()?;
        check_training(training)?;
        let z = self.config.interval_z()?;

        let n = training.len();
        let first = training[0].timestamp;
        let span_days = (training[n - 1].timestamp - first).num_days() as f64;
        if span_days <= 0.0 {
            return Err(EngineError::ZeroSpan);
        }

        let max_abs = training.iter().map(|p| p.value.abs()).fold(0.0, f64::max);
        let y_scale = if max_abs > 0.0 { max_abs } else { 1.0 };

        // Flat history: an exact constant model, no changepoints or seasonality.
        let first_value = training[0].value;
        if training.iter().all(|p| p.value == first_value) {
            let layout = Layout {
                changepoints_t: Vec::new(),
                yearly_order: None,
                weekly_order: None,
            };
            tracing::debug!(n, "constant history; fitting flat model");
            return Ok(FittedAdditive {
                first,
                span_days,
                y_scale,
                layout,
                beta: vec![first_value / y_scale, 0.0],
                changepoint_dates: Vec::new(),
                sigma: 0.0,
                z,
                history_len: n,
            });
        }

        let ts: Vec<f64> = training
            .iter()
            .map(|p| (p.timestamp - first).num_days() as f64 / span_days)
            .collect();
        let epoch = epoch();
        let epoch_days: Vec<f64> = training
            .iter()
            .map(|p| (p.timestamp - epoch).num_days() as f64)
            .collect();
        let ys: Vec<f64> = training.iter().map(|p| p.value / y_scale).collect();

        let cp_idx = changepoint_indices(n, self.config.n_changepoints, self.config.changepoint_range);
        let layout = Layout {
            changepoints_t: cp_idx.iter().map(|&i| ts[i]).collect(),
            yearly_order: Self::seasonality_enabled(
                self.config.yearly_seasonality,
                span_days,
                2.0 * 365.0,
            )
            .then_some(self.config.yearly_order),
            weekly_order: Self::seasonality_enabled(
                self.config.weekly_seasonality,
                span_days,
                2.0 * WEEK_DAYS,
            )
            .then_some(self.config.weekly_order),
        };

        // First pass with a nominal noise level; second pass with the fitted one.
        let (_, first_var) = self.solve_pass(&layout, &ts, &epoch_days, &ys, INITIAL_NOISE_VAR)?;
        let noise_var = first_var.max(MIN_NOISE_VAR);
        let (beta, mse) = self.solve_pass(&layout, &ts, &epoch_days, &ys, noise_var)?;

        if beta.iter().any(|b| !b.is_finite()) {
            return Err(EngineError::Singular { pivot: 0 });
        }

        tracing::debug!(
            n,
            changepoints = layout.changepoints_t.len(),
            yearly = layout.yearly_order.is_some(),
            weekly = layout.weekly_order.is_some(),
            "additive model fitted"
        );

        Ok(FittedAdditive {
            first,
            span_days,
            y_scale,
            changepoint_dates: cp_idx.iter().map(|&i| training[i].timestamp).collect(),
            layout,
            beta,
            sigma: mse.sqrt(),
            z,
            history_len: n,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn daily(n: usize, f: impl Fn(usize) -> f64) -> Vec<TrainingPoint> {
        (0..n)
            .map(|i| TrainingPoint::new(d(2020, 1, 1) + chrono::Duration::days(i as i64), f(i)))
            .collect()
    }

    #[test]
    fn default_config_is_valid() {
        assert!(EngineConfig::default().validate().is_ok());
        let z = EngineConfig::default().interval_z().unwrap();
        assert!((z - 1.2816).abs() < 1e-3);
    }

    #[test]
    fn invalid_config_rejected() {
        let cfg = EngineConfig {
            interval_width: 1.0,
            ..EngineConfig::default()
        };
        assert!(AdditiveEngine::new(cfg).is_err());
        let cfg = EngineConfig {
            changepoint_prior_scale: 0.0,
            ..EngineConfig::default()
        };
        assert!(AdditiveEngine::new(cfg).is_err());
    }

    #[test]
    fn changepoint_indices_spread_over_range() {
        let idx = changepoint_indices(100, 25, 0.8);
        assert_eq!(idx.len(), 25);
        assert!(idx[0] >= 1);
        assert!(*idx.last().unwrap() <= 79);
        assert!(idx.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn changepoint_count_capped_by_history() {
        assert_eq!(changepoint_indices(5, 25, 0.8).len(), 3);
        assert!(changepoint_indices(2, 25, 0.8).is_empty());
    }

    #[test]
    fn linear_series_is_tracked() {
        let training = daily(200, |i| 50.0 + 0.5 * i as f64);
        let fitted = AdditiveEngine::default().fit(&training).unwrap();
        let grid = [d(2020, 1, 1), d(2020, 1, 1) + chrono::Duration::days(199)];
        let preds = fitted.predict(&grid).unwrap();
        assert!((preds[0].yhat - 50.0).abs() < 1.0, "{}", preds[0].yhat);
        assert!((preds[1].yhat - 149.5).abs() < 1.0, "{}", preds[1].yhat);
    }

    #[test]
    fn weekly_seasonality_auto_needs_two_weeks() {
        let short = daily(10, |i| (i % 3) as f64 + 1.0);
        let fitted = AdditiveEngine::default().fit(&short).unwrap();
        assert!(!fitted.has_weekly());
        assert!(!fitted.has_yearly());

        let long = daily(60, |i| (i % 7) as f64 + 10.0);
        let fitted = AdditiveEngine::default().fit(&long).unwrap();
        assert!(fitted.has_weekly());
        assert!(!fitted.has_yearly());
    }

    #[test]
    fn forced_seasonality_modes() {
        let cfg = EngineConfig {
            yearly_seasonality: SeasonalityMode::Enabled,
            weekly_seasonality: SeasonalityMode::Disabled,
            ..EngineConfig::default()
        };
        let fitted = AdditiveEngine::new(cfg)
            .unwrap()
            .fit(&daily(60, |i| i as f64 + 1.0))
            .unwrap();
        assert!(fitted.has_yearly());
        assert!(!fitted.has_weekly());
    }

    #[test]
    fn bounds_widen_past_history() {
        let training = daily(400, |i| 100.0 + (i as f64 * 0.3).sin() * 3.0 + i as f64 * 0.05);
        let fitted = AdditiveEngine::default().fit(&training).unwrap();
        let last = training.last().unwrap().timestamp;
        let grid = [
            last,
            last + chrono::Duration::days(30),
            last + chrono::Duration::days(365),
        ];
        let preds = fitted.predict(&grid).unwrap();
        let widths: Vec<f64> = preds.iter().map(|p| p.yhat_upper - p.yhat_lower).collect();
        assert!(widths[0] <= widths[1]);
        assert!(widths[1] <= widths[2]);
        for p in &preds {
            assert!(p.yhat_lower <= p.yhat && p.yhat <= p.yhat_upper);
        }
    }

    #[test]
    fn constant_series_is_flat() {
        let training = daily(30, |_| 42.0);
        let fitted = AdditiveEngine::default().fit(&training).unwrap();
        let grid = crate::forecast::forecast_grid(&training, 100);
        for p in fitted.predict(&grid).unwrap() {
            assert_eq!(p.yhat, 42.0);
            assert_eq!(p.yhat_lower, 42.0);
            assert_eq!(p.yhat_upper, 42.0);
        }
        assert!(fitted.changepoints(0.0).is_empty());
    }

    #[test]
    fn all_zero_series_fits() {
        let fitted = AdditiveEngine::default().fit(&daily(5, |_| 0.0)).unwrap();
        let p = fitted.predict(&[d(2020, 1, 10)]).unwrap();
        assert_eq!(p[0].yhat, 0.0);
    }

    #[test]
    fn components_sum_to_prediction() {
        let training = daily(120, |i| 20.0 + (i % 7) as f64 + i as f64 * 0.1);
        let fitted = AdditiveEngine::default().fit(&training).unwrap();
        let grid = crate::forecast::forecast_grid(&training, 30);
        let preds = fitted.predict(&grid).unwrap();
        let comps = fitted.components(&grid).unwrap();
        for (p, c) in preds.iter().zip(&comps) {
            let sum = c.trend + c.weekly.unwrap_or(0.0) + c.yearly.unwrap_or(0.0);
            assert!((p.yhat - sum).abs() < 1e-9);
        }
        assert!(comps[0].weekly.is_some());
        assert!(comps[0].yearly.is_none());
    }

    #[test]
    fn trend_break_produces_changepoint() {
        let training = daily(300, |i| {
            if i < 150 {
                10.0 + i as f64 * 0.1
            } else {
                25.0 - (i - 150) as f64 * 0.1
            }
        });
        let fitted = AdditiveEngine::default().fit(&training).unwrap();
        let significant = fitted.changepoints(0.01);
        assert!(!significant.is_empty());
        assert!(significant.len() <= fitted.changepoint_count());
        assert!(significant.iter().any(|c| c.rate_change < 0.0));
    }

    #[test]
    fn rejects_bad_training() {
        let engine = AdditiveEngine::default();
        assert!(matches!(
            engine.fit(&daily(1, |_| 1.0)),
            Err(EngineError::TooFewObservations { .. })
        ));
        let mut t = daily(5, |i| i as f64);
        t[2].value = f64::NAN;
        assert!(matches!(engine.fit(&t), Err(EngineError::NonFiniteInput(_))));
        let mut t = daily(5, |i| i as f64);
        t.swap(1, 2);
        assert!(matches!(engine.fit(&t), Err(EngineError::Unordered(_))));
    }

    #[test]
    fn empty_grid_is_error() {
        let fitted = AdditiveEngine::default().fit(&daily(10, |i| i as f64)).unwrap();
        assert_eq!(fitted.predict(&[]).unwrap_err(), EngineError::EmptyGrid);
    }
}
