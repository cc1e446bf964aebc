//! Forecast output types: predictions with uncertainty, decomposed components,
//! and detected trend changepoints.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Model prediction for one date of the forecast grid.
///
/// A field is `None` when the engine produced a non-finite value for it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub timestamp: NaiveDate,
    pub predicted: Option<f64>,
    pub lower_bound: Option<f64>,
    pub upper_bound: Option<f64>,
}

impl ForecastPoint {
    /// Width of the uncertainty interval, if both bounds are present.
    pub fn interval_width(&self) -> Option<f64> {
        match (self.lower_bound, self.upper_bound) {
            (Some(lo), Some(hi)) => Some(hi - lo),
            _ => None,
        }
    }
}

/// Additive decomposition of a prediction into trend and seasonal terms.
///
/// Seasonal fields are `None` when that seasonality was not part of the model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComponentPoint {
    pub timestamp: NaiveDate,
    pub trend: f64,
    pub weekly: Option<f64>,
    pub yearly: Option<f64>,
}

/// A trend changepoint whose rate adjustment passed the significance threshold.
///
/// `rate_change` is the change in trend slope expressed in scaled units (value
/// scale divided by the history span).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Changepoint {
    pub timestamp: NaiveDate,
    pub rate_change: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_width_needs_both_bounds() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let mut p = ForecastPoint {
            timestamp: date,
            predicted: Some(10.0),
            lower_bound: Some(8.0),
            upper_bound: Some(13.0),
        };
        assert_eq!(p.interval_width(), Some(5.0));
        p.lower_bound = None;
        assert_eq!(p.interval_width(), None);
    }
}
