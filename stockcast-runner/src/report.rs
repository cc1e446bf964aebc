//! The result of one dashboard request.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use stockcast_core::data::{CacheStats, DataSource};
use stockcast_core::domain::{Changepoint, ForecastPoint, MissingCounts};
use stockcast_core::forecast::{CrossValidationConfig, HorizonMetrics};
use stockcast_core::presentation::{ChartSpec, TableView};

/// Current schema version for persisted reports.
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportCharts {
    pub raw: ChartSpec,
    pub forecast: ChartSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub components: Option<ChartSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changepoints: Option<ChartSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cross_validation: Option<ChartSpec>,
}

impl ReportCharts {
    /// Charts in display order.
    pub fn iter(&self) -> impl Iterator<Item = &ChartSpec> {
        [
            Some(&self.raw),
            Some(&self.forecast),
            self.components.as_ref(),
            self.changepoints.as_ref(),
            self.cross_validation.as_ref(),
        ]
        .into_iter()
        .flatten()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossValidationReport {
    pub config: CrossValidationConfig,
    pub cutoffs: Vec<NaiveDate>,
    pub metrics: Vec<HorizonMetrics>,
    pub metrics_head: TableView,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardReport {
    pub schema_version: u32,
    pub ticker: String,
    pub horizon_years: u32,
    pub horizon_days: u32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub source: DataSource,
    pub provider: String,
    /// BLAKE3 of the filled price records the forecast was fitted on.
    pub dataset_hash: String,
    pub record_count: usize,
    pub training_points: usize,
    pub missing_after_fill: MissingCounts,
    pub raw_tail: TableView,
    pub forecast_tail: TableView,
    /// History followed by `horizon_days` future points.
    pub forecast: Vec<ForecastPoint>,
    pub changepoints: Vec<Changepoint>,
    pub charts: ReportCharts,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cross_validation: Option<CrossValidationReport>,
    pub cache: CacheStats,
}

impl DashboardReport {
    /// Forecast points past the last training date.
    pub fn future(&self) -> &[ForecastPoint] {
        &self.forecast[self.training_points.min(self.forecast.len())..]
    }

    /// Final predicted value, if the engine produced a finite one.
    pub fn final_prediction(&self) -> Option<&ForecastPoint> {
        self.forecast.last().filter(|p| p.predicted.is_some())
    }

    /// One-line summary for logs and the CLI.
    pub fn summary(&self) -> String {
        let end = match self.final_prediction() {
            Some(p) => format!(
                "{:.2} on {} [{}, {}]",
                p.predicted.unwrap_or(f64::NAN),
                p.timestamp,
                fmt_opt(p.lower_bound),
                fmt_opt(p.upper_bound)
            ),
            None => "no final prediction".to_string(),
        };
        format!(
            "{} {}y: {} records ({} usable) from {}, forecast {}",
            self.ticker,
            self.horizon_years,
            self.record_count,
            self.training_points,
            self.provider,
            end
        )
    }
}

fn fmt_opt(v: Option<f64>) -> String {
    v.map_or_else(|| "NaN".to_string(), |x| format!("{x:.2}"))
}
