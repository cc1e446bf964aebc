//! Chart specifications built from price, forecast and diagnostic data.

use crate::domain::{Changepoint, ComponentPoint, ForecastPoint, PriceSeries, TrainingPoint};
use crate::forecast::cross_validation::CvRow;
use crate::forecast::metrics::{absolute_percentage_errors, HorizonMetrics};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AxisValues {
    Dates(Vec<NaiveDate>),
    Days(Vec<i64>),
}

impl AxisValues {
    pub fn len(&self) -> usize {
        match self {
            AxisValues::Dates(v) => v.len(),
            AxisValues::Days(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceMode {
    Lines,
    Markers,
}

/// One named series on a chart. `y` holds `None` where a value is missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    pub name: String,
    pub x: AxisValues,
    pub y: Vec<Option<f64>>,
    pub mode: TraceMode,
    /// Shade the area between this trace and the named one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill_to: Option<String>,
    /// Index into [`ChartSpec::panels`].
    #[serde(default)]
    pub panel: usize,
}

impl Trace {
    fn dated(name: &str, x: Vec<NaiveDate>, y: Vec<Option<f64>>, mode: TraceMode) -> Self {
        Self {
            name: name.to_string(),
            x: AxisValues::Dates(x),
            y,
            mode,
            fill_to: None,
            panel: 0,
        }
    }

    fn in_panel(mut self, panel: usize) -> Self {
        self.panel = panel;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSpec {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub panels: Vec<String>,
    pub traces: Vec<Trace>,
    pub range_slider: bool,
    /// Dates drawn as vertical marker lines.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub markers: Vec<NaiveDate>,
}

impl ChartSpec {
    fn new(title: impl Into<String>, x_label: &str, y_label: &str) -> Self {
        Self {
            title: title.into(),
            x_label: x_label.to_string(),
            y_label: y_label.to_string(),
            panels: vec![String::new()],
            traces: Vec::new(),
            range_slider: false,
            markers: Vec::new(),
        }
    }

    pub fn trace(&self, name: &str) -> Option<&Trace> {
        self.traces.iter().find(|t| t.name == name)
    }
}

/// Conversion of pipeline data into named chart traces.
pub trait ToChartSeries {
    fn to_chart_series(&self) -> Vec<Trace>;
}

impl ToChartSeries for PriceSeries {
    fn to_chart_series(&self) -> Vec<Trace> {
        let dates: Vec<NaiveDate> = self.records().iter().map(|r| r.date).collect();
        vec![
            Trace::dated(
                "stock_open",
                dates.clone(),
                self.records().iter().map(|r| r.open).collect(),
                TraceMode::Lines,
            ),
            Trace::dated(
                "stock_close",
                dates,
                self.records().iter().map(|r| r.close).collect(),
                TraceMode::Lines,
            ),
        ]
    }
}

impl ToChartSeries for [ForecastPoint] {
    fn to_chart_series(&self) -> Vec<Trace> {
        let dates: Vec<NaiveDate> = self.iter().map(|p| p.timestamp).collect();
        let mut upper = Trace::dated(
            "upper_bound",
            dates.clone(),
            self.iter().map(|p| p.upper_bound).collect(),
            TraceMode::Lines,
        );
        upper.fill_to = Some("lower_bound".into());
        vec![
            Trace::dated(
                "predicted",
                dates.clone(),
                self.iter().map(|p| p.predicted).collect(),
                TraceMode::Lines,
            ),
            Trace::dated(
                "lower_bound",
                dates,
                self.iter().map(|p| p.lower_bound).collect(),
                TraceMode::Lines,
            ),
            upper,
        ]
    }
}

impl ToChartSeries for [TrainingPoint] {
    fn to_chart_series(&self) -> Vec<Trace> {
        vec![Trace::dated(
            "actual",
            self.iter().map(|p| p.timestamp).collect(),
            self.iter().map(|p| Some(p.value)).collect(),
            TraceMode::Markers,
        )]
    }
}

impl ToChartSeries for [ComponentPoint] {
    fn to_chart_series(&self) -> Vec<Trace> {
        let dates: Vec<NaiveDate> = self.iter().map(|c| c.timestamp).collect();
        let mut traces = vec![Trace::dated(
            "trend",
            dates.clone(),
            self.iter().map(|c| Some(c.trend)).collect(),
            TraceMode::Lines,
        )];
        if self.iter().any(|c| c.weekly.is_some()) {
            traces.push(Trace::dated(
                "weekly",
                dates.clone(),
                self.iter().map(|c| c.weekly).collect(),
                TraceMode::Lines,
            ));
        }
        if self.iter().any(|c| c.yearly.is_some()) {
            traces.push(Trace::dated(
                "yearly",
                dates,
                self.iter().map(|c| c.yearly).collect(),
                TraceMode::Lines,
            ));
        }
        traces
    }
}

/// Open and close prices over time, with a range slider.
pub fn raw_price_chart(series: &PriceSeries) -> ChartSpec {
    let mut spec = ChartSpec::new(
        format!("{}: time series data with range slider", series.ticker),
        "date",
        "price",
    );
    spec.traces = series.to_chart_series();
    spec.range_slider = true;
    spec
}

/// Observed points with the predicted line and its shaded uncertainty band.
pub fn forecast_chart(ticker: &str, training: &[TrainingPoint], points: &[ForecastPoint]) -> ChartSpec {
    let mut spec = ChartSpec::new(format!("{ticker}: forecast"), "date", "price");
    spec.traces = training.to_chart_series();
    spec.traces.extend(points.to_chart_series());
    spec.range_slider = true;
    spec
}

/// One panel per component: trend, then weekly and yearly when modelled.
pub fn components_chart(ticker: &str, components: &[ComponentPoint]) -> ChartSpec {
    let mut spec = ChartSpec::new(format!("{ticker}: forecast components"), "date", "effect");
    let traces = components.to_chart_series();
    spec.panels = traces.iter().map(|t| t.name.clone()).collect();
    spec.traces = traces
        .into_iter()
        .enumerate()
        .map(|(i, t)| t.in_panel(i))
        .collect();
    spec
}

/// Forecast with the significant trend changepoints marked.
pub fn changepoint_chart(
    ticker: &str,
    training: &[TrainingPoint],
    points: &[ForecastPoint],
    changepoints: &[Changepoint],
) -> ChartSpec {
    let mut spec = ChartSpec::new(format!("{ticker}: trend changepoints"), "date", "price");
    spec.traces = training.to_chart_series();
    spec.traces.extend(
        points
            .to_chart_series()
            .into_iter()
            .filter(|t| t.name == "predicted"),
    );
    spec.markers = changepoints.iter().map(|c| c.timestamp).collect();
    spec
}

/// Absolute percentage error per cross-validation row with the rolling MAPE.
pub fn cv_metric_chart(ticker: &str, rows: &[CvRow], metrics: &[HorizonMetrics]) -> ChartSpec {
    let mut spec = ChartSpec::new(
        format!("{ticker}: cross-validation MAPE"),
        "horizon (days)",
        "mape",
    );
    let (days, apes): (Vec<i64>, Vec<Option<f64>>) =
        absolute_percentage_errors(rows).into_iter().unzip();
    spec.traces.push(Trace {
        name: "ape".into(),
        x: AxisValues::Days(days),
        y: apes,
        mode: TraceMode::Markers,
        fill_to: None,
        panel: 0,
    });
    spec.traces.push(Trace {
        name: "mape".into(),
        x: AxisValues::Days(metrics.iter().map(|m| m.horizon_days).collect()),
        y: metrics.iter().map(|m| m.mape).collect(),
        mode: TraceMode::Lines,
        fill_to: None,
        panel: 0,
    });
    spec
}
