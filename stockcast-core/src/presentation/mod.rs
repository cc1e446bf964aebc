//! Presentation adapter: chart specifications and tail tables.
//!
//! Everything here is a pure function of pipeline output. Chart specs are plain
//! serializable values; rendering is left to whoever consumes them.

pub mod chart;
pub mod table;

pub use chart::{
    changepoint_chart, components_chart, cv_metric_chart, forecast_chart, raw_price_chart,
    AxisValues, ChartSpec, ToChartSeries, Trace, TraceMode,
};
pub use table::{forecast_tail, metrics_head, price_tail, TableView, DEFAULT_TAIL_ROWS};
