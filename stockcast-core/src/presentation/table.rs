//! Tail and head tables for textual display.

use crate::domain::{ForecastPoint, PriceSeries};
use crate::forecast::metrics::HorizonMetrics;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_TAIL_ROWS: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableView {
    pub title: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

fn cell(v: Option<f64>, decimals: usize) -> String {
    match v {
        Some(x) => format!("{x:.decimals$}"),
        None => "NaN".to_string(),
    }
}

fn tail<T>(items: &[T], n: usize) -> &[T] {
    &items[items.len().saturating_sub(n)..]
}

impl TableView {
    fn new(title: impl Into<String>, columns: &[&str]) -> Self {
        Self {
            title: title.into(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Last `n` price records.
pub fn price_tail(series: &PriceSeries, n: usize) -> TableView {
    let mut table = TableView::new(
        format!("{} raw data", series.ticker),
        &["date", "open", "high", "low", "close", "adj_close", "volume"],
    );
    table.rows = series
        .tail(n)
        .iter()
        .map(|r| {
            vec![
                r.date.to_string(),
                cell(r.open, 4),
                cell(r.high, 4),
                cell(r.low, 4),
                cell(r.close, 4),
                cell(r.adj_close, 4),
                cell(r.volume, 0),
            ]
        })
        .collect();
    table
}

/// Last `n` forecast points.
pub fn forecast_tail(ticker: &str, points: &[ForecastPoint], n: usize) -> TableView {
    let mut table = TableView::new(
        format!("{ticker} forecast data"),
        &["date", "predicted", "lower_bound", "upper_bound"],
    );
    table.rows = tail(points, n)
        .iter()
        .map(|p| {
            vec![
                p.timestamp.to_string(),
                cell(p.predicted, 4),
                cell(p.lower_bound, 4),
                cell(p.upper_bound, 4),
            ]
        })
        .collect();
    table
}

/// First `n` rows of the horizon metrics.
pub fn metrics_head(ticker: &str, metrics: &[HorizonMetrics], n: usize) -> TableView {
    let mut table = TableView::new(
        format!("{ticker} cross-validation metrics"),
        &["horizon", "mse", "rmse", "mae", "mape", "mdape", "smape", "coverage"],
    );
    table.rows = metrics
        .iter()
        .take(n)
        .map(|m| {
            vec![
                format!("{} days", m.horizon_days),
                cell(Some(m.mse), 4),
                cell(Some(m.rmse), 4),
                cell(Some(m.mae), 4),
                cell(m.mape, 4),
                cell(m.mdape, 4),
                cell(Some(m.smape), 4),
                cell(Some(m.coverage), 2),
            ]
        })
        .collect();
    table
}

impl fmt::Display for TableView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut widths: Vec<usize> = self.columns.iter().map(|c| c.len()).collect();
        for row in &self.rows {
            for (w, c) in widths.iter_mut().zip(row) {
                *w = (*w).max(c.len());
            }
        }

        writeln!(f, "{}", self.title)?;
        let header: Vec<String> = self
            .columns
            .iter()
            .zip(&widths)
            .map(|(c, w)| format!("{c:>w$}"))
            .collect();
        writeln!(f, "{}", header.join("  "))?;
        let total = widths.iter().sum::<usize>() + 2 * widths.len().saturating_sub(1);
        writeln!(f, "{}", "-".repeat(total))?;
        for row in &self.rows {
            let line: Vec<String> = row
                .iter()
                .zip(&widths)
                .map(|(c, w)| format!("{c:>w$}"))
                .collect();
            writeln!(f, "{}", line.join("  "))?;
        }
        Ok(())
    }
}
