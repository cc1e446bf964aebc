//! Data provider trait, fetch result frame and structured error types.
//!
//! The DataProvider trait abstracts over data sources (Yahoo Finance, CSV import,
//! synthetic) so the loader can swap implementations and tests can mock them.
//! Providers hand back a polars frame with a `date` column plus whatever value
//! columns the source has; the loader owns type coercion and filling.

use chrono::NaiveDate;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Name of the date column every provider frame carries.
pub const DATE_COLUMN: &str = "date";

/// Value columns the loader reads from a provider frame, in record order.
pub const VALUE_COLUMNS: [&str; 6] = ["open", "high", "low", "close", "adj_close", "volume"];

/// Structured error types for data operations.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("authentication required: {0}")]
    AuthenticationRequired(String),

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("hard stop: data provider has blocked requests (circuit breaker tripped)")]
    CircuitBreakerTripped,

    #[error("import error: {0}")]
    ImportError(String),

    #[error("frame error: {0}")]
    Frame(String),

    #[error("data error: {0}")]
    Other(String),
}

impl From<PolarsError> for DataError {
    fn from(err: PolarsError) -> Self {
        DataError::Frame(err.to_string())
    }
}

/// Result of a successful data fetch for a single symbol.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub symbol: String,
    pub frame: DataFrame,
    pub source: DataSource,
}

impl FetchResult {
    pub fn row_count(&self) -> usize {
        self.frame.height()
    }
}

/// Where the data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataSource {
    YahooFinance,
    CsvImport,
    Synthetic,
}

/// Trait for data providers (Yahoo Finance, CSV import, etc).
///
/// Implementations handle the specifics of fetching data from a particular source.
/// The session cache sits above this trait — providers don't know about it.
pub trait DataProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Fetch daily price rows for a symbol over an inclusive date range.
    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<FetchResult, DataError>;

    /// Check if the provider is currently available (not rate-limited, not blocked).
    fn is_available(&self) -> bool;
}

pub(crate) fn epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1970, 1, 1).expect("1970-01-01 is a valid date")
}

/// Build a polars `Date` column from calendar dates.
pub fn date_column(dates: &[NaiveDate]) -> Result<Column, DataError> {
    let epoch = epoch();
    let days: Vec<i32> = dates
        .iter()
        .map(|d| (*d - epoch).num_days() as i32)
        .collect();
    Ok(Column::new(DATE_COLUMN.into(), days).cast(&DataType::Date)?)
}

/// Assemble a provider frame from dates and value columns.
pub fn build_frame(dates: &[NaiveDate], values: Vec<Column>) -> Result<DataFrame, DataError> {
    let mut columns = Vec::with_capacity(values.len() + 1);
    columns.push(date_column(dates)?);
    columns.extend(values);
    Ok(DataFrame::new(columns)?)
}

/// Assemble a frame where every value column is already numeric.
pub fn numeric_frame(
    dates: &[NaiveDate],
    values: Vec<(&str, Vec<Option<f64>>)>,
) -> Result<DataFrame, DataError> {
    let columns = values
        .into_iter()
        .map(|(name, vals)| Column::new(name.into(), vals))
        .collect();
    build_frame(dates, columns)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn date_column_is_date_typed() {
        let col = date_column(&[d(2024, 1, 2), d(2024, 1, 3)]).unwrap();
        assert_eq!(col.dtype(), &DataType::Date);
        assert_eq!(col.len(), 2);
    }

    #[test]
    fn numeric_frame_has_date_plus_values() {
        let frame = numeric_frame(
            &[d(2024, 1, 2), d(2024, 1, 3)],
            vec![
                ("open", vec![Some(1.0), None]),
                ("close", vec![Some(2.0), Some(3.0)]),
            ],
        )
        .unwrap();
        assert_eq!(frame.height(), 2);
        assert_eq!(frame.width(), 3);
        assert!(frame.column(DATE_COLUMN).is_ok());
    }

    #[test]
    fn mismatched_lengths_are_frame_errors() {
        let err = numeric_frame(&[d(2024, 1, 2)], vec![("close", vec![Some(1.0), Some(2.0)])])
            .unwrap_err();
        assert!(matches!(err, DataError::Frame(_)));
    }
}
