//! Provider frame normalization: type coercion, ordering and deduplication.
//!
//! Every value column is cast to Float64. Cells that fail the cast become null,
//! and NaN or infinite values are treated as missing. Rows come out sorted by
//! date with the first occurrence of a repeated date kept.

use super::fill::{FillPolicy, FillReport};
use super::provider::{epoch, DataError, DATE_COLUMN, VALUE_COLUMNS};
use crate::domain::PriceRecord;
use chrono::NaiveDate;
use polars::prelude::*;

/// Column-oriented view of a normalized frame, one vector per value column.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceColumns {
    pub dates: Vec<NaiveDate>,
    pub open: Vec<Option<f64>>,
    pub high: Vec<Option<f64>>,
    pub low: Vec<Option<f64>>,
    pub close: Vec<Option<f64>>,
    pub adj_close: Vec<Option<f64>>,
    pub volume: Vec<Option<f64>>,
}

/// Counters describing what normalization dropped or coerced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizeStats {
    pub null_dates: usize,
    pub duplicate_dates: usize,
    pub absent_columns: usize,
}

impl PriceColumns {
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    fn columns_mut(&mut self) -> [(&'static str, &mut Vec<Option<f64>>); 6] {
        [
            ("open", &mut self.open),
            ("high", &mut self.high),
            ("low", &mut self.low),
            ("close", &mut self.close),
            ("adj_close", &mut self.adj_close),
            ("volume", &mut self.volume),
        ]
    }

    /// Apply the fill policy to every column, returning a report per column name.
    pub fn fill(&mut self, policy: FillPolicy) -> Vec<(&'static str, FillReport)> {
        self.columns_mut()
            .into_iter()
            .map(|(name, values)| (name, policy.apply(values)))
            .collect()
    }

    pub fn into_records(self) -> Vec<PriceRecord> {
        (0..self.dates.len())
            .map(|i| PriceRecord {
                date: self.dates[i],
                open: self.open[i],
                high: self.high[i],
                low: self.low[i],
                close: self.close[i],
                adj_close: self.adj_close[i],
                volume: self.volume[i],
            })
            .collect()
    }
}

fn finite(v: Option<f64>) -> Option<f64> {
    v.filter(|x| x.is_finite())
}

/// Coerce a column to finite Float64 values. Uncastable cells become `None`.
fn coerce_column(column: &Column) -> Result<Vec<Option<f64>>, DataError> {
    let casted = column.cast(&DataType::Float64)?;
    let values = casted.f64()?;
    Ok(values.into_iter().map(finite).collect())
}

fn read_dates(frame: &DataFrame) -> Result<Vec<Option<NaiveDate>>, DataError> {
    let column = frame.column(DATE_COLUMN).map_err(|_| {
        DataError::ResponseFormatChanged(format!("frame has no '{DATE_COLUMN}' column"))
    })?;
    if column.dtype() != &DataType::Date {
        return Err(DataError::ResponseFormatChanged(format!(
            "'{DATE_COLUMN}' column has type {}, expected date",
            column.dtype()
        )));
    }
    let days = column.cast(&DataType::Int32)?;
    let epoch = epoch();
    Ok(days
        .i32()?
        .into_iter()
        .map(|d| d.map(|n| epoch + chrono::Duration::days(i64::from(n))))
        .collect())
}

/// Normalize a provider frame into sorted, deduplicated, numeric columns.
pub fn normalize_frame(frame: &DataFrame) -> Result<(PriceColumns, NormalizeStats), DataError> {
    let mut stats = NormalizeStats::default();
    let dates = read_dates(frame)?;
    let height = dates.len();

    let mut raw: Vec<Vec<Option<f64>>> = Vec::with_capacity(VALUE_COLUMNS.len());
    for name in VALUE_COLUMNS {
        match frame.column(name) {
            Ok(column) => raw.push(coerce_column(column)?),
            Err(_) => {
                stats.absent_columns += 1;
                raw.push(vec![None; height]);
            }
        }
    }

    // Stable sort keeps provider order among equal dates, so dedupe keeps the first.
    let mut order: Vec<(usize, NaiveDate)> = dates
        .iter()
        .enumerate()
        .filter_map(|(i, d)| d.map(|d| (i, d)))
        .collect();
    stats.null_dates = height - order.len();
    order.sort_by_key(|&(_, d)| d);

    let before = order.len();
    order.dedup_by_key(|&mut (_, d)| d);
    stats.duplicate_dates = before - order.len();

    let pick = |col: &[Option<f64>]| order.iter().map(|&(i, _)| col[i]).collect::<Vec<_>>();

    let columns = PriceColumns {
        dates: order.iter().map(|&(_, d)| d).collect(),
        open: pick(&raw[0]),
        high: pick(&raw[1]),
        low: pick(&raw[2]),
        close: pick(&raw[3]),
        adj_close: pick(&raw[4]),
        volume: pick(&raw[5]),
    };
    Ok((columns, stats))
}
