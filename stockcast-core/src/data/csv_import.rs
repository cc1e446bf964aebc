//! CSV import provider.
//!
//! Reads `<dir>/<SYMBOL>.csv` files in the layout Yahoo's download button
//! produces (`Date,Open,High,Low,Close,Adj Close,Volume`). Cells stay text in the
//! returned frame so the loader's coercion handles `null`, `N/A` and friends.

use super::provider::{
    build_frame, DataError, DataProvider, DataSource, FetchResult, VALUE_COLUMNS,
};
use chrono::NaiveDate;
use polars::prelude::Column;
use std::path::PathBuf;

pub struct CsvProvider {
    dir: PathBuf,
}

impl CsvProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, symbol: &str) -> PathBuf {
        self.dir.join(format!("{symbol}.csv"))
    }
}

/// "Adj Close" -> "adj_close"
fn normalize_header(h: &str) -> String {
    h.trim()
        .to_ascii_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
}

impl DataProvider for CsvProvider {
    fn name(&self) -> &str {
        "csv_import"
    }

    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<FetchResult, DataError> {
        let path = self.path_for(symbol);
        if !path.exists() {
            return Err(DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            });
        }

        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_path(&path)
            .map_err(|e| DataError::ImportError(format!("{}: {e}", path.display())))?;

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| DataError::ImportError(format!("{}: {e}", path.display())))?
            .iter()
            .map(normalize_header)
            .collect();

        let date_idx = headers.iter().position(|h| h == "date").ok_or_else(|| {
            DataError::ImportError(format!("{}: no Date column", path.display()))
        })?;
        let value_idx: Vec<(&str, Option<usize>)> = VALUE_COLUMNS
            .iter()
            .map(|name| (*name, headers.iter().position(|h| h == name)))
            .collect();

        let mut dates = Vec::new();
        let mut cells: Vec<Vec<Option<String>>> = vec![Vec::new(); value_idx.len()];
        let mut bad_dates = 0usize;

        for record in reader.records() {
            let record =
                record.map_err(|e| DataError::ImportError(format!("{}: {e}", path.display())))?;
            let raw_date = record.get(date_idx).unwrap_or_default();
            let Ok(date) = NaiveDate::parse_from_str(raw_date, "%Y-%m-%d") else {
                bad_dates += 1;
                continue;
            };
            if date < start || date > end {
                continue;
            }
            dates.push(date);
            for (slot, (_, idx)) in cells.iter_mut().zip(&value_idx) {
                let cell = idx
                    .and_then(|i| record.get(i))
                    .filter(|s| !s.is_empty())
                    .map(str::to_string);
                slot.push(cell);
            }
        }

        if bad_dates > 0 {
            tracing::warn!(symbol, bad_dates, "skipped CSV rows with unparseable dates");
        }

        let columns = value_idx
            .iter()
            .zip(cells)
            .filter(|((_, idx), _)| idx.is_some())
            .map(|((name, _), vals)| Column::new((*name).into(), vals))
            .collect();
        let frame = build_frame(&dates, columns)?;

        Ok(FetchResult {
            symbol: symbol.to_string(),
            frame,
            source: DataSource::CsvImport,
        })
    }

    fn is_available(&self) -> bool {
        self.dir.is_dir()
    }
}
