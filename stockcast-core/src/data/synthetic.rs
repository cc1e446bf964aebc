//! Synthetic price provider for offline runs and tests.
//!
//! Produces a deterministic random walk per symbol (seeded from a BLAKE3 hash of
//! the symbol), weekdays only. Series are tagged `DataSource::Synthetic` so
//! reports never pass them off as market data.

use super::provider::{numeric_frame, DataError, DataProvider, DataSource, FetchResult};
use chrono::{Datelike, NaiveDate, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[derive(Debug, Clone)]
pub struct SyntheticProvider {
    start_price: f64,
    missing_every: Option<usize>,
}

impl Default for SyntheticProvider {
    fn default() -> Self {
        Self {
            start_price: 100.0,
            missing_every: None,
        }
    }
}

impl SyntheticProvider {
    pub fn new(start_price: f64) -> Self {
        Self {
            start_price,
            ..Self::default()
        }
    }

    /// Blank out open and close on every `n`th row, to exercise gap filling.
    pub fn with_missing_every(mut self, n: usize) -> Self {
        self.missing_every = (n > 0).then_some(n);
        self
    }
}

impl DataProvider for SyntheticProvider {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<FetchResult, DataError> {
        let seed: [u8; 32] = *blake3::hash(symbol.as_bytes()).as_bytes();
        let mut rng = StdRng::from_seed(seed);

        let mut dates = Vec::new();
        let (mut open, mut high, mut low, mut close, mut adj, mut volume) =
            (Vec::new(), Vec::new(), Vec::new(), Vec::new(), Vec::new(), Vec::new());
        let mut price = self.start_price;
        let mut current = start;

        while current <= end {
            if matches!(current.weekday(), Weekday::Sat | Weekday::Sun) {
                current += chrono::Duration::days(1);
                continue;
            }

            let daily_return: f64 = rng.gen_range(-0.02..0.021);
            let o = price;
            let c = price * (1.0 + daily_return);
            let h = o.max(c) * (1.0 + rng.gen_range(0.0..0.01));
            let l = o.min(c) * (1.0 - rng.gen_range(0.0..0.01));
            let v = rng.gen_range(500_000..5_000_000u64) as f64;

            let blank = self
                .missing_every
                .is_some_and(|n| dates.len() % n == n - 1);

            dates.push(current);
            open.push((!blank).then_some(o));
            high.push(Some(h));
            low.push(Some(l));
            close.push((!blank).then_some(c));
            adj.push(Some(c));
            volume.push(Some(v));

            price = c;
            current += chrono::Duration::days(1);
        }

        let frame = numeric_frame(
            &dates,
            vec![
                ("open", open),
                ("high", high),
                ("low", low),
                ("close", close),
                ("adj_close", adj),
                ("volume", volume),
            ],
        )?;

        Ok(FetchResult {
            symbol: symbol.to_string(),
            frame,
            source: DataSource::Synthetic,
        })
    }

    fn is_available(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn weekdays_only() {
        // 2024-01-01 is a Monday; two full weeks
        let result = SyntheticProvider::default()
            .fetch("GM", d(2024, 1, 1), d(2024, 1, 14))
            .unwrap();
        assert_eq!(result.row_count(), 10);
        assert_eq!(result.source, DataSource::Synthetic);
    }

    #[test]
    fn deterministic_per_symbol() {
        let p = SyntheticProvider::default();
        let a = p.fetch("GM", d(2024, 1, 1), d(2024, 3, 1)).unwrap();
        let b = p.fetch("GM", d(2024, 1, 1), d(2024, 3, 1)).unwrap();
        let c = p.fetch("F", d(2024, 1, 1), d(2024, 3, 1)).unwrap();
        assert!(a.frame.equals_missing(&b.frame));
        assert!(!a.frame.equals_missing(&c.frame));
    }

    #[test]
    fn missing_every_blanks_open_and_close() {
        let result = SyntheticProvider::default()
            .with_missing_every(3)
            .fetch("UAL", d(2024, 1, 1), d(2024, 1, 31))
            .unwrap();
        let close = result.frame.column("close").unwrap().f64().unwrap();
        assert_eq!(close.null_count(), result.row_count() / 3);
        assert!(close.get(0).is_some());
        assert!(close.get(2).is_none());
    }

    #[test]
    fn empty_range_gives_empty_frame() {
        let result = SyntheticProvider::default()
            .fetch("CVS", d(2024, 1, 6), d(2024, 1, 7))
            .unwrap();
        assert_eq!(result.row_count(), 0);
    }
}
