//! Allowed ticker set.
//!
//! Requests may only name tickers from this set. Matching ignores case and
//! surrounding whitespace; the canonical form is upper case.

use serde::{Deserialize, Serialize};

/// Tickers offered by the dashboard out of the box.
pub const DEFAULT_TICKERS: [&str; 5] = ["CVS", "GM", "UAL", "F", "DAL"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowedTickers {
    tickers: Vec<String>,
}

impl Default for AllowedTickers {
    fn default() -> Self {
        Self::new(DEFAULT_TICKERS)
    }
}

impl AllowedTickers {
    /// Build from any list of symbols. Symbols are upper-cased, blanks and
    /// repeats dropped, order kept.
    pub fn new<I, S>(tickers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut out: Vec<String> = Vec::new();
        for t in tickers {
            let t = t.as_ref().trim().to_ascii_uppercase();
            if !t.is_empty() && !out.contains(&t) {
                out.push(t);
            }
        }
        Self { tickers: out }
    }

    /// Canonical form of `ticker` if it is allowed.
    pub fn canonicalize(&self, ticker: &str) -> Option<&str> {
        let wanted = ticker.trim();
        self.tickers
            .iter()
            .find(|t| t.eq_ignore_ascii_case(wanted))
            .map(String::as_str)
    }

    pub fn contains(&self, ticker: &str) -> bool {
        self.canonicalize(ticker).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tickers.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tickers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tickers.is_empty()
    }
}
