use crate::error::PipelineError;
use serde::{Deserialize, Serialize};

pub const MIN_HORIZON_YEARS: u32 = 1;
pub const MAX_HORIZON_YEARS: u32 = 4;

/// Calendar days per horizon year. Leap days are not counted.
pub const DAYS_PER_YEAR: u32 = 365;

/// A user's forecast request: which ticker and how many years ahead.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ForecastRequest {
    pub ticker: String,
    pub horizon_years: u32,
}

impl ForecastRequest {
    /// Build a request, rejecting horizons outside 1..=4 years.
    ///
    /// The ticker is trimmed but not checked against the allowed set here; the
    /// data loader owns that check.
    pub fn new(ticker: impl Into<String>, horizon_years: u32) -> Result<Self, PipelineError> {
        let ticker = ticker.into().trim().to_string();
        if ticker.is_empty() {
            return Err(PipelineError::InvalidRequest("ticker is empty".into()));
        }
        if !(MIN_HORIZON_YEARS..=MAX_HORIZON_YEARS).contains(&horizon_years) {
            return Err(PipelineError::InvalidRequest(format!(
                "horizon must be between {MIN_HORIZON_YEARS} and {MAX_HORIZON_YEARS} years, got {horizon_years}"
            )));
        }
        Ok(Self {
            ticker,
            horizon_years,
        })
    }

    pub fn horizon_days(&self) -> u32 {
        self.horizon_years * DAYS_PER_YEAR
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn horizon_days_is_years_times_365() {
        for years in 1..=4 {
            let req = ForecastRequest::new("GM", years).unwrap();
            assert_eq!(req.horizon_days(), years * 365);
        }
    }

    #[test]
    fn rejects_out_of_range_horizon() {
        for years in [0, 5, 100] {
            let err = ForecastRequest::new("GM", years).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidRequest);
        }
    }

    #[test]
    fn rejects_blank_ticker() {
        let err = ForecastRequest::new("   ", 1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
    }

    #[test]
    fn trims_ticker() {
        let req = ForecastRequest::new(" dal ", 2).unwrap();
        assert_eq!(req.ticker, "dal");
    }
}
