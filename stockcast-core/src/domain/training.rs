use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One observation of the modelling series: a date and the closing price.
///
/// Training series built by the preparer have finite values and strictly
/// increasing timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrainingPoint {
    pub timestamp: NaiveDate,
    pub value: f64,
}

impl TrainingPoint {
    pub fn new(timestamp: NaiveDate, value: f64) -> Self {
        Self { timestamp, value }
    }
}
