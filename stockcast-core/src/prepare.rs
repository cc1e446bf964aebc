//! Series preparer: project a cleaned price series onto the modelling series.

use crate::domain::{PriceSeries, TrainingPoint};

/// One training point per record with a finite close, in date order.
///
/// Records without a usable close are skipped, never interpolated. The input
/// series is left untouched.
pub fn prepare(series: &PriceSeries) -> Vec<TrainingPoint> {
    let training: Vec<TrainingPoint> = series
        .records()
        .iter()
        .filter_map(|r| {
            r.close
                .filter(|c| c.is_finite())
                .map(|c| TrainingPoint::new(r.date, c))
        })
        .collect();

    let dropped = series.len() - training.len();
    if dropped > 0 {
        tracing::debug!(
            ticker = %series.ticker,
            dropped,
            kept = training.len(),
            "dropped records without a usable close"
        );
    }
    training
}
