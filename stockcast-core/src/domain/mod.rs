//! Domain types shared by every pipeline stage.

pub mod forecast;
pub mod price;
pub mod request;
pub mod training;

pub use forecast::{Changepoint, ComponentPoint, ForecastPoint};
pub use price::{MissingCounts, PriceRecord, PriceSeries};
pub use request::{ForecastRequest, DAYS_PER_YEAR, MAX_HORIZON_YEARS, MIN_HORIZON_YEARS};
pub use training::TrainingPoint;
