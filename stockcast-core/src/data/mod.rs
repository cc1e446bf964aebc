pub mod cache;
pub mod circuit_breaker;
pub mod csv_import;
pub mod fill;
pub mod loader;
pub mod normalize;
pub mod provider;
pub mod synthetic;
pub mod tickers;
pub mod yahoo;

pub use cache::{CacheKey, CacheStats, SessionCache};
pub use circuit_breaker::CircuitBreaker;
pub use csv_import::CsvProvider;
pub use fill::FillPolicy;
pub use loader::DataLoader;
pub use provider::{DataError, DataProvider, DataSource, FetchResult};
pub use synthetic::SyntheticProvider;
pub use tickers::AllowedTickers;
pub use yahoo::{YahooConfig, YahooProvider};
