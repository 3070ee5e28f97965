pub mod error;
pub mod provider;
pub mod types;

pub use error::FetchError;
pub use provider::{AlphaVantageClient, MarketDataProvider};
pub use types::RawTimeSeries;
