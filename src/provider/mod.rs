use crate::models::{Bar, Timeframe};
use async_trait::async_trait;
use thiserror::Error;

pub mod alphavantage;

pub use alphavantage::AlphaVantageProvider;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Parse error: {0}")]
    ParseError(String),
}

/// Source of price bars for one instrument.
///
/// Implementations may return fewer bars than a full window but must return
/// them in chronological order.
#[async_trait]
pub trait DataProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn fetch_bars(&self, timeframe: Timeframe) -> Result<Vec<Bar>, ProviderError>;
}
