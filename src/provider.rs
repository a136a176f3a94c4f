//! Provider abstraction for fetching BTC/EUR prices from external APIs

use crate::{
    error::ProviderError,
    types::{CurrentPrice, PricePoint, Timeframe},
};
use async_trait::async_trait;

/// Common identity of an upstream data source
pub trait Provider: Send + Sync {
    /// Returns the name of this provider
    fn provider_name(&self) -> &'static str;
}

/// A provider able to quote the instantaneous price
#[async_trait]
pub trait CurrentPriceProvider: Provider {
    /// Fetches the current BTC/EUR quote
    ///
    /// # Returns
    /// The quote, or an error on any network fault, non-2xx response or
    /// response shape mismatch
    async fn fetch_current(&self) -> Result<CurrentPrice, ProviderError>;
}

/// A provider able to serve a price series
#[async_trait]
pub trait HistoricalPriceProvider: Provider {
    /// Fetches the series for `timeframe`
    ///
    /// Implementations map the timeframe onto their native span and
    /// granularity. The returned points are non-empty and sorted by
    /// timestamp.
    async fn fetch_historical(&self, timeframe: Timeframe)
        -> Result<Vec<PricePoint>, ProviderError>;
}
