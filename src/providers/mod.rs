//! BTC/EUR price provider implementations

pub mod bitfinex;
pub mod coingecko;
pub mod livecoinwatch;

pub use bitfinex::BitfinexProvider;
pub use coingecko::CoinGeckoProvider;
pub use livecoinwatch::LiveCoinWatchProvider;

use crate::{
    constants::{REQUEST_TIMEOUT_SECS, USER_AGENT},
    error::ProviderError,
};
use reqwest::{Client, Response};
use std::time::Duration;

/// Builds the HTTP client shared by every adapter
fn build_client() -> Result<Client, ProviderError> {
    Client::builder()
        .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .user_agent(USER_AGENT)
        .build()
        .map_err(ProviderError::NetworkError)
}

/// Checks the status line and returns the response body
async fn read_body(response: Response) -> Result<String, ProviderError> {
    let status = response.status();

    if status.as_u16() == 429 {
        return Err(ProviderError::RateLimitExceeded);
    }

    if !status.is_success() {
        return Err(ProviderError::ApiError {
            status: status.as_u16(),
            message: response.text().await.unwrap_or_default(),
        });
    }

    response.text().await.map_err(ProviderError::from_transport)
}

/// Rejects series that are empty or go back in time
fn validate_series(
    provider: &str,
    points: &[crate::types::PricePoint],
) -> Result<(), ProviderError> {
    if points.is_empty() {
        return Err(ProviderError::shape(format!(
            "{} returned an empty series",
            provider
        )));
    }
    if points.windows(2).any(|w| w[1].timestamp < w[0].timestamp) {
        return Err(ProviderError::shape(format!(
            "{} returned unsorted timestamps",
            provider
        )));
    }
    Ok(())
}
