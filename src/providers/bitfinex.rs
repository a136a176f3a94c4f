//! Bitfinex price provider implementation
//!
//! Fallback source for the current quote. The ticker endpoint returns a
//! fixed-position array:
//! `[BID, BID_SIZE, ASK, ASK_SIZE, DAILY_CHANGE, DAILY_CHANGE_RELATIVE, LAST_PRICE, ...]`

use super::{build_client, read_body};
use crate::{
    constants::{BITFINEX_API_URL, BITFINEX_TICKER_ENDPOINT},
    error::ProviderError,
    provider::{CurrentPriceProvider, Provider},
    types::CurrentPrice,
};
use async_trait::async_trait;
use reqwest::Client;

const DAILY_CHANGE_RELATIVE_INDEX: usize = 5;
const LAST_PRICE_INDEX: usize = 6;

/// Bitfinex price provider
pub struct BitfinexProvider {
    client: Client,
    base_url: String,
}

impl BitfinexProvider {
    /// Creates a new Bitfinex provider
    pub fn new() -> Result<Self, ProviderError> {
        Ok(Self {
            client: build_client()?,
            base_url: BITFINEX_API_URL.to_string(),
        })
    }

    /// Points the provider at a different API root
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

/// Parses a ticker body; `observed_at` is stamped by the caller
fn parse_ticker(body: &str, observed_at: i64) -> Result<CurrentPrice, ProviderError> {
    let ticker: Vec<f64> = serde_json::from_str(body).map_err(|e| {
        ProviderError::shape(format!(
            "Failed to parse Bitfinex ticker: {}. Response: {}",
            e, body
        ))
    })?;

    if ticker.len() <= LAST_PRICE_INDEX {
        return Err(ProviderError::shape(format!(
            "Bitfinex ticker has {} fields, expected at least {}",
            ticker.len(),
            LAST_PRICE_INDEX + 1
        )));
    }

    let price = ticker[LAST_PRICE_INDEX];
    if !price.is_finite() || price <= 0.0 {
        return Err(ProviderError::shape(format!(
            "Bitfinex returned a non-positive price: {}",
            price
        )));
    }

    Ok(CurrentPrice::new(
        price,
        Some(ticker[DAILY_CHANGE_RELATIVE_INDEX] * 100.0),
        observed_at,
        "bitfinex",
    ))
}

impl Provider for BitfinexProvider {
    fn provider_name(&self) -> &'static str {
        "bitfinex"
    }
}

#[async_trait]
impl CurrentPriceProvider for BitfinexProvider {
    async fn fetch_current(&self) -> Result<CurrentPrice, ProviderError> {
        let url = format!("{}{}", self.base_url, BITFINEX_TICKER_ENDPOINT);
        tracing::debug!(provider = self.provider_name(), url = %url, "Fetching from Bitfinex");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(ProviderError::from_transport)?;

        let body = read_body(response).await?;
        parse_ticker(&body, chrono::Utc::now().timestamp())
    }
}
