//! CoinGecko price provider implementation
//!
//! Primary source for both the current quote and historical series.

use super::{build_client, read_body, validate_series};
use crate::{
    constants::{
        COINGECKO_API_URL, COINGECKO_COIN_ID, COINGECKO_MARKET_CHART_ENDPOINT,
        COINGECKO_SIMPLE_PRICE_ENDPOINT, COINGECKO_VS_CURRENCY,
    },
    error::ProviderError,
    provider::{CurrentPriceProvider, HistoricalPriceProvider, Provider},
    types::{CurrentPrice, PricePoint, Timeframe},
};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;

/// CoinGecko API response for simple price queries
#[derive(Debug, Deserialize)]
struct SimplePriceResponse {
    #[serde(flatten)]
    prices: HashMap<String, SimplePriceData>,
}

#[derive(Debug, Deserialize)]
struct SimplePriceData {
    eur: f64,
    #[serde(default)]
    eur_24h_change: Option<f64>,
    last_updated_at: i64,
}

/// CoinGecko API response for market chart queries
#[derive(Debug, Deserialize)]
struct MarketChartResponse {
    prices: Vec<(f64, f64)>,
}

/// CoinGecko price provider
pub struct CoinGeckoProvider {
    client: Client,
    base_url: String,
}

impl CoinGeckoProvider {
    /// Creates a new CoinGecko provider
    pub fn new() -> Result<Self, ProviderError> {
        Ok(Self {
            client: build_client()?,
            base_url: COINGECKO_API_URL.to_string(),
        })
    }

    /// Points the provider at a different API root
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn simple_price_url(&self) -> String {
        format!(
            "{}{}?ids={}&vs_currencies={}&include_24hr_change=true&include_last_updated_at=true",
            self.base_url, COINGECKO_SIMPLE_PRICE_ENDPOINT, COINGECKO_COIN_ID, COINGECKO_VS_CURRENCY
        )
    }

    fn market_chart_url(&self, timeframe: Timeframe) -> String {
        let params = timeframe.params();
        format!(
            "{}{}?vs_currency={}&days={}&interval={}",
            self.base_url,
            COINGECKO_MARKET_CHART_ENDPOINT,
            COINGECKO_VS_CURRENCY,
            params.days,
            params.granularity.as_str()
        )
    }

    async fn get(&self, url: &str) -> Result<String, ProviderError> {
        tracing::debug!(provider = self.provider_name(), url, "Fetching from CoinGecko");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(ProviderError::from_transport)?;

        read_body(response).await
    }
}

/// Parses a `/simple/price` body into a quote
fn parse_simple_price(body: &str) -> Result<CurrentPrice, ProviderError> {
    let response: SimplePriceResponse = serde_json::from_str(body).map_err(|e| {
        ProviderError::shape(format!(
            "Failed to parse CoinGecko response: {}. Response: {}",
            e, body
        ))
    })?;

    let data = response
        .prices
        .get(COINGECKO_COIN_ID)
        .ok_or_else(|| ProviderError::shape("CoinGecko response has no bitcoin entry"))?;

    if !data.eur.is_finite() || data.eur <= 0.0 {
        return Err(ProviderError::shape(format!(
            "CoinGecko returned a non-positive price: {}",
            data.eur
        )));
    }

    Ok(CurrentPrice::new(
        data.eur,
        data.eur_24h_change,
        data.last_updated_at,
        "coingecko",
    ))
}

/// Parses a `/market_chart` body into price points
fn parse_market_chart(body: &str) -> Result<Vec<PricePoint>, ProviderError> {
    let response: MarketChartResponse = serde_json::from_str(body).map_err(|e| {
        ProviderError::shape(format!("Failed to parse CoinGecko market chart: {}", e))
    })?;

    let points: Vec<PricePoint> = response
        .prices
        .into_iter()
        .map(|(timestamp, price)| PricePoint::new(timestamp as i64, price))
        .collect();

    validate_series("coingecko", &points)?;
    Ok(points)
}

impl Provider for CoinGeckoProvider {
    fn provider_name(&self) -> &'static str {
        "coingecko"
    }
}

#[async_trait]
impl CurrentPriceProvider for CoinGeckoProvider {
    async fn fetch_current(&self) -> Result<CurrentPrice, ProviderError> {
        let body = self.get(&self.simple_price_url()).await?;
        let price = parse_simple_price(&body)?;

        tracing::debug!(price = price.price, "Fetched current price from CoinGecko");
        Ok(price)
    }
}

#[async_trait]
impl HistoricalPriceProvider for CoinGeckoProvider {
    async fn fetch_historical(
        &self,
        timeframe: Timeframe,
    ) -> Result<Vec<PricePoint>, ProviderError> {
        let body = self.get(&self.market_chart_url(timeframe)).await?;
        let points = parse_market_chart(&body)?;

        tracing::debug!(
            timeframe = %timeframe,
            count = points.len(),
            "Fetched historical prices from CoinGecko"
        );
        Ok(points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_price() {
        let body = r#"{"bitcoin":{"eur":61234.5,"eur_24h_change":-1.25,"last_updated_at":1718000000}}"#;
        let price = parse_simple_price(body).unwrap();

        assert_eq!(price.price, 61234.5);
        assert_eq!(price.change_24h, Some(-1.25));
        assert_eq!(price.observed_at, 1_718_000_000);
        assert_eq!(price.source, "coingecko");
    }

    #[test]
    fn test_parse_simple_price_without_change() {
        let body = r#"{"bitcoin":{"eur":61234.5,"last_updated_at":1718000000}}"#;
        let price = parse_simple_price(body).unwrap();
        assert_eq!(price.change_24h, None);
    }

    #[test]
    fn test_parse_simple_price_missing_asset() {
        let body = r#"{"ethereum":{"eur":3000.0,"last_updated_at":1718000000}}"#;
        assert!(matches!(
            parse_simple_price(body),
            Err(ProviderError::ShapeError(_))
        ));
    }

    #[test]
    fn test_parse_simple_price_missing_field() {
        let body = r#"{"bitcoin":{"eur_24h_change":2.0,"last_updated_at":1718000000}}"#;
        assert!(matches!(
            parse_simple_price(body),
            Err(ProviderError::ShapeError(_))
        ));
    }

    #[test]
    fn test_parse_simple_price_rejects_non_positive_price() {
        for body in [
            r#"{"bitcoin":{"eur":0.0,"last_updated_at":1718000000}}"#,
            r#"{"bitcoin":{"eur":-61234.5,"last_updated_at":1718000000}}"#,
        ] {
            assert!(
                matches!(parse_simple_price(body), Err(ProviderError::ShapeError(_))),
                "accepted {}",
                body
            );
        }
    }

    #[test]
    fn test_parse_market_chart() {
        let body = r#"{"prices":[[1717977600000,60000.0],[1718064000000,60500.5]],"market_caps":[]}"#;
        let points = parse_market_chart(body).unwrap();

        assert_eq!(
            points,
            vec![
                PricePoint::new(1_717_977_600_000, 60000.0),
                PricePoint::new(1_718_064_000_000, 60500.5),
            ]
        );
    }

    #[test]
    fn test_parse_market_chart_rejects_bad_shapes() {
        for body in [
            r#"{"total_volumes":[]}"#,
            r#"{"prices":"nope"}"#,
            r#"{"prices":[[1717977600000]]}"#,
            r#"{"prices":[]}"#,
            r#"{"prices":[[1718064000000,1.0],[1717977600000,2.0]]}"#,
        ] {
            assert!(
                matches!(parse_market_chart(body), Err(ProviderError::ShapeError(_))),
                "accepted {}",
                body
            );
        }
    }

    #[test]
    fn test_market_chart_url_uses_timeframe_lookup() {
        let provider = CoinGeckoProvider::new()
            .unwrap()
            .with_base_url("http://localhost:9000");

        assert_eq!(
            provider.market_chart_url(Timeframe::OneYear),
            "http://localhost:9000/coins/bitcoin/market_chart?vs_currency=eur&days=365&interval=weekly"
        );
        assert_eq!(
            provider.simple_price_url(),
            "http://localhost:9000/simple/price?ids=bitcoin&vs_currencies=eur&include_24hr_change=true&include_last_updated_at=true"
        );
    }
}
