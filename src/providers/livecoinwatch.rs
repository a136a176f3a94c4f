//! LiveCoinWatch price provider implementation
//!
//! Fallback source for historical series. The history endpoint picks its own
//! sampling density for the requested window, so the adapter resamples the
//! result onto the timeframe's granularity.

use super::{build_client, read_body, validate_series};
use crate::{
    constants::{
        LIVECOINWATCH_API_URL, LIVECOINWATCH_COIN_CODE, LIVECOINWATCH_CURRENCY,
        LIVECOINWATCH_HISTORY_ENDPOINT, MS_PER_DAY,
    },
    error::ProviderError,
    provider::{HistoricalPriceProvider, Provider},
    types::{Granularity, PricePoint, Timeframe},
};
use async_trait::async_trait;
use chrono::{DateTime, Datelike};
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// LiveCoinWatch history request body
#[derive(Debug, Serialize)]
struct HistoryRequest<'a> {
    currency: &'a str,
    code: &'a str,
    start: i64,
    end: i64,
    meta: bool,
}

/// LiveCoinWatch history response
#[derive(Debug, Deserialize)]
struct HistoryResponse {
    history: Vec<HistoryEntry>,
}

#[derive(Debug, Deserialize)]
struct HistoryEntry {
    date: i64,
    rate: f64,
}

/// LiveCoinWatch price provider
pub struct LiveCoinWatchProvider {
    client: Client,
    base_url: String,
    api_key: String,
}

impl LiveCoinWatchProvider {
    /// Creates a new LiveCoinWatch provider
    pub fn new(api_key: impl Into<String>) -> Result<Self, ProviderError> {
        Ok(Self {
            client: build_client()?,
            base_url: LIVECOINWATCH_API_URL.to_string(),
            api_key: api_key.into(),
        })
    }

    /// Points the provider at a different API root
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

/// Parses a history body into sorted price points
fn parse_history(body: &str) -> Result<Vec<PricePoint>, ProviderError> {
    let response: HistoryResponse = serde_json::from_str(body).map_err(|e| {
        ProviderError::shape(format!("Failed to parse LiveCoinWatch history: {}", e))
    })?;

    let points: Vec<PricePoint> = response
        .history
        .into_iter()
        .map(|entry| PricePoint::new(entry.date, entry.rate))
        .collect();

    validate_series("livecoinwatch", &points)?;
    Ok(points)
}

/// Bucket key of a timestamp for the given granularity
fn bucket(timestamp: i64, granularity: Granularity) -> i64 {
    match granularity {
        Granularity::Daily => timestamp.div_euclid(MS_PER_DAY),
        Granularity::Weekly => timestamp.div_euclid(7 * MS_PER_DAY),
        Granularity::Monthly => match DateTime::from_timestamp_millis(timestamp) {
            Some(at) => i64::from(at.year()) * 12 + i64::from(at.month0()),
            None => timestamp.div_euclid(MS_PER_DAY),
        },
    }
}

/// Keeps the latest point of each granularity bucket
fn resample(points: Vec<PricePoint>, granularity: Granularity) -> Vec<PricePoint> {
    let mut sampled: Vec<PricePoint> = Vec::with_capacity(points.len());
    let mut current_bucket = None;

    for point in points {
        let key = bucket(point.timestamp, granularity);
        match sampled.last_mut() {
            Some(last) if current_bucket == Some(key) => *last = point,
            _ => {
                sampled.push(point);
                current_bucket = Some(key);
            }
        }
    }

    sampled
}

impl Provider for LiveCoinWatchProvider {
    fn provider_name(&self) -> &'static str {
        "livecoinwatch"
    }
}

#[async_trait]
impl HistoricalPriceProvider for LiveCoinWatchProvider {
    async fn fetch_historical(
        &self,
        timeframe: Timeframe,
    ) -> Result<Vec<PricePoint>, ProviderError> {
        let params = timeframe.params();
        let end = chrono::Utc::now().timestamp_millis();
        let start = end - i64::from(params.days) * MS_PER_DAY;

        let url = format!("{}{}", self.base_url, LIVECOINWATCH_HISTORY_ENDPOINT);
        tracing::debug!(
            provider = self.provider_name(),
            timeframe = %timeframe,
            "Fetching history from LiveCoinWatch"
        );

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .json(&HistoryRequest {
                currency: LIVECOINWATCH_CURRENCY,
                code: LIVECOINWATCH_COIN_CODE,
                start,
                end,
                meta: false,
            })
            .send()
            .await
            .map_err(ProviderError::from_transport)?;

        let body = read_body(response).await?;
        let points = resample(parse_history(&body)?, params.granularity);

        tracing::debug!(
            timeframe = %timeframe,
            count = points.len(),
            "Fetched historical prices from LiveCoinWatch"
        );
        Ok(points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 2024-01-01T00:00:00Z
    const JAN_1_2024: i64 = 1_704_067_200_000;
    const HOUR: i64 = 3_600_000;

    #[test]
    fn test_parse_history() {
        let body = r#"{"history":[{"date":1704067200000,"rate":38500.25,"volume":1,"cap":2},{"date":1704153600000,"rate":39000.0,"volume":1,"cap":2}]}"#;
        let points = parse_history(body).unwrap();

        assert_eq!(
            points,
            vec![
                PricePoint::new(JAN_1_2024, 38500.25),
                PricePoint::new(JAN_1_2024 + MS_PER_DAY, 39000.0),
            ]
        );
    }

    #[test]
    fn test_parse_history_rejects_bad_shapes() {
        for body in [
            r#"{"error":{"code":401,"status":"Unauthorized"}}"#,
            r#"{"history":[]}"#,
            r#"{"history":[{"date":1704067200000,"rate":null}]}"#,
        ] {
            assert!(
                matches!(parse_history(body), Err(ProviderError::ShapeError(_))),
                "accepted {}",
                body
            );
        }
    }

    #[test]
    fn test_resample_daily_keeps_latest_per_day() {
        let points = vec![
            PricePoint::new(JAN_1_2024, 1.0),
            PricePoint::new(JAN_1_2024 + 6 * HOUR, 2.0),
            PricePoint::new(JAN_1_2024 + 23 * HOUR, 3.0),
            PricePoint::new(JAN_1_2024 + MS_PER_DAY, 4.0),
            PricePoint::new(JAN_1_2024 + MS_PER_DAY + HOUR, 5.0),
        ];

        let sampled = resample(points, Granularity::Daily);
        assert_eq!(
            sampled,
            vec![
                PricePoint::new(JAN_1_2024 + 23 * HOUR, 3.0),
                PricePoint::new(JAN_1_2024 + MS_PER_DAY + HOUR, 5.0),
            ]
        );
    }

    #[test]
    fn test_resample_weekly_reduces_a_year_of_daily_points() {
        let points: Vec<PricePoint> = (0..365)
            .map(|day| PricePoint::new(JAN_1_2024 + day * MS_PER_DAY, day as f64))
            .collect();

        let sampled = resample(points, Granularity::Weekly);
        assert!((52..=54).contains(&sampled.len()), "got {}", sampled.len());
        assert_eq!(sampled.last().map(|p| p.price), Some(364.0));
    }

    #[test]
    fn test_resample_monthly_uses_calendar_months() {
        let points: Vec<PricePoint> = (0..366)
            .map(|day| PricePoint::new(JAN_1_2024 + day * MS_PER_DAY, day as f64))
            .collect();

        let sampled = resample(points, Granularity::Monthly);
        assert_eq!(sampled.len(), 12);
        // 2024-01-31 is day 30
        assert_eq!(sampled[0].price, 30.0);
    }
}
