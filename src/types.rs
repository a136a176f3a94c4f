//! Types for the Bitcoin/EUR price SDK

use crate::error::PriceError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// A single sample of a historical series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,

    /// Price in EUR
    pub price: f64,
}

impl PricePoint {
    pub fn new(timestamp: i64, price: f64) -> Self {
        Self { timestamp, price }
    }
}

/// A point-in-time BTC/EUR quote
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentPrice {
    /// Price in EUR
    pub price: f64,

    /// 24h price change percentage, as reported by the provider
    pub change_24h: Option<f64>,

    /// Seconds since the Unix epoch at which the quote was observed
    pub observed_at: i64,

    /// Data source
    pub source: String,
}

impl CurrentPrice {
    /// Create a new quote
    pub fn new(price: f64, change_24h: Option<f64>, observed_at: i64, source: &str) -> Self {
        Self {
            price,
            change_24h,
            observed_at,
            source: source.to_string(),
        }
    }

    /// Get the age of the quote
    pub fn age(&self) -> std::time::Duration {
        let age_secs = Utc::now().timestamp() - self.observed_at;
        std::time::Duration::from_secs(age_secs.max(0) as u64)
    }

    /// Check if the quote is older than `threshold_seconds`
    pub fn is_stale(&self, threshold_seconds: u64) -> bool {
        self.age().as_secs() > threshold_seconds
    }
}

/// Sampling granularity of a historical series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Daily,
    Weekly,
    Monthly,
}

impl Granularity {
    /// Query-string form used by upstream APIs
    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::Daily => "daily",
            Granularity::Weekly => "weekly",
            Granularity::Monthly => "monthly",
        }
    }
}

/// Span and sampling granularity requested for a timeframe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeframeParams {
    pub days: u32,
    pub granularity: Granularity,
}

/// Chart timeframes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "7d")]
    SevenDays,
    #[default]
    #[serde(rename = "60d")]
    SixtyDays,
    #[serde(rename = "1y")]
    OneYear,
    #[serde(rename = "5y")]
    FiveYears,
}

impl Timeframe {
    /// Get all supported timeframes
    pub fn all() -> &'static [Timeframe] {
        &[
            Timeframe::SevenDays,
            Timeframe::SixtyDays,
            Timeframe::OneYear,
            Timeframe::FiveYears,
        ]
    }

    /// Short label (`7d`, `60d`, `1y`, `5y`)
    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::SevenDays => "7d",
            Timeframe::SixtyDays => "60d",
            Timeframe::OneYear => "1y",
            Timeframe::FiveYears => "5y",
        }
    }

    /// Fixed lookup of span in days and sampling granularity
    pub fn params(&self) -> TimeframeParams {
        let (days, granularity) = match self {
            Timeframe::SevenDays => (7, Granularity::Daily),
            Timeframe::SixtyDays => (60, Granularity::Daily),
            Timeframe::OneYear => (365, Granularity::Weekly),
            Timeframe::FiveYears => (1825, Granularity::Monthly),
        };
        TimeframeParams { days, granularity }
    }

    /// Parses a label, mapping anything unrecognised to the default (`60d`)
    pub fn parse_lenient(label: &str) -> Self {
        label.parse().unwrap_or_else(|_| {
            tracing::warn!(label, "Unknown timeframe, using default 60d");
            Timeframe::default()
        })
    }
}

impl FromStr for Timeframe {
    type Err = PriceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "7d" => Ok(Timeframe::SevenDays),
            "60d" => Ok(Timeframe::SixtyDays),
            "1y" => Ok(Timeframe::OneYear),
            "5y" => Ok(Timeframe::FiveYears),
            other => Err(PriceError::InvalidTimeframe(other.to_string())),
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A price series for one timeframe
///
/// `points` is empty only when every provider failed, in which case
/// `change_percentage` is exactly 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalSeries {
    pub points: Vec<PricePoint>,
    pub timeframe: Timeframe,
    pub change_percentage: f64,
}

impl HistoricalSeries {
    /// The degraded result returned when no provider could serve the timeframe
    pub fn empty(timeframe: Timeframe) -> Self {
        Self {
            points: Vec::new(),
            timeframe,
            change_percentage: 0.0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Events published by the revalidating cache
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PriceEvent {
    /// A resolution committed a new quote
    PriceUpdated {
        id: Uuid,
        old_price: Option<f64>,
        new_price: f64,
        change_24h: Option<f64>,
        source: String,
        timestamp: DateTime<Utc>,
    },

    /// A resolution failed across the whole provider chain
    PriceFetchFailed {
        id: Uuid,
        error_message: String,
        timestamp: DateTime<Utc>,
    },
}

impl PriceEvent {
    /// Get the event ID
    pub fn id(&self) -> Uuid {
        match self {
            PriceEvent::PriceUpdated { id, .. } => *id,
            PriceEvent::PriceFetchFailed { id, .. } => *id,
        }
    }

    /// Get the event type as string
    pub fn event_type(&self) -> &'static str {
        match self {
            PriceEvent::PriceUpdated { .. } => "PRICE_UPDATED",
            PriceEvent::PriceFetchFailed { .. } => "PRICE_FETCH_FAILED",
        }
    }
}

impl fmt::Display for PriceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PriceEvent::PriceUpdated {
                new_price, source, ..
            } => write!(f, "Price updated: BTC = €{:.2} ({})", new_price, source),
            PriceEvent::PriceFetchFailed { error_message, .. } => {
                write!(f, "Price fetch failed: {}", error_message)
            }
        }
    }
}

/// Overall system health status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthStatus {
    /// Fresh quote available
    Healthy,
    /// Serving a stale quote or the last refresh failed
    Degraded,
    /// No quote available
    Unhealthy,
}

/// Component health information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    /// Component name
    pub name: String,
    /// Component status
    pub status: HealthStatus,
    /// Optional status message
    pub message: Option<String>,
    /// Component-specific details
    pub details: std::collections::HashMap<String, serde_json::Value>,
    /// Last checked timestamp
    pub last_checked: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeframe_lookup_table() {
        let expected = [
            (Timeframe::SevenDays, 7, Granularity::Daily),
            (Timeframe::SixtyDays, 60, Granularity::Daily),
            (Timeframe::OneYear, 365, Granularity::Weekly),
            (Timeframe::FiveYears, 1825, Granularity::Monthly),
        ];
        for (timeframe, days, granularity) in expected {
            assert_eq!(timeframe.params(), TimeframeParams { days, granularity });
        }
    }

    #[test]
    fn test_timeframe_parse_rejects_unknown() {
        assert_eq!("1y".parse::<Timeframe>(), Ok(Timeframe::OneYear));
        assert_eq!(
            "3m".parse::<Timeframe>(),
            Err(PriceError::InvalidTimeframe("3m".to_string()))
        );
    }

    #[test]
    fn test_timeframe_lenient_falls_back_to_sixty_days_daily() {
        let timeframe = Timeframe::parse_lenient("bogus");
        assert_eq!(timeframe, Timeframe::SixtyDays);
        assert_eq!(
            timeframe.params(),
            TimeframeParams {
                days: 60,
                granularity: Granularity::Daily
            }
        );
        assert_eq!(Timeframe::parse_lenient("5y"), Timeframe::FiveYears);
    }

    #[test]
    fn test_timeframe_serde_labels() {
        for timeframe in Timeframe::all() {
            let json = serde_json::to_string(timeframe).unwrap();
            assert_eq!(json, format!("\"{}\"", timeframe.as_str()));
        }
    }

    #[test]
    fn test_quote_staleness() {
        let fresh = CurrentPrice::new(50_000.0, None, Utc::now().timestamp(), "test");
        assert!(!fresh.is_stale(60));

        let old = CurrentPrice::new(50_000.0, None, Utc::now().timestamp() - 600, "test");
        assert!(old.is_stale(300));
    }
}
