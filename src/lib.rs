//! # Bitcoin/EUR Price SDK
//!
//! Current and historical BTC/EUR prices from free public market-data APIs,
//! with ordered provider fallback and a revalidating cache for the live quote.
//!
//! ## Usage
//!
//! ```no_run
//! use btc_eur_price_sdk::{BitcoinPriceTracker, Timeframe};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let tracker = BitcoinPriceTracker::global().await?;
//!
//! // One-shot resolution (errors only if every provider failed)
//! let price = tracker.get_current_price().await?;
//!
//! // Historical series (empty with 0% change if every provider failed)
//! let series = tracker
//!     .get_historical_price_data(Timeframe::OneYear, Some(&price))
//!     .await;
//! println!("1y: {} points, {:.2}%", series.points.len(), series.change_percentage);
//!
//! // Polled, deduplicated quote for display
//! let mut subscription = tracker.subscribe();
//! let snapshot = subscription.changed().await;
//! if let Some(price) = snapshot.value {
//!     println!("BTC: €{:.2}", price.price);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! CoinGecko / Bitfinex / LiveCoinWatch   (providers)
//!     ↓
//! CurrentPriceResolver, HistoricalPriceResolver
//!     ↓                         ↓
//! RevalidatingCache        change_percentage
//!     ↓
//! PriceSubscription (value, is_loading, is_validating, is_error, refresh)
//! ```
//!
//! ## Configuration
//!
//! Defaults live in [`constants`]; see [`config`] for the environment
//! variables that override them.

pub mod cache;
pub mod change;
pub mod config;
pub mod constants;
pub mod error;
pub mod metrics;
pub mod provider;
pub mod providers;
pub mod resolver;
pub mod tracker;
pub mod types;

// Re-export commonly used types
pub use cache::{PriceSnapshot, PriceSubscription, RevalidatingCache};
pub use change::change_percentage;
pub use config::{CacheConfig, TrackerConfig};
pub use error::{PriceError, ProviderError};
pub use metrics::ProviderMetrics;
pub use resolver::{CurrentPriceResolver, HistoricalPriceResolver};
pub use tracker::BitcoinPriceTracker;
pub use types::{
    ComponentHealth, CurrentPrice, Granularity, HealthStatus, HistoricalSeries, PriceEvent,
    PricePoint, Timeframe,
};
