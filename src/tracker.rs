//! Bitcoin price tracker service
//!
//! Wires the provider chains, the resolvers and the revalidating cache
//! together behind one handle.

use crate::{
    cache::{PriceSubscription, ResolveOutcome, RevalidatingCache},
    config::{CacheConfig, TrackerConfig},
    constants::STALE_THRESHOLD_SECS,
    error::{PriceError, ProviderError},
    metrics::ProviderMetrics,
    provider::{CurrentPriceProvider, HistoricalPriceProvider},
    providers::{BitfinexProvider, CoinGeckoProvider, LiveCoinWatchProvider},
    resolver::{CurrentPriceResolver, HistoricalPriceResolver},
    types::{ComponentHealth, CurrentPrice, HealthStatus, HistoricalSeries, Timeframe},
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::OnceCell;

static GLOBAL_TRACKER: OnceCell<Arc<BitcoinPriceTracker>> = OnceCell::const_new();

/// Bitcoin/EUR price tracker
///
/// # Example
/// ```no_run
/// use btc_eur_price_sdk::{BitcoinPriceTracker, Timeframe};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let tracker = BitcoinPriceTracker::global().await?;
///
/// let price = tracker.get_current_price().await?;
/// println!("BTC: €{:.2}", price.price);
///
/// let series = tracker
///     .get_historical_price_data(Timeframe::SevenDays, Some(&price))
///     .await;
/// println!("7d change: {:.2}%", series.change_percentage);
/// # Ok(())
/// # }
/// ```
pub struct BitcoinPriceTracker {
    current: Arc<CurrentPriceResolver>,
    historical: Arc<HistoricalPriceResolver>,
    cache: RevalidatingCache,
}

impl BitcoinPriceTracker {
    /// Returns the process-wide instance, configured from the environment
    pub async fn global() -> Result<Arc<Self>, ProviderError> {
        GLOBAL_TRACKER
            .get_or_try_init(|| async { Self::new().map(Arc::new) })
            .await
            .cloned()
    }

    /// Creates a tracker configured from the environment
    pub fn new() -> Result<Self, ProviderError> {
        Self::from_config(TrackerConfig::from_env())
    }

    /// Creates a tracker with the default provider chains
    ///
    /// Current price: CoinGecko → Bitfinex.
    /// Historical: CoinGecko → LiveCoinWatch (only with an API key).
    pub fn from_config(config: TrackerConfig) -> Result<Self, ProviderError> {
        let coingecko = Arc::new(CoinGeckoProvider::new()?);
        let bitfinex = Arc::new(BitfinexProvider::new()?);

        let current_chain: Vec<Arc<dyn CurrentPriceProvider>> =
            vec![coingecko.clone(), bitfinex];

        let mut historical_chain: Vec<Arc<dyn HistoricalPriceProvider>> = vec![coingecko];
        match config.livecoinwatch_api_key {
            Some(key) => historical_chain.push(Arc::new(LiveCoinWatchProvider::new(key)?)),
            None => tracing::warn!(
                "LIVECOINWATCH_API_KEY not set, historical prices have no fallback provider"
            ),
        }

        let historical = HistoricalPriceResolver::new(historical_chain)
            .with_fallback_delay(config.historical_fallback_delay);

        Ok(Self::with_resolvers(
            CurrentPriceResolver::new(current_chain),
            historical,
            config.cache,
        ))
    }

    /// Creates a tracker around explicit resolvers
    pub fn with_resolvers(
        current: CurrentPriceResolver,
        historical: HistoricalPriceResolver,
        cache_config: CacheConfig,
    ) -> Self {
        let current = Arc::new(current);
        let cache = RevalidatingCache::new(current.clone(), cache_config);

        Self {
            current,
            historical: Arc::new(historical),
            cache,
        }
    }

    /// Resolves the current price, bypassing the cache
    ///
    /// Fails only when every provider in the chain failed.
    pub async fn get_current_price(&self) -> Result<CurrentPrice, ProviderError> {
        self.current.resolve().await
    }

    /// Resolves a historical series; never fails
    ///
    /// When `current_price` is given it replaces the price of the most
    /// recent point.
    pub async fn get_historical_price_data(
        &self,
        timeframe: Timeframe,
        current_price: Option<&CurrentPrice>,
    ) -> HistoricalSeries {
        self.historical.resolve(timeframe, current_price).await
    }

    /// Registers a consumer of the cached price; polling runs while it lives
    pub fn subscribe(&self) -> PriceSubscription {
        self.cache.subscribe()
    }

    /// Forces a cached revalidation, honouring the dedup window
    pub async fn refresh(&self) -> ResolveOutcome {
        self.cache.refresh().await
    }

    /// Signals that the consuming context regained focus
    pub fn notify_focus(&self) {
        self.cache.notify_focus();
    }

    /// The cache backing `subscribe`
    pub fn cache(&self) -> &RevalidatingCache {
        &self.cache
    }

    /// Latest cached price
    ///
    /// Serves the last good value even if the most recent refresh failed.
    pub fn latest_price(&self) -> Result<Arc<CurrentPrice>, PriceError> {
        let snapshot = self.cache.snapshot();
        match (snapshot.value, snapshot.error) {
            (Some(price), _) => Ok(price),
            (None, Some(err)) => Err(PriceError::from(err.as_ref())),
            (None, None) => Err(PriceError::NotAvailable),
        }
    }

    /// Per-provider metrics for both chains
    pub async fn provider_metrics(&self) -> Vec<ProviderMetrics> {
        let mut metrics = self.current.metrics().await;
        metrics.extend(self.historical.metrics().await);
        metrics
    }

    /// Perform a health check on the tracker
    pub async fn health_check(&self) -> ComponentHealth {
        let snapshot = self.cache.snapshot();
        let mut details = HashMap::new();

        details.insert(
            "current_providers".to_string(),
            serde_json::json!(self.current.provider_names()),
        );
        details.insert(
            "historical_providers".to_string(),
            serde_json::json!(self.historical.provider_names()),
        );
        details.insert(
            "consumers".to_string(),
            serde_json::json!(self.cache.consumer_count()),
        );
        if let Some(price) = &snapshot.value {
            details.insert("price_eur".to_string(), serde_json::json!(price.price));
            details.insert("age_secs".to_string(), serde_json::json!(price.age().as_secs()));
            details.insert("source".to_string(), serde_json::json!(price.source));
        }
        if let Some(err) = &snapshot.error {
            details.insert("last_error".to_string(), serde_json::json!(err.to_string()));
        }

        let (status, message) = match &snapshot.value {
            None => (
                HealthStatus::Unhealthy,
                "Bitcoin price tracker has no price data".to_string(),
            ),
            Some(price) if price.is_stale(STALE_THRESHOLD_SECS) => (
                HealthStatus::Degraded,
                format!(
                    "Bitcoin price is stale (age: {}s)",
                    price.age().as_secs()
                ),
            ),
            Some(_) if snapshot.error.is_some() => (
                HealthStatus::Degraded,
                "Last refresh failed, serving cached price".to_string(),
            ),
            Some(_) => (
                HealthStatus::Healthy,
                "Bitcoin price tracker is operational with fresh data".to_string(),
            ),
        };

        ComponentHealth {
            name: "bitcoin_price_tracker".to_string(),
            status,
            message: Some(message),
            details,
            last_checked: chrono::Utc::now(),
        }
    }
}
