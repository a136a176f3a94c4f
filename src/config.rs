//! Runtime configuration
//!
//! Defaults come from `constants`; each knob can be overridden through an
//! environment variable. Malformed values are logged and ignored.

use crate::constants::{
    DEFAULT_DEDUPING_WINDOW_MS, DEFAULT_REFRESH_INTERVAL_MS, DEFAULT_REVALIDATE_ON_FOCUS,
    HISTORICAL_FALLBACK_DELAY_MS,
};
use std::time::Duration;

pub const ENV_REFRESH_INTERVAL_MS: &str = "BTC_PRICE_REFRESH_INTERVAL_MS";
pub const ENV_DEDUPING_WINDOW_MS: &str = "BTC_PRICE_DEDUPING_WINDOW_MS";
pub const ENV_REVALIDATE_ON_FOCUS: &str = "BTC_PRICE_REVALIDATE_ON_FOCUS";
pub const ENV_FALLBACK_DELAY_MS: &str = "BTC_PRICE_FALLBACK_DELAY_MS";
pub const ENV_LIVECOINWATCH_API_KEY: &str = "LIVECOINWATCH_API_KEY";

/// Revalidating cache policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Polling period while at least one consumer is subscribed; zero disables polling
    pub refresh_interval: Duration,
    /// Requests within this window of the last resolution reuse its result
    pub deduping_window: Duration,
    /// Whether `notify_focus` triggers a revalidation
    pub revalidate_on_focus: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            refresh_interval: Duration::from_millis(DEFAULT_REFRESH_INTERVAL_MS),
            deduping_window: Duration::from_millis(DEFAULT_DEDUPING_WINDOW_MS),
            revalidate_on_focus: DEFAULT_REVALIDATE_ON_FOCUS,
        }
    }
}

/// Everything needed to wire up a tracker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerConfig {
    pub cache: CacheConfig,
    /// Pause before the historical fallback provider is tried
    pub historical_fallback_delay: Duration,
    /// Enables the LiveCoinWatch historical fallback when set
    pub livecoinwatch_api_key: Option<String>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            historical_fallback_delay: Duration::from_millis(HISTORICAL_FALLBACK_DELAY_MS),
            livecoinwatch_api_key: None,
        }
    }
}

impl TrackerConfig {
    /// Reads overrides from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads overrides through `lookup`, falling back to defaults
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(ms) = parse_var(&lookup, ENV_REFRESH_INTERVAL_MS) {
            config.cache.refresh_interval = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_var(&lookup, ENV_DEDUPING_WINDOW_MS) {
            config.cache.deduping_window = Duration::from_millis(ms);
        }
        if let Some(enabled) = parse_var(&lookup, ENV_REVALIDATE_ON_FOCUS) {
            config.cache.revalidate_on_focus = enabled;
        }
        if let Some(ms) = parse_var(&lookup, ENV_FALLBACK_DELAY_MS) {
            config.historical_fallback_delay = Duration::from_millis(ms);
        }

        config.livecoinwatch_api_key = lookup(ENV_LIVECOINWATCH_API_KEY)
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty());

        config
    }
}

fn parse_var<F, T>(lookup: &F, key: &str) -> Option<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "Ignoring malformed configuration value");
            None
        }
    }
}
