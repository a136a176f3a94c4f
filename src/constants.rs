//! Constants for the Bitcoin/EUR price SDK
//!
//! Compile-time defaults live here. Runtime overrides are read from the
//! environment by the `config` module.

/// Default polling period while at least one consumer is subscribed (in milliseconds)
pub const DEFAULT_REFRESH_INTERVAL_MS: u64 = 60_000;

/// Default window in which repeated resolutions reuse one result (in milliseconds)
pub const DEFAULT_DEDUPING_WINDOW_MS: u64 = 15_000;

/// Whether regaining focus triggers a revalidation by default
pub const DEFAULT_REVALIDATE_ON_FOCUS: bool = true;

/// Pause before the historical fallback provider is called (in milliseconds)
pub const HISTORICAL_FALLBACK_DELAY_MS: u64 = 300;

/// How long before a quote is considered stale for health reporting (in seconds)
pub const STALE_THRESHOLD_SECS: u64 = 300;

/// HTTP request timeout when fetching prices (in seconds)
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// CoinGecko API base URL
pub const COINGECKO_API_URL: &str = "https://api.coingecko.com/api/v3";

/// CoinGecko API endpoint for simple price queries
pub const COINGECKO_SIMPLE_PRICE_ENDPOINT: &str = "/simple/price";

/// CoinGecko API endpoint for the bitcoin market chart
pub const COINGECKO_MARKET_CHART_ENDPOINT: &str = "/coins/bitcoin/market_chart";

/// CoinGecko asset id
pub const COINGECKO_COIN_ID: &str = "bitcoin";

/// CoinGecko quote currency
pub const COINGECKO_VS_CURRENCY: &str = "eur";

/// Bitfinex public API base URL
pub const BITFINEX_API_URL: &str = "https://api-pub.bitfinex.com/v2";

/// Bitfinex ticker endpoint for the BTC/EUR pair
pub const BITFINEX_TICKER_ENDPOINT: &str = "/ticker/tBTCEUR";

/// LiveCoinWatch API base URL
pub const LIVECOINWATCH_API_URL: &str = "https://api.livecoinwatch.com";

/// LiveCoinWatch single-coin history endpoint
pub const LIVECOINWATCH_HISTORY_ENDPOINT: &str = "/coins/single/history";

/// LiveCoinWatch coin code
pub const LIVECOINWATCH_COIN_CODE: &str = "BTC";

/// LiveCoinWatch quote currency
pub const LIVECOINWATCH_CURRENCY: &str = "EUR";

/// User agent for HTTP requests
pub const USER_AGENT: &str = "btc-eur-price-sdk/0.1.0";

/// Milliseconds in one day
pub const MS_PER_DAY: i64 = 86_400_000;
