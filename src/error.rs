//! Error types for the Bitcoin/EUR price SDK

use thiserror::Error;

/// Errors that can occur when fetching prices from a provider
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Transport-level failure
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// Timeout waiting for response
    #[error("Request timeout")]
    Timeout,

    /// Response received but missing or malformed expected fields
    #[error("Invalid response shape: {0}")]
    ShapeError(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// Non-2xx HTTP status
    #[error("Provider API error (HTTP {status}): {message}")]
    ApiError { status: u16, message: String },

    /// A resolver chain was built without providers
    #[error("No providers configured")]
    NoProviders,

    /// The background resolution task did not complete
    #[error("Resolution task failed: {0}")]
    TaskFailed(String),
}

impl ProviderError {
    /// Creates a ShapeError
    pub fn shape(msg: impl Into<String>) -> Self {
        Self::ShapeError(msg.into())
    }

    /// Classifies a reqwest failure, separating timeouts from other transport errors
    pub fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::NetworkError(err)
        }
    }
}

/// Errors surfaced to consumers of the SDK
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PriceError {
    /// No price has been resolved yet
    #[error("Price data not available yet")]
    NotAvailable,

    /// All providers failed and no cached value exists
    #[error("All providers failed: {0}")]
    ProviderFailure(String),

    /// Timeframe string not recognised
    #[error("Invalid timeframe: {0}")]
    InvalidTimeframe(String),
}

impl PriceError {
    /// Creates a ProviderFailure error
    pub fn provider_failure(msg: impl Into<String>) -> Self {
        Self::ProviderFailure(msg.into())
    }
}

impl From<&ProviderError> for PriceError {
    fn from(err: &ProviderError) -> Self {
        Self::provider_failure(err.to_string())
    }
}
