//! Current-price resolver

use crate::{
    error::ProviderError,
    metrics::{MetricsCollector, Operation, ProviderMetrics},
    provider::CurrentPriceProvider,
    types::CurrentPrice,
};
use std::sync::Arc;
use std::time::Instant;

/// Resolves the instantaneous price from an ordered provider chain
///
/// The first success wins. When every provider fails the last error is
/// propagated; there is no synthetic default.
pub struct CurrentPriceResolver {
    chain: Vec<(Arc<dyn CurrentPriceProvider>, MetricsCollector)>,
}

impl CurrentPriceResolver {
    /// Creates a resolver trying `providers` in the order given
    pub fn new(providers: Vec<Arc<dyn CurrentPriceProvider>>) -> Self {
        let chain = providers
            .into_iter()
            .map(|provider| {
                let metrics = MetricsCollector::new(provider.provider_name(), Operation::Current);
                (provider, metrics)
            })
            .collect();

        Self { chain }
    }

    /// Creates the usual primary/fallback pair
    pub fn with_fallback(
        primary: Arc<dyn CurrentPriceProvider>,
        fallback: Arc<dyn CurrentPriceProvider>,
    ) -> Self {
        Self::new(vec![primary, fallback])
    }

    /// Provider names in chain order
    pub fn provider_names(&self) -> Vec<&'static str> {
        self.chain.iter().map(|(p, _)| p.provider_name()).collect()
    }

    /// Walks the chain until a provider returns a quote
    pub async fn resolve(&self) -> Result<CurrentPrice, ProviderError> {
        let mut last_error = None;

        for (provider, metrics) in &self.chain {
            let start = Instant::now();

            match provider.fetch_current().await {
                Ok(price) => {
                    metrics.record_request(start.elapsed(), true).await;
                    tracing::debug!(
                        provider = provider.provider_name(),
                        operation = Operation::Current.as_str(),
                        price = price.price,
                        latency_ms = start.elapsed().as_millis() as u64,
                        "Resolved current price"
                    );
                    return Ok(price);
                }
                Err(e) => {
                    metrics.record_request(start.elapsed(), false).await;
                    tracing::warn!(
                        provider = provider.provider_name(),
                        operation = Operation::Current.as_str(),
                        error = %e,
                        "Provider failed to fetch current price"
                    );
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or(ProviderError::NoProviders))
    }

    /// Per-provider metrics in chain order
    pub async fn metrics(&self) -> Vec<ProviderMetrics> {
        let mut result = Vec::with_capacity(self.chain.len());
        for (_, metrics) in &self.chain {
            result.push(metrics.get_metrics().await);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::mock::MockProvider;

    fn resolver(primary: &Arc<MockProvider>, fallback: &Arc<MockProvider>) -> CurrentPriceResolver {
        CurrentPriceResolver::with_fallback(primary.clone(), fallback.clone())
    }

    #[tokio::test]
    async fn test_primary_success_skips_fallback() {
        let primary = Arc::new(MockProvider::new("primary").with_price(60_000.0));
        let fallback = Arc::new(MockProvider::new("fallback").with_price(59_000.0));

        let price = resolver(&primary, &fallback).resolve().await.unwrap();

        assert_eq!(price.price, 60_000.0);
        assert_eq!(price.source, "primary");
        assert_eq!(primary.current_calls(), 1);
        assert_eq!(fallback.current_calls(), 0);
    }

    #[tokio::test]
    async fn test_fallback_used_once_when_primary_fails() {
        let primary = Arc::new(MockProvider::new("primary"));
        let fallback = Arc::new(MockProvider::new("fallback").with_price(59_000.0));

        let price = resolver(&primary, &fallback).resolve().await.unwrap();

        assert_eq!(price.price, 59_000.0);
        assert_eq!(price.source, "fallback");
        assert_eq!(primary.current_calls(), 1);
        assert_eq!(fallback.current_calls(), 1);
    }

    #[tokio::test]
    async fn test_total_failure_propagates() {
        let primary = Arc::new(MockProvider::new("primary"));
        let fallback = Arc::new(MockProvider::new("fallback"));

        let err = resolver(&primary, &fallback).resolve().await.unwrap_err();

        assert!(matches!(err, ProviderError::ShapeError(ref msg) if msg.contains("fallback")));
        assert_eq!(primary.current_calls(), 1);
        assert_eq!(fallback.current_calls(), 1);
    }

    #[tokio::test]
    async fn test_empty_chain() {
        let err = CurrentPriceResolver::new(Vec::new()).resolve().await.unwrap_err();
        assert!(matches!(err, ProviderError::NoProviders));
    }

    #[tokio::test]
    async fn test_attempts_are_recorded() {
        let primary = Arc::new(MockProvider::new("primary"));
        let fallback = Arc::new(MockProvider::new("fallback").with_price(59_000.0));
        let resolver = resolver(&primary, &fallback);

        resolver.resolve().await.unwrap();
        let metrics = resolver.metrics().await;

        assert_eq!(resolver.provider_names(), vec!["primary", "fallback"]);
        assert_eq!(metrics[0].failed_requests, 1);
        assert_eq!(metrics[1].total_requests, 1);
        assert_eq!(metrics[1].failed_requests, 0);
    }
}
