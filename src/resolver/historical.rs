//! Historical-price resolver

use crate::{
    change::change_percentage,
    constants::HISTORICAL_FALLBACK_DELAY_MS,
    error::ProviderError,
    metrics::{MetricsCollector, Operation, ProviderMetrics},
    provider::HistoricalPriceProvider,
    types::{CurrentPrice, HistoricalSeries, PricePoint, Timeframe},
};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Resolves a price series for a timeframe from an ordered provider chain
///
/// Total failure is absorbed: the caller gets an empty series with a 0%
/// change instead of an error.
pub struct HistoricalPriceResolver {
    chain: Vec<(Arc<dyn HistoricalPriceProvider>, MetricsCollector)>,
    fallback_delay: Duration,
}

impl HistoricalPriceResolver {
    /// Creates a resolver trying `providers` in the order given
    pub fn new(providers: Vec<Arc<dyn HistoricalPriceProvider>>) -> Self {
        let chain = providers
            .into_iter()
            .map(|provider| {
                let metrics =
                    MetricsCollector::new(provider.provider_name(), Operation::Historical);
                (provider, metrics)
            })
            .collect();

        Self {
            chain,
            fallback_delay: Duration::from_millis(HISTORICAL_FALLBACK_DELAY_MS),
        }
    }

    /// Overrides the pause taken before each fallback attempt
    pub fn with_fallback_delay(mut self, delay: Duration) -> Self {
        self.fallback_delay = delay;
        self
    }

    /// Provider names in chain order
    pub fn provider_names(&self) -> Vec<&'static str> {
        self.chain.iter().map(|(p, _)| p.provider_name()).collect()
    }

    /// Fetches the series for `timeframe`, splicing in `live` as the latest price
    pub async fn resolve(
        &self,
        timeframe: Timeframe,
        live: Option<&CurrentPrice>,
    ) -> HistoricalSeries {
        for (index, (provider, metrics)) in self.chain.iter().enumerate() {
            if index > 0 {
                tokio::time::sleep(self.fallback_delay).await;
            }

            let start = Instant::now();
            let fetched = provider.fetch_historical(timeframe).await.and_then(|points| {
                if points.is_empty() {
                    Err(ProviderError::shape(format!(
                        "{} returned an empty series",
                        provider.provider_name()
                    )))
                } else {
                    Ok(points)
                }
            });

            match fetched {
                Ok(points) => {
                    metrics.record_request(start.elapsed(), true).await;
                    tracing::debug!(
                        provider = provider.provider_name(),
                        operation = Operation::Historical.as_str(),
                        timeframe = %timeframe,
                        count = points.len(),
                        "Resolved historical prices"
                    );
                    return build_series(timeframe, points, live);
                }
                Err(e) => {
                    metrics.record_request(start.elapsed(), false).await;
                    tracing::warn!(
                        provider = provider.provider_name(),
                        operation = Operation::Historical.as_str(),
                        timeframe = %timeframe,
                        error = %e,
                        "Provider failed to fetch historical prices"
                    );
                }
            }
        }

        tracing::error!(
            timeframe = %timeframe,
            "All historical providers failed, returning empty series"
        );
        HistoricalSeries::empty(timeframe)
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

/// Replaces the last point's price with the live quote, keeping its timestamp
fn splice_live_price(points: &mut [PricePoint], live: &CurrentPrice) {
    // A zero or non-finite quote counts as no quote
    if !live.price.is_finite() || live.price <= 0.0 {
        return;
    }
    if let Some(last) = points.last_mut() {
        last.price = live.price;
    }
}

fn build_series(
    timeframe: Timeframe,
    mut points: Vec<PricePoint>,
    live: Option<&CurrentPrice>,
) -> HistoricalSeries {
    if let Some(live) = live {
        splice_live_price(&mut points, live);
    }

    let change = match (points.first(), points.last()) {
        (Some(first), Some(last)) => change_percentage(first.price, last.price),
        _ => 0.0,
    };

    HistoricalSeries {
        points,
        timeframe,
        change_percentage: change,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::mock::{linear_series, MockProvider};

    fn resolver(
        primary: &Arc<MockProvider>,
        fallback: &Arc<MockProvider>,
    ) -> HistoricalPriceResolver {
        HistoricalPriceResolver::new(vec![primary.clone(), fallback.clone()])
    }

    fn live(price: f64) -> CurrentPrice {
        CurrentPrice::new(price, Some(0.4), 1_718_000_000, "live")
    }

    #[tokio::test]
    async fn test_seven_day_series_from_primary() {
        let primary =
            Arc::new(MockProvider::new("primary").with_series(linear_series(8, 20_000.0, 21_000.0)));
        let fallback = Arc::new(MockProvider::new("fallback"));

        let series = resolver(&primary, &fallback)
            .resolve(Timeframe::SevenDays, None)
            .await;

        assert_eq!(series.timeframe, Timeframe::SevenDays);
        assert_eq!(series.points.len(), 8);
        assert!((series.change_percentage - 5.0).abs() < 1e-9);
        assert_eq!(fallback.historical_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_one_year_falls_back_after_delay() {
        let primary = Arc::new(MockProvider::new("primary"));
        let fallback =
            Arc::new(MockProvider::new("fallback").with_series(linear_series(52, 30_000.0, 45_000.0)));

        let started = tokio::time::Instant::now();
        let series = resolver(&primary, &fallback)
            .resolve(Timeframe::OneYear, None)
            .await;

        assert!(started.elapsed() >= Duration::from_millis(HISTORICAL_FALLBACK_DELAY_MS));
        assert_eq!(series.points, linear_series(52, 30_000.0, 45_000.0));
        assert!((series.change_percentage - 50.0).abs() < 1e-9);
        assert_eq!(primary.historical_calls(), 1);
        assert_eq!(fallback.historical_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_total_failure_yields_empty_series() {
        let primary = Arc::new(MockProvider::new("primary"));
        let fallback = Arc::new(MockProvider::new("fallback"));

        let series = resolver(&primary, &fallback)
            .resolve(Timeframe::FiveYears, Some(&live(65_000.0)))
            .await;

        assert_eq!(series, HistoricalSeries::empty(Timeframe::FiveYears));
        assert_eq!(series.change_percentage, 0.0);
    }

    #[tokio::test]
    async fn test_live_price_replaces_last_point_only() {
        let original = linear_series(5, 100.0, 140.0);
        let primary = Arc::new(MockProvider::new("primary").with_series(original.clone()));
        let fallback = Arc::new(MockProvider::new("fallback"));

        let series = resolver(&primary, &fallback)
            .resolve(Timeframe::SixtyDays, Some(&live(150.0)))
            .await;

        let last = series.points.last().unwrap();
        assert_eq!(last.price, 150.0);
        assert_eq!(last.timestamp, original.last().unwrap().timestamp);
        assert_eq!(series.points[..4], original[..4]);
        assert_eq!(series.change_percentage, 50.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_primary_series_moves_to_fallback() {
        let primary = Arc::new(MockProvider::new("primary").with_series(Vec::new()));
        let fallback =
            Arc::new(MockProvider::new("fallback").with_series(linear_series(5, 100.0, 110.0)));
        let resolver = resolver(&primary, &fallback);

        let series = resolver.resolve(Timeframe::SixtyDays, None).await;

        assert_eq!(series.points, linear_series(5, 100.0, 110.0));
        assert!((series.change_percentage - 10.0).abs() < 1e-9);
        assert_eq!(fallback.historical_calls(), 1);

        let metrics = resolver.metrics().await;
        assert_eq!(metrics[0].failed_requests, 1);
        assert_eq!(metrics[1].failed_requests, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_series_everywhere_is_total_failure() {
        let primary = Arc::new(MockProvider::new("primary").with_series(Vec::new()));
        let fallback = Arc::new(MockProvider::new("fallback").with_series(Vec::new()));

        let series = resolver(&primary, &fallback)
            .resolve(Timeframe::SevenDays, Some(&live(65_000.0)))
            .await;

        assert_eq!(series, HistoricalSeries::empty(Timeframe::SevenDays));
    }

    #[test]
    fn test_zero_live_price_is_ignored() {
        let original = linear_series(3, 100.0, 120.0);
        let series = build_series(Timeframe::SevenDays, original.clone(), Some(&live(0.0)));

        assert_eq!(series.points, original);
        assert!((series.change_percentage - 20.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_empty_chain_yields_empty_series() {
        let series = HistoricalPriceResolver::new(Vec::new())
            .resolve(Timeframe::OneYear, None)
            .await;
        assert!(series.is_empty());
    }
}
