//! Provider chain — cache first, then each provider in order.

use chrono::Utc;
use std::sync::Arc;

use super::cache::QuoteCache;
use super::provider::{Quote, QuoteError, QuoteOrigin, QuoteProvider, QuoteSource};
use crate::domain::Ticker;

/// Ordered fallback over several providers with an optional shared cache.
///
/// A provider whose circuit breaker is open is skipped without a request.
/// Successful provider prices are written back to the cache; a cache write
/// failure is logged and does not fail the quote.
pub struct QuoteChain {
    providers: Vec<Box<dyn QuoteProvider>>,
    cache: Option<Arc<QuoteCache>>,
}

impl QuoteChain {
    pub fn new(providers: Vec<Box<dyn QuoteProvider>>) -> Self {
        Self {
            providers,
            cache: None,
        }
    }

    pub fn with_cache(mut self, cache: Arc<QuoteCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    pub fn cache(&self) -> Option<&QuoteCache> {
        self.cache.as_deref()
    }
}

impl QuoteSource for QuoteChain {
    fn quote(&self, ticker: &Ticker) -> Result<Quote, QuoteError> {
        if let Some(price) = self.cache.as_ref().and_then(|c| c.get(ticker)) {
            tracing::trace!(%ticker, price, "quote cache hit");
            return Ok(Quote {
                ticker: ticker.clone(),
                price,
                origin: QuoteOrigin::Cache,
                fetched_at: Utc::now(),
            });
        }

        let mut failures = Vec::new();

        for provider in &self.providers {
            if !provider.is_available() {
                failures.push(format!("{}: circuit breaker open", provider.name()));
                continue;
            }

            match provider.latest_price(ticker) {
                Ok(price) if price.is_finite() && price > 0.0 => {
                    if let Some(cache) = &self.cache {
                        if let Err(e) = cache.put(ticker, price) {
                            tracing::warn!(%ticker, error = %e, "failed to write quote cache");
                        }
                    }
                    tracing::debug!(%ticker, price, provider = provider.name(), "quote fetched");
                    return Ok(Quote {
                        ticker: ticker.clone(),
                        price,
                        origin: QuoteOrigin::Provider(provider.name().to_string()),
                        fetched_at: Utc::now(),
                    });
                }
                Ok(price) => {
                    failures.push(format!("{}: unusable price {price}", provider.name()));
                }
                Err(e) => {
                    tracing::warn!(%ticker, provider = provider.name(), error = %e, "quote provider failed");
                    failures.push(format!("{}: {e}", provider.name()));
                }
            }
        }

        if failures.is_empty() {
            failures.push("no quote providers configured".to_string());
        }

        Err(QuoteError::AllProvidersFailed {
            ticker: ticker.to_string(),
            failures,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Fixed {
        name: &'static str,
        result: Result<f64, QuoteError>,
        available: bool,
        calls: AtomicUsize,
    }

    impl Fixed {
        fn ok(name: &'static str, price: f64) -> Self {
            Self {
                name,
                result: Ok(price),
                available: true,
                calls: AtomicUsize::new(0),
            }
        }

        fn failing(name: &'static str) -> Self {
            Self {
                name,
                result: Err(QuoteError::NetworkUnreachable("timed out".into())),
                available: true,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl QuoteProvider for Fixed {
        fn name(&self) -> &str {
            self.name
        }

        fn latest_price(&self, _ticker: &Ticker) -> Result<f64, QuoteError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result.clone()
        }

        fn is_available(&self) -> bool {
            self.available
        }
    }

    fn t(s: &str) -> Ticker {
        Ticker::parse(s).unwrap()
    }

    #[test]
    fn falls_back_to_secondary() {
        let chain = QuoteChain::new(vec![
            Box::new(Fixed::failing("primary")),
            Box::new(Fixed::ok("secondary", 42.0)),
        ]);
        let q = chain.quote(&t("AAPL")).unwrap();
        assert_eq!(q.price, 42.0);
        assert_eq!(q.origin, QuoteOrigin::Provider("secondary".into()));
    }

    #[test]
    fn all_failing_reports_each_provider() {
        let chain = QuoteChain::new(vec![
            Box::new(Fixed::failing("primary")),
            Box::new(Fixed {
                available: false,
                ..Fixed::ok("secondary", 1.0)
            }),
        ]);
        match chain.quote(&t("AAPL")) {
            Err(QuoteError::AllProvidersFailed { ticker, failures }) => {
                assert_eq!(ticker, "AAPL");
                assert_eq!(failures.len(), 2);
                assert!(failures[1].contains("circuit breaker open"));
            }
            other => panic!("expected AllProvidersFailed, got {other:?}"),
        }
    }

    #[test]
    fn zero_price_is_not_accepted() {
        let chain = QuoteChain::new(vec![
            Box::new(Fixed::ok("primary", 0.0)),
            Box::new(Fixed::ok("secondary", 5.0)),
        ]);
        assert_eq!(chain.quote(&t("AAPL")).unwrap().price, 5.0);
    }

    #[test]
    fn cache_hit_skips_providers() {
        let cache = Arc::new(QuoteCache::in_memory(Duration::minutes(5)));
        cache.put(&t("AAPL"), 99.0).unwrap();
        let chain = QuoteChain::new(vec![Box::new(Fixed::ok("primary", 1.0))]).with_cache(cache);

        let q = chain.quote(&t("AAPL")).unwrap();
        assert_eq!(q.price, 99.0);
        assert_eq!(q.origin, QuoteOrigin::Cache);
    }

    #[test]
    fn provider_result_is_cached() {
        let cache = Arc::new(QuoteCache::in_memory(Duration::minutes(5)));
        let chain =
            QuoteChain::new(vec![Box::new(Fixed::ok("primary", 12.5))]).with_cache(cache.clone());
        chain.quote(&t("VTI")).unwrap();
        assert_eq!(cache.get(&t("VTI")), Some(12.5));
    }

    #[test]
    fn empty_chain_fails() {
        let chain = QuoteChain::new(Vec::new());
        assert!(matches!(
            chain.quote(&t("AAPL")),
            Err(QuoteError::AllProvidersFailed { .. })
        ));
    }
}
