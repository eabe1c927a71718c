//! Quote chain assembly from configuration.

use std::sync::Arc;

use folio_core::data::{
    AlphaVantageProvider, CircuitBreaker, QuoteCache, QuoteChain, QuoteError, QuoteProvider,
    YahooProvider,
};

use crate::config::AppConfig;

/// Build the provider chain: Yahoo first (if enabled), Alpha Vantage second
/// (if a key is configured), backed by the file quote cache.
pub fn build_quote_chain(config: &AppConfig) -> Result<QuoteChain, QuoteError> {
    let settings = config.quotes.http_settings();
    let mut providers: Vec<Box<dyn QuoteProvider>> = Vec::new();

    if config.quotes.yahoo_enabled {
        let breaker = Arc::new(CircuitBreaker::for_provider(YahooProvider::NAME));
        providers.push(Box::new(YahooProvider::new(breaker, settings)?));
    }
    if let Some(key) = &config.quotes.alpha_vantage_api_key {
        let breaker = Arc::new(CircuitBreaker::for_provider(AlphaVantageProvider::NAME));
        providers.push(Box::new(AlphaVantageProvider::new(key.clone(), breaker, settings)?));
    }
    if providers.is_empty() {
        tracing::warn!("no quote providers enabled, every price will use the placeholder");
    }

    let cache = QuoteCache::open(config.quote_cache_path(), config.quotes.cache_ttl());
    let chain = QuoteChain::new(providers).with_cache(Arc::new(cache));
    tracing::info!(providers = ?chain.provider_names(), "quote chain ready");
    Ok(chain)
}
