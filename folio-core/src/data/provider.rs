//! Quote provider traits and structured error types.
//!
//! `QuoteProvider` abstracts over a single upstream (Yahoo Finance, Alpha
//! Vantage) so providers can be chained and mocked. `QuoteSource` is what
//! callers consume: anything that can turn a ticker into a quote, usually a
//! [`QuoteChain`](super::chain::QuoteChain) with a cache in front.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::Ticker;

/// Structured quote failures. Displayable in CLI output and HTTP error bodies.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QuoteError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("authentication required: {0}")]
    AuthenticationRequired(String),

    #[error("symbol not found: {ticker}")]
    SymbolNotFound { ticker: String },

    #[error("provider '{provider}' is paused after repeated failures (circuit breaker open)")]
    CircuitBreakerOpen { provider: String },

    #[error("no price available for {ticker}: {}", .failures.join("; "))]
    AllProvidersFailed {
        ticker: String,
        failures: Vec<String>,
    },

    #[error("HTTP client setup failed: {0}")]
    ClientSetup(String),

    #[error("quote error: {0}")]
    Other(String),
}

/// Where a price came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "name")]
pub enum QuoteOrigin {
    Cache,
    Provider(String),
    Placeholder,
}

/// A resolved price for one ticker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub ticker: Ticker,
    pub price: f64,
    pub origin: QuoteOrigin,
    pub fetched_at: DateTime<Utc>,
}

/// A single upstream price feed.
///
/// Providers only talk to their API; caching and fallback live in the chain.
pub trait QuoteProvider: Send + Sync {
    /// Short identifier used in logs and quote origins.
    fn name(&self) -> &str;

    /// Latest traded price for a ticker.
    fn latest_price(&self, ticker: &Ticker) -> Result<f64, QuoteError>;

    /// Whether the provider is currently accepting requests.
    fn is_available(&self) -> bool {
        true
    }
}

/// Anything that can resolve a ticker to a quote.
pub trait QuoteSource: Send + Sync {
    fn quote(&self, ticker: &Ticker) -> Result<Quote, QuoteError>;
}
