//! Quote data layer: providers, circuit breaker, cache, fallback chain and
//! the parallel price fetch that feeds the calculator.

pub mod alpha_vantage;
pub mod cache;
pub mod chain;
pub mod circuit_breaker;
pub mod fetch;
pub mod http;
pub mod provider;
pub mod yahoo;

pub use alpha_vantage::AlphaVantageProvider;
pub use cache::{CacheEntry, QuoteCache, DEFAULT_TTL_SECS};
pub use chain::QuoteChain;
pub use circuit_breaker::CircuitBreaker;
pub use fetch::{fetch_prices, PriceSnapshot};
pub use http::HttpSettings;
pub use provider::{Quote, QuoteError, QuoteOrigin, QuoteProvider, QuoteSource};
pub use yahoo::YahooProvider;
