//! Price fan-out: one quote request per ticker, in parallel.
//!
//! Tickers are independent, so there is no ordering between requests. Every
//! ticker ends up in the snapshot: either with its quoted price or with the
//! placeholder, in which case the failure is kept for display.

use chrono::Utc;
use rayon::prelude::*;

use super::provider::{Quote, QuoteError, QuoteOrigin, QuoteSource};
use crate::domain::{PriceMap, Ticker};

/// Prices for a set of tickers plus what went wrong getting them.
#[derive(Debug, Clone, Default)]
pub struct PriceSnapshot {
    pub prices: PriceMap,
    /// One quote per ticker, placeholders included.
    pub quotes: Vec<Quote>,
    /// Tickers priced with the placeholder, and why.
    pub failures: Vec<(Ticker, QuoteError)>,
}

impl PriceSnapshot {
    pub fn all_quoted(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Fetch prices for `tickers` concurrently. A ticker whose quote fails gets
/// `placeholder_price` (0.0 means "price unavailable" to the calculator).
pub fn fetch_prices(
    source: &dyn QuoteSource,
    tickers: &[Ticker],
    placeholder_price: f64,
) -> PriceSnapshot {
    let results: Vec<(Ticker, Result<Quote, QuoteError>)> = tickers
        .par_iter()
        .map(|ticker| (ticker.clone(), source.quote(ticker)))
        .collect();

    let mut snapshot = PriceSnapshot::default();
    for (ticker, result) in results {
        match result {
            Ok(quote) => {
                snapshot.prices.insert(ticker, quote.price);
                snapshot.quotes.push(quote);
            }
            Err(e) => {
                tracing::warn!(%ticker, error = %e, placeholder_price, "using placeholder price");
                snapshot.prices.insert(ticker.clone(), placeholder_price);
                snapshot.quotes.push(Quote {
                    ticker: ticker.clone(),
                    price: placeholder_price,
                    origin: QuoteOrigin::Placeholder,
                    fetched_at: Utc::now(),
                });
                snapshot.failures.push((ticker, e));
            }
        }
    }

    snapshot.failures.sort_by(|a, b| a.0.cmp(&b.0));
    snapshot.quotes.sort_by(|a, b| a.ticker.cmp(&b.ticker));
    snapshot
}
