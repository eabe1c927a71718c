//! Yahoo Finance quote provider.
//!
//! Reads the latest price from the v8 chart API (`meta.regularMarketPrice`,
//! falling back to the last non-null close). Yahoo has no official API and
//! changes format without notice, so a secondary provider should sit behind
//! it in the chain.

use super::circuit_breaker::CircuitBreaker;
use super::http::{build_client, get_json, HttpSettings};
use super::provider::{QuoteError, QuoteProvider};
use crate::domain::Ticker;
use serde::Deserialize;
use std::sync::Arc;

const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com";

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    meta: ChartMeta,
    indicators: Option<Indicators>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    regular_market_price: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

/// Yahoo Finance price provider.
pub struct YahooProvider {
    client: reqwest::blocking::Client,
    circuit_breaker: Arc<CircuitBreaker>,
    settings: HttpSettings,
    base_url: String,
}

impl YahooProvider {
    pub const NAME: &'static str = "yahoo_finance";

    pub fn new(circuit_breaker: Arc<CircuitBreaker>, settings: HttpSettings) -> Result<Self, QuoteError> {
        Ok(Self {
            client: build_client(&settings)?,
            circuit_breaker,
            settings,
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Point the provider at a different host (proxies, test servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn chart_url(&self, ticker: &Ticker) -> String {
        format!(
            "{}/v8/finance/chart/{ticker}?range=1d&interval=1d",
            self.base_url
        )
    }

    fn parse_response(ticker: &Ticker, resp: ChartResponse) -> Result<f64, QuoteError> {
        let result = resp.chart.result.ok_or_else(|| match resp.chart.error {
            Some(err) if err.code == "Not Found" => QuoteError::SymbolNotFound {
                ticker: ticker.to_string(),
            },
            Some(err) => {
                QuoteError::ResponseFormatChanged(format!("{}: {}", err.code, err.description))
            }
            None => QuoteError::ResponseFormatChanged("empty result with no error".into()),
        })?;

        let data = result
            .into_iter()
            .next()
            .ok_or_else(|| QuoteError::ResponseFormatChanged("result array is empty".into()))?;

        let last_close = data
            .indicators
            .and_then(|i| i.quote.into_iter().next())
            .and_then(|q| q.close.into_iter().rev().flatten().next());

        data.meta
            .regular_market_price
            .or(last_close)
            .filter(|p| p.is_finite() && *p > 0.0)
            .ok_or_else(|| QuoteError::SymbolNotFound {
                ticker: ticker.to_string(),
            })
    }
}

impl QuoteProvider for YahooProvider {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn latest_price(&self, ticker: &Ticker) -> Result<f64, QuoteError> {
        let chart: ChartResponse = get_json(
            &self.client,
            &self.circuit_breaker,
            Self::NAME,
            &self.chart_url(ticker),
            ticker.as_str(),
            &self.settings,
        )?;
        Self::parse_response(ticker, chart)
    }

    fn is_available(&self) -> bool {
        self.circuit_breaker.is_allowed()
    }
}
