//! Alpha Vantage `GLOBAL_QUOTE` provider, used as the secondary feed.
//!
//! Alpha Vantage answers throttled or invalid requests with HTTP 200 and a
//! `Note`/`Information`/`Error Message` field instead of a status code, so
//! those are mapped here rather than in the shared HTTP layer.

use super::circuit_breaker::CircuitBreaker;
use super::http::{build_client, get_json, HttpSettings};
use super::provider::{QuoteError, QuoteProvider};
use crate::domain::Ticker;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;

const DEFAULT_BASE_URL: &str = "https://www.alphavantage.co";
const PRICE_FIELD: &str = "05. price";

#[derive(Debug, Deserialize)]
struct GlobalQuoteResponse {
    #[serde(rename = "Global Quote")]
    global_quote: Option<HashMap<String, String>>,
    #[serde(rename = "Note")]
    note: Option<String>,
    #[serde(rename = "Information")]
    information: Option<String>,
    #[serde(rename = "Error Message")]
    error_message: Option<String>,
}

pub struct AlphaVantageProvider {
    client: reqwest::blocking::Client,
    circuit_breaker: Arc<CircuitBreaker>,
    settings: HttpSettings,
    api_key: String,
    base_url: String,
}

impl AlphaVantageProvider {
    pub const NAME: &'static str = "alpha_vantage";

    pub fn new(
        api_key: impl Into<String>,
        circuit_breaker: Arc<CircuitBreaker>,
        settings: HttpSettings,
    ) -> Result<Self, QuoteError> {
        Ok(Self {
            client: build_client(&settings)?,
            circuit_breaker,
            settings,
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn quote_url(&self, ticker: &Ticker) -> String {
        format!(
            "{}/query?function=GLOBAL_QUOTE&symbol={ticker}&apikey={}",
            self.base_url, self.api_key
        )
    }

    fn parse_response(ticker: &Ticker, resp: GlobalQuoteResponse) -> Result<f64, QuoteError> {
        if let Some(note) = resp.note.or(resp.information) {
            tracing::debug!(%ticker, note = %note, "alpha vantage throttled");
            return Err(QuoteError::RateLimited {
                retry_after_secs: 60,
            });
        }
        if resp.error_message.is_some() {
            return Err(QuoteError::SymbolNotFound {
                ticker: ticker.to_string(),
            });
        }

        let quote = resp
            .global_quote
            .ok_or_else(|| QuoteError::ResponseFormatChanged("missing 'Global Quote'".into()))?;

        // An unknown symbol comes back as an empty object.
        let raw = quote.get(PRICE_FIELD).ok_or_else(|| QuoteError::SymbolNotFound {
            ticker: ticker.to_string(),
        })?;

        raw.trim()
            .parse::<f64>()
            .ok()
            .filter(|p| p.is_finite() && *p > 0.0)
            .ok_or_else(|| QuoteError::ResponseFormatChanged(format!("unparseable price '{raw}'")))
    }
}

impl QuoteProvider for AlphaVantageProvider {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn latest_price(&self, ticker: &Ticker) -> Result<f64, QuoteError> {
        let resp: GlobalQuoteResponse = get_json(
            &self.client,
            &self.circuit_breaker,
            Self::NAME,
            &self.quote_url(ticker),
            ticker.as_str(),
            &self.settings,
        )?;
        let parsed = Self::parse_response(ticker, resp);
        if matches!(parsed, Err(QuoteError::RateLimited { .. })) {
            self.circuit_breaker.record_failure();
        }
        parsed
    }

    fn is_available(&self) -> bool {
        self.circuit_breaker.is_allowed()
    }
}
