//! Shared HTTP plumbing for quote providers: client construction, retry with
//! exponential backoff, status-code mapping and circuit breaker bookkeeping.

use serde::de::DeserializeOwned;
use std::time::Duration;

use super::circuit_breaker::CircuitBreaker;
use super::provider::QuoteError;

/// Network settings shared by every provider.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HttpSettings {
    /// Per-request timeout; a timed-out call counts as a failure.
    pub timeout: Duration,
    /// Extra attempts after the first one.
    pub max_retries: u32,
    /// First backoff delay, doubled on every retry.
    pub base_delay: Duration,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            max_retries: 0,
            base_delay: Duration::from_millis(250),
        }
    }
}

pub(crate) fn build_client(settings: &HttpSettings) -> Result<reqwest::blocking::Client, QuoteError> {
    reqwest::blocking::Client::builder()
        .timeout(settings.timeout)
        .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
        .build()
        .map_err(|e| QuoteError::ClientSetup(e.to_string()))
}

/// Delay before retry number `attempt` (1-based): `base`, `2 × base`, ...
/// Saturates instead of overflowing for large attempt counts.
pub(crate) fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
}

/// GET `url` and decode the JSON body, retrying transient failures.
pub(crate) fn get_json<T: DeserializeOwned>(
    client: &reqwest::blocking::Client,
    breaker: &CircuitBreaker,
    provider: &str,
    url: &str,
    ticker: &str,
    settings: &HttpSettings,
) -> Result<T, QuoteError> {
    if !breaker.is_allowed() {
        return Err(QuoteError::CircuitBreakerOpen {
            provider: provider.to_string(),
        });
    }

    let mut last_error = None;

    for attempt in 0..=settings.max_retries {
        if attempt > 0 {
            let delay = backoff_delay(settings.base_delay, attempt);
            tracing::debug!(provider, ticker, attempt, ?delay, "retrying quote request");
            std::thread::sleep(delay);
            if !breaker.is_allowed() {
                return Err(QuoteError::CircuitBreakerOpen {
                    provider: provider.to_string(),
                });
            }
        }

        let resp = match client.get(url).send() {
            Ok(resp) => resp,
            Err(e) => {
                breaker.record_failure();
                last_error = Some(QuoteError::NetworkUnreachable(e.to_string()));
                if e.is_connect() || e.is_timeout() {
                    continue;
                }
                break;
            }
        };

        let status = resp.status();

        if status == reqwest::StatusCode::FORBIDDEN {
            breaker.trip();
            return Err(QuoteError::CircuitBreakerOpen {
                provider: provider.to_string(),
            });
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            breaker.record_failure();
            let retry_after = resp
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(60);
            last_error = Some(QuoteError::RateLimited {
                retry_after_secs: retry_after,
            });
            continue;
        }

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(QuoteError::AuthenticationRequired(format!(
                "{provider} rejected the request credentials"
            )));
        }

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(QuoteError::SymbolNotFound {
                ticker: ticker.to_string(),
            });
        }

        if !status.is_success() {
            breaker.record_failure();
            last_error = Some(QuoteError::Other(format!("HTTP {status} for {ticker}")));
            continue;
        }

        let body: T = resp.json().map_err(|e| {
            QuoteError::ResponseFormatChanged(format!("failed to parse response for {ticker}: {e}"))
        })?;
        breaker.record_success();
        return Ok(body);
    }

    Err(last_error.unwrap_or_else(|| QuoteError::Other("max retries exceeded".into())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_from_base() {
        let base = Duration::from_millis(250);
        assert_eq!(backoff_delay(base, 1), Duration::from_millis(250));
        assert_eq!(backoff_delay(base, 2), Duration::from_millis(500));
        assert_eq!(backoff_delay(base, 4), Duration::from_secs(2));
    }

    #[test]
    fn backoff_saturates_for_large_attempts() {
        let base = Duration::from_millis(250);
        assert_eq!(backoff_delay(base, 40), base.saturating_mul(u32::MAX));
        assert_eq!(backoff_delay(Duration::MAX, 3), Duration::MAX);
    }
}
