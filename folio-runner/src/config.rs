//! Application configuration — `folio.toml` plus environment overrides.
//!
//! Every field has a default, so an absent file is a valid configuration.
//! Secrets are never expected in the file; they come from the environment
//! (or a `.env` file loaded by the binaries).

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use folio_core::data::{HttpSettings, DEFAULT_TTL_SECS};
use folio_core::rebalance::{YieldAssumption, DEFAULT_ASSUMED_DIVIDEND_YIELD};

/// File looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "folio.toml";

pub const ENV_ALPHA_VANTAGE_KEY: &str = "ALPHA_VANTAGE_API_KEY";
pub const ENV_ADVISOR_KEY: &str = "FOLIO_ADVISOR_API_KEY";
pub const ENV_DATA_DIR: &str = "FOLIO_DATA_DIR";
pub const ENV_HOST: &str = "HOST";
pub const ENV_PORT: &str = "PORT";

/// Upper bound on `quotes.max_retries`; backoff doubles per retry.
pub const MAX_QUOTE_RETRIES: u32 = 8;

/// Errors from loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    NotFound(PathBuf),

    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid value for {key}: {reason}")]
    Invalid { key: String, reason: String },
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Root for user documents, history and the quote cache.
    pub data_dir: PathBuf,
    pub quotes: QuoteConfig,
    pub valuation: ValuationConfig,
    pub advisor: AdvisorConfig,
    pub server: ServerConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".folio"),
            quotes: QuoteConfig::default(),
            valuation: ValuationConfig::default(),
            advisor: AdvisorConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuoteConfig {
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub cache_ttl_secs: i64,
    /// Price used when every provider fails. 0.0 reads as "unavailable".
    pub placeholder_price: f64,
    pub yahoo_enabled: bool,
    /// Enables the Alpha Vantage fallback. Normally set from the environment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alpha_vantage_api_key: Option<String>,
}

impl Default for QuoteConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 5,
            max_retries: 0,
            cache_ttl_secs: DEFAULT_TTL_SECS,
            placeholder_price: 0.0,
            yahoo_enabled: true,
            alpha_vantage_api_key: None,
        }
    }
}

impl QuoteConfig {
    pub fn http_settings(&self) -> HttpSettings {
        HttpSettings {
            timeout: Duration::from_secs(self.timeout_secs),
            max_retries: self.max_retries,
            ..HttpSettings::default()
        }
    }

    pub fn cache_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.cache_ttl_secs)
    }
}

/// Yield-on-cost estimate settings. The dividend yield is an assumption,
/// not market data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValuationConfig {
    pub yield_on_cost_enabled: bool,
    pub assumed_dividend_yield: f64,
}

impl Default for ValuationConfig {
    fn default() -> Self {
        Self {
            yield_on_cost_enabled: true,
            assumed_dividend_yield: DEFAULT_ASSUMED_DIVIDEND_YIELD,
        }
    }
}

impl ValuationConfig {
    pub fn yield_assumption(&self) -> YieldAssumption {
        if self.yield_on_cost_enabled {
            YieldAssumption {
                assumed_dividend_yield: Some(self.assumed_dividend_yield),
            }
        } else {
            YieldAssumption::disabled()
        }
    }
}

/// OpenAI-compatible chat completion endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvisorConfig {
    pub endpoint: String,
    pub model: String,
    pub timeout_secs: u64,
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
            model: "gpt-4o-mini".to_string(),
            timeout_secs: 30,
            max_tokens: 512,
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Allowed CORS origins; empty allows any origin.
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            cors_origins: Vec::new(),
        }
    }
}

impl AppConfig {
    /// Load configuration.
    ///
    /// With an explicit `path` the file must exist. Without one,
    /// `folio.toml` in the working directory is used when present and the
    /// defaults otherwise. Environment overrides are applied last.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(p) if !p.exists() => return Err(ConfigError::NotFound(p.to_path_buf())),
            Some(p) => Self::from_file(p)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Self::default(),
        };
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply environment overrides through `lookup`. Blank values are ignored.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(key) = get(ENV_ALPHA_VANTAGE_KEY) {
            self.quotes.alpha_vantage_api_key = Some(key);
        }
        if let Some(key) = get(ENV_ADVISOR_KEY) {
            self.advisor.api_key = Some(key);
        }
        if let Some(dir) = get(ENV_DATA_DIR) {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(host) = get(ENV_HOST) {
            self.server.host = host;
        }
        if let Some(port) = get(ENV_PORT) {
            self.server.port = port.parse().map_err(|_| ConfigError::Invalid {
                key: ENV_PORT.to_string(),
                reason: format!("'{port}' is not a port number"),
            })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |key: &str, reason: String| ConfigError::Invalid {
            key: key.to_string(),
            reason,
        };

        if self.quotes.timeout_secs == 0 {
            return Err(invalid("quotes.timeout_secs", "must be at least 1".into()));
        }
        if self.quotes.max_retries > MAX_QUOTE_RETRIES {
            return Err(invalid(
                "quotes.max_retries",
                format!("must be at most {MAX_QUOTE_RETRIES}, got {}", self.quotes.max_retries),
            ));
        }
        if self.quotes.cache_ttl_secs < 0 {
            return Err(invalid(
                "quotes.cache_ttl_secs",
                format!("must not be negative, got {}", self.quotes.cache_ttl_secs),
            ));
        }
        if !self.quotes.placeholder_price.is_finite() || self.quotes.placeholder_price < 0.0 {
            return Err(invalid(
                "quotes.placeholder_price",
                format!("must be finite and >= 0, got {}", self.quotes.placeholder_price),
            ));
        }
        let y = self.valuation.assumed_dividend_yield;
        if !y.is_finite() || !(0.0..=1.0).contains(&y) {
            return Err(invalid(
                "valuation.assumed_dividend_yield",
                format!("must be a fraction in [0, 1], got {y}"),
            ));
        }
        if self.advisor.endpoint.trim().is_empty() {
            return Err(invalid("advisor.endpoint", "must not be empty".into()));
        }
        Ok(())
    }

    pub fn users_dir(&self) -> PathBuf {
        self.data_dir.join("users")
    }

    pub fn history_dir(&self) -> PathBuf {
        self.data_dir.join("history")
    }

    pub fn quote_cache_path(&self) -> PathBuf {
        self.data_dir.join("quote_cache.json")
    }
}
