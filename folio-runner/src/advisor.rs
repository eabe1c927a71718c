//! Text-generation advisor — forwards a free-text prompt to a hosted model.
//!
//! The HTTP proxy endpoint and the CLI `advise` command both go through
//! [`TextGenerator`]; the production implementation talks to any
//! OpenAI-compatible `chat/completions` endpoint.

use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::time::Duration;
use thiserror::Error;

use folio_core::rebalance::{SimulationResult, Valuation};

use crate::config::AdvisorConfig;

const SYSTEM_PROMPT: &str = "You are a careful personal-finance assistant. \
Give concise, plain-language observations about the user's portfolio and \
contribution plan. Do not present estimates as facts and do not give \
individualized legal or tax advice.";

#[derive(Debug, Error)]
pub enum AdvisorError {
    #[error("prompt must not be empty")]
    EmptyPrompt,

    #[error("advisor is not configured (set FOLIO_ADVISOR_API_KEY)")]
    NotConfigured,

    #[error("advisor request failed: {0}")]
    Http(String),

    #[error("advisor returned HTTP {status}: {message}")]
    Upstream { status: u16, message: String },

    #[error("advisor response was not understood: {0}")]
    InvalidResponse(String),

    #[error("advisor returned no text")]
    EmptyResponse,
}

impl AdvisorError {
    /// Caller mistakes, as opposed to upstream failures.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::EmptyPrompt)
    }
}

/// Anything that turns a prompt into text.
pub trait TextGenerator: Send + Sync {
    fn generate(&self, prompt: &str) -> Result<String, AdvisorError>;
}

// ── Wire types ───────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f64,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Debug, Deserialize)]
struct ChatMessageResponse {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Blocking client for an OpenAI-compatible chat completion endpoint.
pub struct ChatCompletionClient {
    client: reqwest::blocking::Client,
    endpoint: String,
    model: String,
    max_tokens: u32,
    api_key: Option<String>,
}

impl ChatCompletionClient {
    pub fn new(config: &AdvisorConfig) -> Result<Self, AdvisorError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AdvisorError::Http(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            api_key: config.api_key.clone(),
        })
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

impl TextGenerator for ChatCompletionClient {
    fn generate(&self, prompt: &str) -> Result<String, AdvisorError> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(AdvisorError::EmptyPrompt);
        }
        let api_key = self.api_key.as_deref().ok_or(AdvisorError::NotConfigured)?;

        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            max_tokens: self.max_tokens,
            temperature: 0.3,
        };

        tracing::debug!(model = %self.model, prompt_chars = prompt.len(), "sending advisor request");
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .map_err(|e| AdvisorError::Http(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .map_err(|e| AdvisorError::Http(e.to_string()))?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorEnvelope>(&body)
                .map(|env| env.error.message)
                .unwrap_or_else(|_| body.chars().take(200).collect());
            tracing::warn!(status = status.as_u16(), %message, "advisor request rejected");
            return Err(AdvisorError::Upstream {
                status: status.as_u16(),
                message,
            });
        }

        parse_chat_response(&body)
    }
}

/// Extract the first choice's text from a chat completion body.
pub fn parse_chat_response(body: &str) -> Result<String, AdvisorError> {
    let response: ChatResponse =
        serde_json::from_str(body).map_err(|e| AdvisorError::InvalidResponse(e.to_string()))?;
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
        .ok_or(AdvisorError::EmptyResponse)
}

/// Describe a portfolio (and optionally a planned contribution) as a prompt.
pub fn build_prompt(valuation: &Valuation, simulation: Option<&SimulationResult>, question: &str) -> String {
    let mut prompt = String::new();
    let _ = writeln!(prompt, "Portfolio value: ${:.2}", valuation.total_value);
    let _ = writeln!(prompt, "Holdings (ticker: current% vs target%, price):");
    for row in valuation.allocation() {
        let price = valuation
            .get(&row.ticker)
            .map(|v| v.current_price)
            .unwrap_or(0.0);
        let price = if price > 0.0 {
            format!("${price:.2}")
        } else {
            "unavailable".to_string()
        };
        let _ = writeln!(
            prompt,
            "- {}: {:.1}% vs {:.1}%, {}",
            row.ticker, row.current_percentage, row.target_percentage, price
        );
    }

    if let Some(sim) = simulation {
        let _ = writeln!(prompt, "\nPlanned contribution: ${:.2}", sim.total_investment);
        for rec in sim.recommendations.iter().filter(|r| r.recommended_investment > 0.0) {
            let _ = writeln!(
                prompt,
                "- buy ${:.2} of {} (~{:.2} shares)",
                rec.recommended_investment, rec.ticker, rec.expected_shares
            );
        }
        if sim.unallocated_cash > 0.0 {
            let _ = writeln!(prompt, "- ${:.2} left unallocated", sim.unallocated_cash);
        }
    }

    let question = question.trim();
    if !question.is_empty() {
        let _ = writeln!(prompt, "\nQuestion: {question}");
    }
    prompt
}
