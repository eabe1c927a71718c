//! API route handlers.
//!
//! Both endpoints are thin proxies: validate input, call the blocking
//! collaborator on the blocking pool, pass its result or error through.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use folio_core::domain::Ticker;

use crate::app::AppState;
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct StockPriceQuery {
    pub ticker: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StockPriceResponse {
    pub price: f64,
}

/// `GET /api/stock-price?ticker=T`
pub async fn stock_price(
    State(state): State<AppState>,
    query: Result<Query<StockPriceQuery>, QueryRejection>,
) -> Result<Json<StockPriceResponse>, ApiError> {
    let Query(query) = query.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let raw = query.ticker.unwrap_or_default();
    let ticker = Ticker::parse(&raw)?;

    let quotes = state.quotes.clone();
    let quote = tokio::task::spawn_blocking(move || quotes.quote(&ticker)).await??;

    tracing::debug!(ticker = %quote.ticker, price = quote.price, "price served");
    Ok(Json(StockPriceResponse { price: quote.price }))
}

#[derive(Debug, Deserialize)]
pub struct RecommendationRequest {
    #[serde(default)]
    pub prompt: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RecommendationResponse {
    pub recommendation: String,
}

/// `POST /api/recommendation` with `{ "prompt": "..." }`
pub async fn recommendation(
    State(state): State<AppState>,
    body: Result<Json<RecommendationRequest>, JsonRejection>,
) -> Result<Json<RecommendationResponse>, ApiError> {
    let Json(request) = body.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let prompt = request
        .prompt
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .ok_or_else(|| ApiError::bad_request("prompt is required"))?;

    let advisor = state.advisor.clone();
    let recommendation = tokio::task::spawn_blocking(move || advisor.generate(&prompt)).await??;

    Ok(Json(RecommendationResponse { recommendation }))
}

/// `GET /health`
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "alive",
        "version": env!("CARGO_PKG_VERSION")
    }))
}
