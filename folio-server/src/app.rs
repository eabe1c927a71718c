//! Router and shared state.

use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use folio_core::data::QuoteSource;
use folio_runner::{AppContext, TextGenerator};

use crate::routes;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub quotes: Arc<dyn QuoteSource>,
    pub advisor: Arc<dyn TextGenerator>,
}

impl AppState {
    pub fn new(quotes: Arc<dyn QuoteSource>, advisor: Arc<dyn TextGenerator>) -> Self {
        Self { quotes, advisor }
    }

    pub fn from_context(ctx: &AppContext) -> Self {
        Self::new(ctx.quotes.clone(), ctx.advisor.clone())
    }
}

/// CORS for the configured origins; any origin when the list is empty.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = %o, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    if parsed.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(parsed)
    }
}

pub fn router(state: AppState, cors_origins: &[String]) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route("/api/stock-price", get(routes::stock_price))
        .route("/api/recommendation", post(routes::recommendation))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(cors_origins))
        .with_state(state)
}
