//! Folio Server — HTTP proxy endpoints.
//!
//! - `GET /api/stock-price?ticker=T` → `{ price }` via the quote chain
//! - `POST /api/recommendation` → `{ recommendation }` via the text generator
//! - `GET /health` → liveness

pub mod app;
pub mod error;
pub mod routes;

pub use app::{router, AppState};
pub use error::{ApiError, ErrorResponse};
