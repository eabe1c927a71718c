//! Folio Core — domain types, rebalancing calculator, quote data layer.
//!
//! This crate contains:
//! - Domain types (holdings, portfolio, watchlist, preferences, ids)
//! - Caller-level input validation
//! - The rebalancing calculator: valuation → recommendation → summary
//! - Quote providers, circuit breaker, TTL quote cache and the provider chain
//! - Parallel price fetch with placeholder substitution

pub mod data;
pub mod domain;
pub mod rebalance;
pub mod validation;

pub use validation::ValidationError;
