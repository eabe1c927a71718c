//! Caller-level input validation.
//!
//! Everything that reaches the rebalancing calculator has been through here
//! first: the calculator itself never sees a negative amount, an out-of-range
//! target, or an empty ticker.

use thiserror::Error;

/// User-facing validation failures.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("ticker is required")]
    MissingTicker,

    #[error("invalid ticker '{0}'")]
    InvalidTicker(String),

    #[error("invalid user id '{0}'")]
    InvalidUserId(String),

    #[error("quantity must be a positive number (got {0})")]
    NonPositiveQuantity(f64),

    #[error("target percentage must be between 0 and 100 (got {0})")]
    TargetOutOfRange(f64),

    #[error("price ceiling must be a positive number (got {0})")]
    InvalidPriceCeiling(f64),

    #[error("average cost must be a positive number (got {0})")]
    InvalidAverageCost(f64),

    #[error("investment amount must be a number (got '{0}')")]
    NonNumericAmount(String),

    #[error("investment amount cannot be negative (got {0})")]
    NegativeAmount(f64),

    #[error("target price must be a positive number (got {0})")]
    InvalidTargetPrice(f64),

    #[error("unknown recommendation '{0}' (expected Buy, Hold/Wait or Sell)")]
    UnknownRecommendation(String),

    #[error("holding {0} already exists")]
    DuplicateHolding(String),

    #[error("holding {0} not found")]
    UnknownHolding(String),
}

/// Parse a free-text investment amount as typed by the user.
///
/// Accepts an optional leading `$` and thousands separators (`"$1,500.50"`).
pub fn parse_investment_amount(raw: &str) -> Result<f64, ValidationError> {
    let cleaned: String = raw
        .trim()
        .trim_start_matches('$')
        .chars()
        .filter(|c| *c != ',' && *c != '_')
        .collect();
    if cleaned.is_empty() {
        return Err(ValidationError::NonNumericAmount(raw.to_string()));
    }
    let amount: f64 = cleaned
        .parse()
        .map_err(|_| ValidationError::NonNumericAmount(raw.to_string()))?;
    validate_investment_amount(amount)
}

/// Reject NaN, infinities and negative amounts. Zero is a valid (no-op) amount.
pub fn validate_investment_amount(amount: f64) -> Result<f64, ValidationError> {
    if !amount.is_finite() {
        return Err(ValidationError::NonNumericAmount(amount.to_string()));
    }
    if amount < 0.0 {
        return Err(ValidationError::NegativeAmount(amount));
    }
    Ok(amount)
}

pub(crate) fn validate_quantity(quantity: f64) -> Result<f64, ValidationError> {
    if !quantity.is_finite() || quantity <= 0.0 {
        return Err(ValidationError::NonPositiveQuantity(quantity));
    }
    Ok(quantity)
}

pub(crate) fn validate_target_percentage(target: f64) -> Result<f64, ValidationError> {
    if !target.is_finite() || !(0.0..=100.0).contains(&target) {
        return Err(ValidationError::TargetOutOfRange(target));
    }
    Ok(target)
}

pub(crate) fn validate_optional_price(
    value: Option<f64>,
    err: fn(f64) -> ValidationError,
) -> Result<Option<f64>, ValidationError> {
    match value {
        Some(v) if !v.is_finite() || v <= 0.0 => Err(err(v)),
        other => Ok(other),
    }
}
