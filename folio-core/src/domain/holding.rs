//! Holding — one ticker's position within a portfolio.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::ids::Ticker;
use crate::validation::{
    validate_optional_price, validate_quantity, validate_target_percentage, ValidationError,
};

/// Manual annotation the user puts on a holding. Never derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum UserRecommendation {
    #[default]
    Buy,
    #[serde(rename = "Hold/Wait", alias = "Hold", alias = "Wait")]
    Hold,
    Sell,
}

impl UserRecommendation {
    pub fn is_buy(self) -> bool {
        matches!(self, Self::Buy)
    }
}

impl fmt::Display for UserRecommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => f.write_str("Buy"),
            Self::Hold => f.write_str("Hold/Wait"),
            Self::Sell => f.write_str("Sell"),
        }
    }
}

impl FromStr for UserRecommendation {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "buy" => Ok(Self::Buy),
            "hold" | "wait" | "hold/wait" => Ok(Self::Hold),
            "sell" => Ok(Self::Sell),
            _ => Err(ValidationError::UnknownRecommendation(s.to_string())),
        }
    }
}

/// A validated portfolio position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    pub ticker: Ticker,
    pub quantity: f64,
    pub target_percentage: f64,
    #[serde(default)]
    pub user_recommendation: UserRecommendation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_ceiling: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_cost: Option<f64>,
}

impl Holding {
    /// Convenience constructor for a plain Buy holding with no ceiling or cost.
    pub fn new(ticker: Ticker, quantity: f64, target_percentage: f64) -> Self {
        Self {
            ticker,
            quantity,
            target_percentage,
            user_recommendation: UserRecommendation::Buy,
            price_ceiling: None,
            average_cost: None,
        }
    }

    pub fn with_recommendation(mut self, rec: UserRecommendation) -> Self {
        self.user_recommendation = rec;
        self
    }

    pub fn with_price_ceiling(mut self, ceiling: f64) -> Self {
        self.price_ceiling = Some(ceiling);
        self
    }

    pub fn with_average_cost(mut self, cost: f64) -> Self {
        self.average_cost = Some(cost);
        self
    }
}

/// Unvalidated holding fields as entered by the user.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HoldingInput {
    pub ticker: String,
    pub quantity: f64,
    pub target_percentage: f64,
    #[serde(default)]
    pub user_recommendation: UserRecommendation,
    #[serde(default)]
    pub price_ceiling: Option<f64>,
    #[serde(default)]
    pub average_cost: Option<f64>,
}

impl HoldingInput {
    pub fn validate(self) -> Result<Holding, ValidationError> {
        Ok(Holding {
            ticker: Ticker::parse(&self.ticker)?,
            quantity: validate_quantity(self.quantity)?,
            target_percentage: validate_target_percentage(self.target_percentage)?,
            user_recommendation: self.user_recommendation,
            price_ceiling: validate_optional_price(
                self.price_ceiling,
                ValidationError::InvalidPriceCeiling,
            )?,
            average_cost: validate_optional_price(
                self.average_cost,
                ValidationError::InvalidAverageCost,
            )?,
        })
    }
}
