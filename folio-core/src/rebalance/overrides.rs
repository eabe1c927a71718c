//! Policy overrides applied on top of the raw allocation need.
//!
//! Rules are evaluated left to right; the first rule that fires forces the
//! recommended investment and its reason is recorded on the recommendation.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::valuation::ValuedHolding;
use crate::domain::UserRecommendation;

/// Why a recommendation was forced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverrideReason {
    /// The user marked the holding Sell or Hold/Wait.
    UserPolicy,
    /// The current price is above the user's price ceiling.
    PriceCeiling,
}

impl OverrideReason {
    /// Stable machine-readable name, same as the serialized form.
    pub fn code(self) -> &'static str {
        match self {
            Self::UserPolicy => "user_policy",
            Self::PriceCeiling => "price_ceiling",
        }
    }
}

impl fmt::Display for OverrideReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UserPolicy => f.write_str("user policy"),
            Self::PriceCeiling => f.write_str("above price ceiling"),
        }
    }
}

/// A pure override: `Some(value)` forces the recommended investment.
#[derive(Clone, Copy)]
pub struct OverrideRule {
    pub reason: OverrideReason,
    pub apply: fn(&ValuedHolding) -> Option<f64>,
}

impl fmt::Debug for OverrideRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OverrideRule")
            .field("reason", &self.reason)
            .finish()
    }
}

fn user_policy(holding: &ValuedHolding) -> Option<f64> {
    match holding.holding.user_recommendation {
        UserRecommendation::Sell | UserRecommendation::Hold => Some(0.0),
        UserRecommendation::Buy => None,
    }
}

fn price_ceiling(holding: &ValuedHolding) -> Option<f64> {
    holding.is_above_ceiling.then_some(0.0)
}

/// The standard rule set: user policy first, then price ceiling.
pub const DEFAULT_RULES: [OverrideRule; 2] = [
    OverrideRule {
        reason: OverrideReason::UserPolicy,
        apply: user_policy,
    },
    OverrideRule {
        reason: OverrideReason::PriceCeiling,
        apply: price_ceiling,
    },
];

/// First rule that fires, if any.
pub fn first_override(
    rules: &[OverrideRule],
    holding: &ValuedHolding,
) -> Option<(OverrideReason, f64)> {
    rules
        .iter()
        .find_map(|rule| (rule.apply)(holding).map(|forced| (rule.reason, forced)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Holding, Ticker};

    fn valued(rec: UserRecommendation, above_ceiling: bool) -> ValuedHolding {
        ValuedHolding {
            holding: Holding::new(Ticker::parse("X").unwrap(), 1.0, 50.0).with_recommendation(rec),
            current_price: 10.0,
            current_value: 10.0,
            current_percentage: 100.0,
            is_above_ceiling: above_ceiling,
            yield_on_cost: None,
        }
    }

    #[test]
    fn buy_below_ceiling_is_untouched() {
        assert_eq!(
            first_override(&DEFAULT_RULES, &valued(UserRecommendation::Buy, false)),
            None
        );
    }

    #[test]
    fn sell_and_hold_force_zero() {
        for rec in [UserRecommendation::Sell, UserRecommendation::Hold] {
            assert_eq!(
                first_override(&DEFAULT_RULES, &valued(rec, false)),
                Some((OverrideReason::UserPolicy, 0.0))
            );
        }
    }

    #[test]
    fn ceiling_forces_zero() {
        assert_eq!(
            first_override(&DEFAULT_RULES, &valued(UserRecommendation::Buy, true)),
            Some((OverrideReason::PriceCeiling, 0.0))
        );
    }

    #[test]
    fn user_policy_wins_when_both_fire() {
        assert_eq!(
            first_override(&DEFAULT_RULES, &valued(UserRecommendation::Sell, true)),
            Some((OverrideReason::UserPolicy, 0.0))
        );
    }

    #[test]
    fn empty_rule_set_never_fires() {
        assert_eq!(first_override(&[], &valued(UserRecommendation::Sell, true)), None);
    }
}
