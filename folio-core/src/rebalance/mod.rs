//! Rebalancing calculator.
//!
//! Three pure steps run in sequence over an immutable snapshot:
//! 1. [`valuation`]: quantity × price → value, allocation, ceiling flag
//! 2. [`recommend`]: split a cash amount toward target allocations
//! 3. [`summary`]: before/after value, change, weighted yield on cost
//!
//! No I/O, no shared state, no errors beyond caller-level validation of the
//! investment amount.

pub mod overrides;
pub mod recommend;
pub mod summary;
pub mod valuation;

pub use overrides::{OverrideReason, OverrideRule, DEFAULT_RULES};
pub use recommend::{recommend, recommend_with_rules, Recommendation};
pub use summary::{summarize, SimulationResult};
pub use valuation::{
    value_portfolio, AllocationRow, Valuation, ValuedHolding, YieldAssumption,
    DEFAULT_ASSUMED_DIVIDEND_YIELD,
};

use crate::domain::{Portfolio, PriceMap};
use crate::validation::{validate_investment_amount, ValidationError};

/// Run valuation → recommendation → summary.
pub fn simulate(
    portfolio: &Portfolio,
    prices: &PriceMap,
    investment_amount: f64,
    yields: &YieldAssumption,
) -> Result<SimulationResult, ValidationError> {
    let amount = validate_investment_amount(investment_amount)?;
    let valuation = value_portfolio(portfolio, prices, yields);
    let recommendations = recommend(&valuation, amount);
    Ok(summarize(&valuation, recommendations, amount))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Holding, Ticker};

    #[test]
    fn rejects_negative_amount_before_running() {
        let portfolio: Portfolio = [Holding::new(Ticker::parse("A").unwrap(), 1.0, 100.0)]
            .into_iter()
            .collect();
        let err = simulate(&portfolio, &PriceMap::new(), -1.0, &YieldAssumption::default());
        assert_eq!(err, Err(ValidationError::NegativeAmount(-1.0)));
    }

    #[test]
    fn empty_portfolio_is_a_valid_simulation() {
        let r = simulate(
            &Portfolio::new(),
            &PriceMap::new(),
            250.0,
            &YieldAssumption::default(),
        )
        .unwrap();
        assert!(r.recommendations.is_empty());
        assert_eq!(r.unallocated_cash, 250.0);
        assert_eq!(r.portfolio_value_after, 250.0);
    }
}
