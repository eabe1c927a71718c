//! Simulation summary — before/after figures for one rebalancing run.

use serde::{Deserialize, Serialize};

use super::recommend::Recommendation;
use super::valuation::Valuation;

/// Result of one what-if rebalancing run. Holds no state between runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub recommendations: Vec<Recommendation>,
    /// Cash contributed by the user.
    pub total_investment: f64,
    /// Sum of the recommended investments (≤ `total_investment`).
    pub allocated_investment: f64,
    /// Cash the calculator left unassigned because every target was met.
    pub unallocated_cash: f64,
    pub portfolio_value_before: f64,
    pub portfolio_value_after: f64,
    pub percentage_change: f64,
    pub has_any_above_ceiling: bool,
    /// Value-weighted average yield on cost, absent when no holding has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_yield_on_cost: Option<f64>,
    /// Yield figures come from an assumed dividend yield, not live data.
    pub yield_is_estimate: bool,
}

/// Aggregate a valuation and its recommendations into a simulation result.
pub fn summarize(
    valuation: &Valuation,
    recommendations: Vec<Recommendation>,
    investment_amount: f64,
) -> SimulationResult {
    let before = valuation.total_value;
    let allocated: f64 = recommendations
        .iter()
        .map(|r| r.recommended_investment)
        .sum();

    // Starting from a zero value is reported as 100%.
    let percentage_change = if before > 0.0 {
        investment_amount / before * 100.0
    } else {
        100.0
    };

    let average_yield_on_cost = weighted_yield_on_cost(valuation);

    SimulationResult {
        has_any_above_ceiling: valuation.iter().any(|v| v.is_above_ceiling),
        recommendations,
        total_investment: investment_amount,
        allocated_investment: allocated,
        unallocated_cash: (investment_amount - allocated).max(0.0),
        portfolio_value_before: before,
        portfolio_value_after: before + investment_amount,
        percentage_change,
        yield_is_estimate: average_yield_on_cost.is_some(),
        average_yield_on_cost,
    }
}

fn weighted_yield_on_cost(valuation: &Valuation) -> Option<f64> {
    let (weighted, weight) = valuation
        .iter()
        .filter(|v| v.current_value > 0.0)
        .filter_map(|v| v.yield_on_cost.map(|y| (y * v.current_value, v.current_value)))
        .fold((0.0, 0.0), |(ws, w), (y, v)| (ws + y, w + v));
    (weight > 0.0).then(|| weighted / weight)
}
