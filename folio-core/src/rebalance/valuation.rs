//! Valuation — quantity × price → current value and allocation.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::{Holding, Portfolio, PriceMap, Ticker};

/// Default dividend yield assumed by the yield-on-cost estimate.
pub const DEFAULT_ASSUMED_DIVIDEND_YIELD: f64 = 0.02;

/// Assumption behind the display-only yield-on-cost figure.
///
/// There is no dividend feed: yield on cost is estimated as
/// `price × assumed_dividend_yield / average_cost × 100`. Every value derived
/// from it is an estimate. `None` disables the estimate entirely.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct YieldAssumption {
    pub assumed_dividend_yield: Option<f64>,
}

impl Default for YieldAssumption {
    fn default() -> Self {
        Self {
            assumed_dividend_yield: Some(DEFAULT_ASSUMED_DIVIDEND_YIELD),
        }
    }
}

impl YieldAssumption {
    pub fn disabled() -> Self {
        Self {
            assumed_dividend_yield: None,
        }
    }

    /// Estimated yield on cost in percent, if it can be computed.
    pub fn yield_on_cost(&self, current_price: f64, average_cost: Option<f64>) -> Option<f64> {
        let dividend_yield = self
            .assumed_dividend_yield
            .filter(|y| y.is_finite() && *y >= 0.0)?;
        let cost = average_cost.filter(|c| c.is_finite() && *c > 0.0)?;
        if current_price <= 0.0 {
            return None;
        }
        Some(current_price * dividend_yield / cost * 100.0)
    }
}

/// A holding enriched with its market value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuedHolding {
    #[serde(flatten)]
    pub holding: Holding,
    pub current_price: f64,
    pub current_value: f64,
    pub current_percentage: f64,
    pub is_above_ceiling: bool,
    /// Estimated, see [`YieldAssumption`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub yield_on_cost: Option<f64>,
}

impl ValuedHolding {
    pub fn ticker(&self) -> &Ticker {
        &self.holding.ticker
    }
}

/// Output of the valuation step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Valuation {
    pub holdings: BTreeMap<Ticker, ValuedHolding>,
    pub total_value: f64,
}

/// Current vs target allocation for one holding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationRow {
    pub ticker: Ticker,
    pub current_value: f64,
    pub current_percentage: f64,
    pub target_percentage: f64,
    /// `current − target`; negative means under-allocated.
    pub drift: f64,
}

impl Valuation {
    pub fn get(&self, ticker: &Ticker) -> Option<&ValuedHolding> {
        self.holdings.get(ticker)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValuedHolding> {
        self.holdings.values()
    }

    /// Current vs target allocation, most under-allocated first.
    pub fn allocation(&self) -> Vec<AllocationRow> {
        let mut rows: Vec<AllocationRow> = self
            .holdings
            .values()
            .map(|v| AllocationRow {
                ticker: v.holding.ticker.clone(),
                current_value: v.current_value,
                current_percentage: v.current_percentage,
                target_percentage: v.holding.target_percentage,
                drift: v.current_percentage - v.holding.target_percentage,
            })
            .collect();
        rows.sort_by(|a, b| a.drift.total_cmp(&b.drift).then_with(|| a.ticker.cmp(&b.ticker)));
        rows
    }
}

/// Sanitize a quoted price: unknown, non-finite or negative means 0.
fn usable_price(price: Option<f64>) -> f64 {
    match price {
        Some(p) if p.is_finite() && p > 0.0 => p,
        _ => 0.0,
    }
}

/// Value every holding against a price snapshot.
///
/// Two passes: values and the total first, percentages second. A total of 0
/// yields 0% for every holding rather than NaN.
pub fn value_portfolio(
    portfolio: &Portfolio,
    prices: &PriceMap,
    yields: &YieldAssumption,
) -> Valuation {
    let mut holdings = BTreeMap::new();
    let mut total_value = 0.0;

    for holding in portfolio.holdings() {
        let current_price = usable_price(prices.get(&holding.ticker).copied());
        let current_value = holding.quantity * current_price;
        total_value += current_value;

        let is_above_ceiling = holding
            .price_ceiling
            .is_some_and(|ceiling| current_price > ceiling);

        holdings.insert(
            holding.ticker.clone(),
            ValuedHolding {
                holding: holding.clone(),
                current_price,
                current_value,
                current_percentage: 0.0,
                is_above_ceiling,
                yield_on_cost: yields.yield_on_cost(current_price, holding.average_cost),
            },
        );
    }

    if total_value > 0.0 {
        for valued in holdings.values_mut() {
            valued.current_percentage = valued.current_value / total_value * 100.0;
        }
    }

    Valuation {
        holdings,
        total_value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> Ticker {
        Ticker::parse(s).unwrap()
    }

    fn portfolio() -> Portfolio {
        [
            Holding::new(t("VTI"), 10.0, 60.0).with_average_cost(50.0),
            Holding::new(t("BND"), 20.0, 40.0).with_price_ceiling(70.0),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn values_and_percentages() {
        let prices = PriceMap::from([(t("VTI"), 100.0), (t("BND"), 75.0)]);
        let v = value_portfolio(&portfolio(), &prices, &YieldAssumption::default());

        assert_eq!(v.total_value, 2500.0);
        let vti = v.get(&t("VTI")).unwrap();
        assert_eq!(vti.current_value, 1000.0);
        assert!((vti.current_percentage - 40.0).abs() < 1e-9);
        // 100 × 0.02 / 50 × 100 = 4%
        assert!((vti.yield_on_cost.unwrap() - 4.0).abs() < 1e-9);

        let bnd = v.get(&t("BND")).unwrap();
        assert!(bnd.is_above_ceiling);
        assert_eq!(bnd.yield_on_cost, None);
    }

    #[test]
    fn missing_price_is_zero_not_error() {
        let prices = PriceMap::from([(t("VTI"), 100.0)]);
        let v = value_portfolio(&portfolio(), &prices, &YieldAssumption::default());
        let bnd = v.get(&t("BND")).unwrap();
        assert_eq!(bnd.current_price, 0.0);
        assert_eq!(bnd.current_value, 0.0);
        assert!(!bnd.is_above_ceiling);
        assert!((v.get(&t("VTI")).unwrap().current_percentage - 100.0).abs() < 1e-9);
    }

    #[test]
    fn zero_total_gives_zero_percentages() {
        let v = value_portfolio(&portfolio(), &PriceMap::new(), &YieldAssumption::default());
        assert_eq!(v.total_value, 0.0);
        assert!(v.iter().all(|h| h.current_percentage == 0.0));
    }

    #[test]
    fn nan_and_negative_prices_are_unavailable() {
        let prices = PriceMap::from([(t("VTI"), f64::NAN), (t("BND"), -4.0)]);
        let v = value_portfolio(&portfolio(), &prices, &YieldAssumption::default());
        assert!(v.iter().all(|h| h.current_price == 0.0));
    }

    #[test]
    fn disabled_yield_assumption_produces_no_estimate() {
        let prices = PriceMap::from([(t("VTI"), 100.0)]);
        let v = value_portfolio(&portfolio(), &prices, &YieldAssumption::disabled());
        assert!(v.iter().all(|h| h.yield_on_cost.is_none()));
    }

    #[test]
    fn allocation_lists_most_underweight_first() {
        let prices = PriceMap::from([(t("VTI"), 100.0), (t("BND"), 75.0)]);
        let v = value_portfolio(&portfolio(), &prices, &YieldAssumption::default());
        let rows = v.allocation();
        // VTI: 40% vs 60% → −20; BND: 60% vs 40% → +20
        assert_eq!(rows[0].ticker, t("VTI"));
        assert!((rows[0].drift + 20.0).abs() < 1e-9);
        assert!((rows[1].drift - 20.0).abs() < 1e-9);
    }
}
