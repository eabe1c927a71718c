//! Recommendation engine — split a cash contribution across holdings.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use super::overrides::{first_override, OverrideReason, OverrideRule, DEFAULT_RULES};
use super::valuation::Valuation;
use crate::domain::{Ticker, UserRecommendation};

/// Suggested investment for one holding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub ticker: Ticker,
    pub current_price: f64,
    pub current_value: f64,
    pub current_percentage: f64,
    pub target_percentage: f64,
    pub user_recommendation: UserRecommendation,
    pub is_above_ceiling: bool,
    pub recommended_investment: f64,
    pub expected_shares: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub override_reason: Option<OverrideReason>,
}

impl Recommendation {
    /// `target − current`; larger means more under-allocated.
    pub fn allocation_gap(&self) -> f64 {
        self.target_percentage - self.current_percentage
    }
}

/// Recommend with the standard override rules.
pub fn recommend(valuation: &Valuation, investment_amount: f64) -> Vec<Recommendation> {
    recommend_with_rules(valuation, investment_amount, &DEFAULT_RULES)
}

/// Recommend with an explicit override rule list.
///
/// `investment_amount` must already be validated (finite, ≥ 0). The sum of
/// the returned investments never exceeds it; selling is never recommended.
pub fn recommend_with_rules(
    valuation: &Valuation,
    investment_amount: f64,
    rules: &[OverrideRule],
) -> Vec<Recommendation> {
    let amount = investment_amount.max(0.0);
    let projected_total = valuation.total_value + amount;

    let mut recs: Vec<Recommendation> = valuation
        .iter()
        .map(|valued| {
            let target_value_after = valued.holding.target_percentage / 100.0 * projected_total;
            let raw_need = target_value_after - valued.current_value;
            let mut recommended = raw_need.max(0.0);

            let forced = first_override(rules, valued);
            if let Some((_, value)) = forced {
                recommended = value.max(0.0);
            }

            Recommendation {
                ticker: valued.holding.ticker.clone(),
                current_price: valued.current_price,
                current_value: valued.current_value,
                current_percentage: valued.current_percentage,
                target_percentage: valued.holding.target_percentage,
                user_recommendation: valued.holding.user_recommendation,
                is_above_ceiling: valued.is_above_ceiling,
                recommended_investment: recommended,
                expected_shares: 0.0,
                override_reason: forced.map(|(reason, _)| reason),
            }
        })
        .collect();

    scale_to_budget(&mut recs, amount);

    for rec in &mut recs {
        rec.expected_shares = if rec.current_price > 0.0 {
            rec.recommended_investment / rec.current_price
        } else {
            0.0
        };
    }

    recs.sort_by(priority_order);
    recs
}

/// Shrink every recommendation by one shared factor when demand exceeds cash.
fn scale_to_budget(recs: &mut [Recommendation], amount: f64) {
    let total_recommended: f64 = recs.iter().map(|r| r.recommended_investment).sum();
    if total_recommended <= 0.0 || total_recommended <= amount {
        return;
    }
    let factor = amount / total_recommended;
    for rec in recs.iter_mut() {
        rec.recommended_investment *= factor;
    }
}

/// Display order: above-ceiling last, Buy before the rest, then most
/// under-allocated first.
fn priority_order(a: &Recommendation, b: &Recommendation) -> Ordering {
    a.is_above_ceiling
        .cmp(&b.is_above_ceiling)
        .then_with(|| {
            b.user_recommendation
                .is_buy()
                .cmp(&a.user_recommendation.is_buy())
        })
        .then_with(|| b.allocation_gap().total_cmp(&a.allocation_gap()))
        .then_with(|| a.ticker.cmp(&b.ticker))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Holding, Portfolio, PriceMap};
    use crate::rebalance::valuation::{value_portfolio, YieldAssumption};

    fn t(s: &str) -> Ticker {
        Ticker::parse(s).unwrap()
    }

    fn valuation(holdings: Vec<Holding>, prices: &[(&str, f64)]) -> Valuation {
        let portfolio: Portfolio = holdings.into_iter().collect();
        let prices: PriceMap = prices.iter().map(|(s, p)| (t(s), *p)).collect();
        value_portfolio(&portfolio, &prices, &YieldAssumption::disabled())
    }

    fn by_ticker<'a>(recs: &'a [Recommendation], s: &str) -> &'a Recommendation {
        recs.iter().find(|r| r.ticker.as_str() == s).unwrap()
    }

    #[test]
    fn scale_down_preserves_ratios() {
        // Targets sum past 100: projected 200 → A needs 150, B needs 50,
        // total 200 > 100 → halve.
        let v = valuation(
            vec![
                Holding::new(t("A"), 0.0, 75.0),
                Holding::new(t("B"), 10.0, 75.0),
            ],
            &[("A", 10.0), ("B", 10.0)],
        );
        let recs = recommend(&v, 100.0);
        let a = by_ticker(&recs, "A").recommended_investment;
        let b = by_ticker(&recs, "B").recommended_investment;
        assert!((a - 75.0).abs() < 1e-9);
        assert!((b - 25.0).abs() < 1e-9);
        assert!((a + b - 100.0).abs() < 1e-9);
    }

    #[test]
    fn overweight_holding_gets_nothing() {
        let v = valuation(
            vec![
                Holding::new(t("A"), 90.0, 50.0),
                Holding::new(t("B"), 10.0, 50.0),
            ],
            &[("A", 10.0), ("B", 10.0)],
        );
        let recs = recommend(&v, 100.0);
        // projected 1100 → target 550 each; A holds 900 → 0; B needs 450 → scaled to 100
        assert_eq!(by_ticker(&recs, "A").recommended_investment, 0.0);
        assert!((by_ticker(&recs, "B").recommended_investment - 100.0).abs() < 1e-9);
    }

    #[test]
    fn zero_amount_recommends_nothing() {
        let v = valuation(
            vec![Holding::new(t("A"), 1.0, 100.0), Holding::new(t("B"), 10.0, 0.0)],
            &[("A", 10.0), ("B", 10.0)],
        );
        let recs = recommend(&v, 0.0);
        assert!(recs.iter().all(|r| r.recommended_investment == 0.0));
    }

    #[test]
    fn zero_price_has_zero_shares() {
        let v = valuation(vec![Holding::new(t("A"), 5.0, 100.0)], &[]);
        let recs = recommend(&v, 100.0);
        assert_eq!(recs[0].recommended_investment, 100.0);
        assert_eq!(recs[0].expected_shares, 0.0);
    }

    #[test]
    fn expected_shares_follow_price() {
        let v = valuation(vec![Holding::new(t("A"), 0.0, 100.0)], &[("A", 25.0)]);
        let recs = recommend(&v, 100.0);
        assert!((recs[0].expected_shares - 4.0).abs() < 1e-9);
    }

    #[test]
    fn override_reason_is_recorded() {
        let v = valuation(
            vec![
                Holding::new(t("A"), 1.0, 50.0).with_recommendation(UserRecommendation::Hold),
                Holding::new(t("B"), 1.0, 50.0).with_price_ceiling(5.0),
            ],
            &[("A", 10.0), ("B", 10.0)],
        );
        let recs = recommend(&v, 100.0);
        assert_eq!(
            by_ticker(&recs, "A").override_reason,
            Some(OverrideReason::UserPolicy)
        );
        assert_eq!(
            by_ticker(&recs, "B").override_reason,
            Some(OverrideReason::PriceCeiling)
        );
        assert!(recs.iter().all(|r| r.recommended_investment == 0.0));
    }

    #[test]
    fn priority_order_puts_ceiling_last_and_buy_first() {
        let v = valuation(
            vec![
                Holding::new(t("CEIL"), 1.0, 90.0).with_price_ceiling(1.0),
                Holding::new(t("HOLD"), 1.0, 80.0).with_recommendation(UserRecommendation::Hold),
                Holding::new(t("SMALL"), 1.0, 10.0),
                Holding::new(t("BIG"), 1.0, 40.0),
            ],
            &[("CEIL", 10.0), ("HOLD", 10.0), ("SMALL", 10.0), ("BIG", 10.0)],
        );
        let recs = recommend(&v, 100.0);
        let order: Vec<&str> = recs.iter().map(|r| r.ticker.as_str()).collect();
        // Each holding is 25% current. Buy first by gap: BIG (+15), SMALL (−15);
        // then non-Buy HOLD; above-ceiling CEIL last despite the largest gap.
        assert_eq!(order, vec!["BIG", "SMALL", "HOLD", "CEIL"]);
    }

    #[test]
    fn custom_rules_can_disable_overrides() {
        let v = valuation(
            vec![Holding::new(t("A"), 0.0, 100.0).with_recommendation(UserRecommendation::Sell)],
            &[("A", 10.0)],
        );
        let recs = recommend_with_rules(&v, 100.0, &[]);
        assert_eq!(recs[0].recommended_investment, 100.0);
        assert_eq!(recs[0].override_reason, None);
    }
}
