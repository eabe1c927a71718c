//! Watchlist items and target-price alerts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use super::ids::Ticker;
use crate::validation::ValidationError;

/// A ticker the user is watching, with the price they would like to buy at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchItem {
    pub ticker: Ticker,
    pub target_price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub added_at: DateTime<Utc>,
}

impl WatchItem {
    pub fn new(
        ticker: Ticker,
        target_price: f64,
        notes: Option<String>,
        added_at: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        if !target_price.is_finite() || target_price <= 0.0 {
            return Err(ValidationError::InvalidTargetPrice(target_price));
        }
        let notes = notes.map(|n| n.trim().to_string()).filter(|n| !n.is_empty());
        Ok(Self {
            ticker,
            target_price,
            notes,
            added_at,
        })
    }
}

/// Mapping ticker → watch item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Watchlist {
    items: BTreeMap<Ticker, WatchItem>,
}

impl Watchlist {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an item.
    pub fn upsert(&mut self, item: WatchItem) {
        self.items.insert(item.ticker.clone(), item);
    }

    pub fn remove(&mut self, ticker: &Ticker) -> Option<WatchItem> {
        self.items.remove(ticker)
    }

    pub fn get(&self, ticker: &Ticker) -> Option<&WatchItem> {
        self.items.get(ticker)
    }

    pub fn items(&self) -> impl Iterator<Item = &WatchItem> {
        self.items.values()
    }

    pub fn tickers(&self) -> impl Iterator<Item = &Ticker> {
        self.items.keys()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// A watch item whose target price has been reached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceAlert {
    pub ticker: Ticker,
    pub target_price: f64,
    pub current_price: f64,
    /// How far the current price sits below the target, in percent (≥ 0).
    pub below_target_pct: f64,
}

/// Evaluate target-price alerts against a price snapshot.
///
/// An alert fires when a known price (strictly positive) is at or below the
/// target. Unknown prices never fire. Results are ordered by the deepest
/// discount first.
pub fn evaluate_alerts(watchlist: &Watchlist, prices: &HashMap<Ticker, f64>) -> Vec<PriceAlert> {
    let mut alerts: Vec<PriceAlert> = watchlist
        .items()
        .filter_map(|item| {
            let price = prices.get(&item.ticker).copied()?;
            if !price.is_finite() || price <= 0.0 || price > item.target_price {
                return None;
            }
            Some(PriceAlert {
                ticker: item.ticker.clone(),
                target_price: item.target_price,
                current_price: price,
                below_target_pct: (item.target_price - price) / item.target_price * 100.0,
            })
        })
        .collect();

    alerts.sort_by(|a, b| {
        b.below_target_pct
            .total_cmp(&a.below_target_pct)
            .then_with(|| a.ticker.cmp(&b.ticker))
    });
    alerts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> Ticker {
        Ticker::parse(s).unwrap()
    }

    fn item(ticker: &str, target: f64) -> WatchItem {
        WatchItem::new(t(ticker), target, None, Utc::now()).unwrap()
    }

    #[test]
    fn rejects_non_positive_target() {
        assert!(WatchItem::new(t("AAPL"), 0.0, None, Utc::now()).is_err());
        assert!(WatchItem::new(t("AAPL"), f64::NAN, None, Utc::now()).is_err());
    }

    #[test]
    fn blank_notes_are_dropped() {
        let w = WatchItem::new(t("AAPL"), 10.0, Some("   ".into()), Utc::now()).unwrap();
        assert_eq!(w.notes, None);
    }

    #[test]
    fn alert_fires_at_or_below_target() {
        let mut wl = Watchlist::new();
        wl.upsert(item("AAPL", 150.0));
        wl.upsert(item("MSFT", 300.0));
        wl.upsert(item("NVDA", 100.0));

        let prices = HashMap::from([
            (t("AAPL"), 150.0), // exactly at target
            (t("MSFT"), 240.0), // 20% below
            (t("NVDA"), 120.0), // above target
        ]);

        let alerts = evaluate_alerts(&wl, &prices);
        assert_eq!(alerts.len(), 2);
        assert_eq!(alerts[0].ticker, t("MSFT"));
        assert!((alerts[0].below_target_pct - 20.0).abs() < 1e-9);
        assert_eq!(alerts[1].ticker, t("AAPL"));
        assert_eq!(alerts[1].below_target_pct, 0.0);
    }

    #[test]
    fn unknown_or_zero_price_never_fires() {
        let mut wl = Watchlist::new();
        wl.upsert(item("AAPL", 150.0));
        wl.upsert(item("MSFT", 300.0));
        let prices = HashMap::from([(t("AAPL"), 0.0)]);
        assert!(evaluate_alerts(&wl, &prices).is_empty());
    }
}
