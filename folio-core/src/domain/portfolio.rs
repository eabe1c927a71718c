//! Portfolio — the user's holdings keyed by ticker.

use super::holding::Holding;
use super::ids::Ticker;
use crate::validation::ValidationError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Mapping ticker → holding.
///
/// Keys are unique and iteration order is irrelevant to every calculation; the
/// ordered map only makes output and serialization deterministic. Target
/// percentages are not required to sum to 100.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Portfolio {
    holdings: BTreeMap<Ticker, Holding>,
}

impl Portfolio {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a new holding. Fails if the ticker is already present.
    pub fn add(&mut self, holding: Holding) -> Result<(), ValidationError> {
        if self.holdings.contains_key(&holding.ticker) {
            return Err(ValidationError::DuplicateHolding(holding.ticker.to_string()));
        }
        self.holdings.insert(holding.ticker.clone(), holding);
        Ok(())
    }

    /// Replace an existing holding. Fails if the ticker is unknown.
    pub fn update(&mut self, holding: Holding) -> Result<(), ValidationError> {
        match self.holdings.get_mut(&holding.ticker) {
            Some(slot) => {
                *slot = holding;
                Ok(())
            }
            None => Err(ValidationError::UnknownHolding(holding.ticker.to_string())),
        }
    }

    /// Insert or replace without checks. Used when rebuilding from storage.
    pub fn upsert(&mut self, holding: Holding) {
        self.holdings.insert(holding.ticker.clone(), holding);
    }

    pub fn remove(&mut self, ticker: &Ticker) -> Option<Holding> {
        self.holdings.remove(ticker)
    }

    pub fn get(&self, ticker: &Ticker) -> Option<&Holding> {
        self.holdings.get(ticker)
    }

    pub fn contains(&self, ticker: &Ticker) -> bool {
        self.holdings.contains_key(ticker)
    }

    pub fn len(&self) -> usize {
        self.holdings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.holdings.is_empty()
    }

    pub fn holdings(&self) -> impl Iterator<Item = &Holding> {
        self.holdings.values()
    }

    pub fn tickers(&self) -> impl Iterator<Item = &Ticker> {
        self.holdings.keys()
    }

    /// Sum of all target percentages. Informational only.
    pub fn target_total(&self) -> f64 {
        self.holdings.values().map(|h| h.target_percentage).sum()
    }
}

impl FromIterator<Holding> for Portfolio {
    fn from_iter<I: IntoIterator<Item = Holding>>(iter: I) -> Self {
        let mut portfolio = Portfolio::new();
        for holding in iter {
            portfolio.upsert(holding);
        }
        portfolio
    }
}
