//! Simulation service: wires account data and quotes into the calculator.
//!
//! ```text
//! session ─► AccountRepository ─► Portfolio ─┐
//!                                            ├─► simulate() ─► SimulationResult
//! QuoteSource ─► fetch_prices (parallel) ────┘
//! ```

use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;

use folio_core::data::{fetch_prices, PriceSnapshot, QuoteError, QuoteSource};
use folio_core::domain::{evaluate_alerts, Portfolio, PriceAlert, Ticker};
use folio_core::rebalance::{simulate, value_portfolio, AllocationRow, SimulationResult, YieldAssumption};
use folio_core::ValidationError;

use crate::account::{AccountError, AccountRepository};
use crate::history::{HistoryError, HistoryStore, SimulationRecord};
use crate::session::Session;

#[derive(Debug, Error)]
pub enum SimulationError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Account(#[from] AccountError),

    /// Saving failed; the simulation itself is still valid and can be re-saved.
    #[error("could not save simulation, please try again ({0})")]
    History(#[from] HistoryError),
}

impl SimulationError {
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Validation(_) => false,
            Self::Account(e) => e.is_retryable(),
            Self::History(_) => true,
        }
    }
}

/// A calculator run plus the quote problems behind it.
#[derive(Debug, Clone)]
pub struct SimulationOutcome {
    pub result: SimulationResult,
    /// Tickers priced with the placeholder, and why.
    pub quote_failures: Vec<(Ticker, QuoteError)>,
}

/// Current vs target allocation for display.
#[derive(Debug, Clone)]
pub struct AllocationView {
    pub rows: Vec<AllocationRow>,
    pub total_value: f64,
    /// Sum of targets; informational only, it need not be 100.
    pub target_total: f64,
    pub quote_failures: Vec<(Ticker, QuoteError)>,
}

#[derive(Clone)]
pub struct SimulationService {
    accounts: AccountRepository,
    history: HistoryStore,
    quotes: Arc<dyn QuoteSource>,
    placeholder_price: f64,
    yields: YieldAssumption,
}

impl SimulationService {
    pub fn new(
        accounts: AccountRepository,
        history: HistoryStore,
        quotes: Arc<dyn QuoteSource>,
        placeholder_price: f64,
        yields: YieldAssumption,
    ) -> Self {
        Self {
            accounts,
            history,
            quotes,
            placeholder_price,
            yields,
        }
    }

    pub fn accounts(&self) -> &AccountRepository {
        &self.accounts
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    /// Quote `tickers` on the rayon pool.
    pub fn price_snapshot<'a, I>(&self, tickers: I) -> PriceSnapshot
    where
        I: IntoIterator<Item = &'a Ticker>,
    {
        let tickers: Vec<Ticker> = tickers.into_iter().cloned().collect();
        fetch_prices(self.quotes.as_ref(), &tickers, self.placeholder_price)
    }

    /// Run a what-if contribution of `amount` against the user's portfolio.
    pub fn run(&self, session: &Session, amount: f64) -> Result<SimulationOutcome, SimulationError> {
        let portfolio = self.accounts.portfolio(session)?;
        self.run_for(&portfolio, amount)
    }

    /// Same as [`run`](Self::run) for an explicit portfolio.
    pub fn run_for(&self, portfolio: &Portfolio, amount: f64) -> Result<SimulationOutcome, SimulationError> {
        let snapshot = self.price_snapshot(portfolio.tickers());
        let result = simulate(portfolio, &snapshot.prices, amount, &self.yields)?;
        tracing::info!(
            holdings = portfolio.len(),
            amount,
            allocated = result.allocated_investment,
            placeholder_prices = snapshot.failures.len(),
            "simulation complete"
        );
        Ok(SimulationOutcome {
            result,
            quote_failures: snapshot.failures,
        })
    }

    /// Persist an outcome to the user's history. `None` for anonymous sessions.
    pub fn save(
        &self,
        session: &Session,
        outcome: &SimulationOutcome,
    ) -> Result<Option<SimulationRecord>, SimulationError> {
        let record = SimulationRecord::from_result(&outcome.result, Utc::now())?;
        let written = self.history.append(session, &record).map_err(|e| {
            tracing::error!(error = %e, "failed to save simulation");
            e
        })?;
        Ok(written.then_some(record))
    }

    pub fn allocation(&self, session: &Session) -> Result<AllocationView, SimulationError> {
        let portfolio = self.accounts.portfolio(session)?;
        let snapshot = self.price_snapshot(portfolio.tickers());
        let valuation = value_portfolio(&portfolio, &snapshot.prices, &self.yields);
        Ok(AllocationView {
            rows: valuation.allocation(),
            total_value: valuation.total_value,
            target_total: portfolio.target_total(),
            quote_failures: snapshot.failures,
        })
    }

    /// Watchlist items whose price is at or below target.
    pub fn watchlist_alerts(&self, session: &Session) -> Result<Vec<PriceAlert>, SimulationError> {
        let watchlist = self.accounts.watchlist(session)?;
        let snapshot = self.price_snapshot(watchlist.tickers());
        Ok(evaluate_alerts(&watchlist, &snapshot.prices))
    }
}
