//! Service wiring shared by the CLI and the HTTP server.

use std::sync::Arc;
use thiserror::Error;

use folio_core::data::{QuoteError, QuoteSource};

use crate::account::AccountRepository;
use crate::advisor::{AdvisorError, ChatCompletionClient, TextGenerator};
use crate::config::AppConfig;
use crate::history::HistoryStore;
use crate::quotes::build_quote_chain;
use crate::simulation::SimulationService;
use crate::store::{DocumentStore, JsonFileStore};

#[derive(Debug, Error)]
pub enum ContextError {
    #[error("quote providers: {0}")]
    Quotes(#[from] QuoteError),
    #[error("advisor: {0}")]
    Advisor(#[from] AdvisorError),
}

/// Every long-lived service, built once from configuration.
#[derive(Clone)]
pub struct AppContext {
    pub config: AppConfig,
    pub quotes: Arc<dyn QuoteSource>,
    pub accounts: AccountRepository,
    pub simulations: SimulationService,
    pub advisor: Arc<dyn TextGenerator>,
}

impl AppContext {
    pub fn build(config: AppConfig) -> Result<Self, ContextError> {
        let quotes: Arc<dyn QuoteSource> = Arc::new(build_quote_chain(&config)?);
        let store: Arc<dyn DocumentStore> = Arc::new(JsonFileStore::new(config.users_dir()));
        let accounts = AccountRepository::new(store);
        let history = HistoryStore::new(config.history_dir());
        let simulations = SimulationService::new(
            accounts.clone(),
            history,
            quotes.clone(),
            config.quotes.placeholder_price,
            config.valuation.yield_assumption(),
        );
        let advisor: Arc<dyn TextGenerator> = Arc::new(ChatCompletionClient::new(&config.advisor)?);

        tracing::debug!(data_dir = %config.data_dir.display(), "application context built");
        Ok(Self {
            config,
            quotes,
            accounts,
            simulations,
            advisor,
        })
    }
}
