//! Folio Runner — everything around the calculator that touches the outside world.
//!
//! This crate builds on `folio-core` to provide:
//! - `folio.toml` + environment configuration
//! - Tracing subscriber setup for the binaries
//! - Per-user document store (JSON file or in-memory) with field-path updates
//! - Account repository: portfolio, watchlist and preferences CRUD
//! - JSONL simulation history
//! - Simulation service: parallel price fetch → calculator → optional save
//! - Text-generation advisor client and prompt builder
//! - CSV export

pub mod account;
pub mod advisor;
pub mod config;
pub mod context;
pub mod export;
pub mod history;
pub mod logging;
pub mod quotes;
pub mod session;
pub mod simulation;
pub mod store;

pub use account::{AccountError, AccountRepository};
pub use advisor::{build_prompt, AdvisorError, ChatCompletionClient, TextGenerator};
pub use config::{AppConfig, ConfigError};
pub use context::{AppContext, ContextError};
pub use history::{HistoryError, HistoryStore, SimulationRecord};
pub use session::Session;
pub use simulation::{AllocationView, SimulationError, SimulationOutcome, SimulationService};
pub use store::{DocumentStore, FieldPath, FieldUpdate, JsonFileStore, MemoryStore, StoreError};
