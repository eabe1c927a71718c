//! Domain types: holdings, portfolio, watchlist, preferences.

pub mod holding;
pub mod ids;
pub mod portfolio;
pub mod preferences;
pub mod watchlist;

pub use holding::{Holding, HoldingInput, UserRecommendation};
pub use ids::{Ticker, UserId};
pub use portfolio::Portfolio;
pub use preferences::{Preferences, Theme};
pub use watchlist::{evaluate_alerts, PriceAlert, WatchItem, Watchlist};

/// Price snapshot keyed by ticker. A missing entry means "price unavailable".
pub type PriceMap = std::collections::HashMap<Ticker, f64>;
