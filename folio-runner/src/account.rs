//! Account data: portfolio, watchlist and preferences for the signed-in user.
//!
//! Reads deserialize each entry on its own, so one malformed holding is
//! skipped (and logged) instead of hiding the whole portfolio. Writes are
//! single field-path updates. With no signed-in user, reads are empty and
//! writes return `Ok(false)`.

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

use folio_core::domain::{Holding, Portfolio, Preferences, Ticker, UserId, WatchItem, Watchlist};
use folio_core::ValidationError;

use crate::session::Session;
use crate::store::{DocumentStore, FieldPath, FieldUpdate, StoreError};

const PORTFOLIO: &str = "portfolio";
const WATCHLIST: &str = "watchlist";
const PREFERENCES: &str = "preferences";

/// Errors from account operations.
#[derive(Debug, Error)]
pub enum AccountError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Storage failed; the operation can be retried as-is.
    #[error("could not access saved data, please try again ({0})")]
    Storage(#[from] StoreError),
}

impl AccountError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage(_))
    }
}

#[derive(Clone)]
pub struct AccountRepository {
    store: Arc<dyn DocumentStore>,
}

impl AccountRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    // ── Portfolio ────────────────────────────────────────────────────

    pub fn portfolio(&self, session: &Session) -> Result<Portfolio, AccountError> {
        let Some(doc) = self.document(session)? else {
            return Ok(Portfolio::new());
        };
        Ok(typed_entries::<Holding>(&doc, PORTFOLIO)
            .filter(|(key, holding)| {
                let matches = holding.ticker.as_str() == key.as_str();
                if !matches {
                    tracing::warn!(key = %key, ticker = %holding.ticker, "holding key does not match its ticker, skipping");
                }
                matches
            })
            .map(|(_, holding)| holding)
            .collect())
    }

    /// Add a holding. Fails with `DuplicateHolding` if the ticker exists.
    pub fn add_holding(&self, session: &Session, holding: Holding) -> Result<bool, AccountError> {
        let Some(user) = session.user() else {
            return Ok(false);
        };
        let mut portfolio = self.portfolio(session)?;
        portfolio.add(holding.clone())?;
        self.set(user, [PORTFOLIO, holding.ticker.as_str()], &holding)?;
        tracing::info!(user = %user, ticker = %holding.ticker, "holding added");
        Ok(true)
    }

    /// Replace a holding. Fails with `UnknownHolding` if the ticker is absent.
    pub fn update_holding(&self, session: &Session, holding: Holding) -> Result<bool, AccountError> {
        let Some(user) = session.user() else {
            return Ok(false);
        };
        let mut portfolio = self.portfolio(session)?;
        portfolio.update(holding.clone())?;
        self.set(user, [PORTFOLIO, holding.ticker.as_str()], &holding)?;
        tracing::info!(user = %user, ticker = %holding.ticker, "holding updated");
        Ok(true)
    }

    pub fn remove_holding(&self, session: &Session, ticker: &Ticker) -> Result<bool, AccountError> {
        let Some(user) = session.user() else {
            return Ok(false);
        };
        if !self.portfolio(session)?.contains(ticker) {
            return Err(ValidationError::UnknownHolding(ticker.to_string()).into());
        }
        self.delete(user, [PORTFOLIO, ticker.as_str()])?;
        tracing::info!(user = %user, %ticker, "holding removed");
        Ok(true)
    }

    // ── Watchlist ────────────────────────────────────────────────────

    pub fn watchlist(&self, session: &Session) -> Result<Watchlist, AccountError> {
        let Some(doc) = self.document(session)? else {
            return Ok(Watchlist::new());
        };
        let mut watchlist = Watchlist::new();
        for (_, item) in typed_entries::<WatchItem>(&doc, WATCHLIST) {
            watchlist.upsert(item);
        }
        Ok(watchlist)
    }

    /// Add or replace a watchlist item.
    pub fn upsert_watch_item(&self, session: &Session, item: WatchItem) -> Result<bool, AccountError> {
        let Some(user) = session.user() else {
            return Ok(false);
        };
        self.set(user, [WATCHLIST, item.ticker.as_str()], &item)?;
        tracing::info!(user = %user, ticker = %item.ticker, target = item.target_price, "watchlist item saved");
        Ok(true)
    }

    /// Remove a watchlist item. Removing an absent ticker is a no-op.
    pub fn remove_watch_item(&self, session: &Session, ticker: &Ticker) -> Result<bool, AccountError> {
        let Some(user) = session.user() else {
            return Ok(false);
        };
        self.delete(user, [WATCHLIST, ticker.as_str()])?;
        Ok(true)
    }

    // ── Preferences ──────────────────────────────────────────────────

    /// Stored preferences, or defaults if none or unreadable.
    pub fn preferences(&self, session: &Session) -> Result<Preferences, AccountError> {
        let Some(doc) = self.document(session)? else {
            return Ok(Preferences::default());
        };
        Ok(doc
            .get(PREFERENCES)
            .cloned()
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or_default())
    }

    pub fn save_preferences(&self, session: &Session, prefs: &Preferences) -> Result<bool, AccountError> {
        let Some(user) = session.user() else {
            return Ok(false);
        };
        self.set(user, [PREFERENCES], prefs)?;
        Ok(true)
    }

    // ── Store access ─────────────────────────────────────────────────

    fn document(&self, session: &Session) -> Result<Option<Value>, AccountError> {
        let Some(user) = session.user() else {
            return Ok(None);
        };
        self.store.load(user).map_err(|e| storage_failure(user, "load", e))
    }

    fn set<const N: usize, T: serde::Serialize>(
        &self,
        user: &UserId,
        path: [&str; N],
        value: &T,
    ) -> Result<(), AccountError> {
        let value = serde_json::to_value(value).map_err(StoreError::from)?;
        self.write(user, FieldPath::new(path), FieldUpdate::Set(value))
    }

    fn delete<const N: usize>(&self, user: &UserId, path: [&str; N]) -> Result<(), AccountError> {
        self.write(user, FieldPath::new(path), FieldUpdate::Delete)
    }

    fn write(&self, user: &UserId, path: FieldPath, update: FieldUpdate) -> Result<(), AccountError> {
        self.store
            .update(user, &[(path, update)])
            .map_err(|e| storage_failure(user, "update", e))
    }
}

fn storage_failure(user: &UserId, op: &str, e: StoreError) -> AccountError {
    tracing::error!(user = %user, op, error = %e, "document store failure");
    AccountError::Storage(e)
}

/// Entries of the object at `doc[field]` that deserialize as `T`.
fn typed_entries<'a, T: DeserializeOwned + 'a>(
    doc: &'a Value,
    field: &'a str,
) -> impl Iterator<Item = (&'a String, T)> + 'a {
    doc.get(field)
        .and_then(Value::as_object)
        .into_iter()
        .flatten()
        .filter_map(move |(key, raw)| match serde_json::from_value::<T>(raw.clone()) {
            Ok(entry) => Some((key, entry)),
            Err(e) => {
                tracing::warn!(section = field, key = %key, error = %e, "skipping malformed entry");
                None
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use chrono::Utc;
    use folio_core::domain::{Theme, UserRecommendation};
    use serde_json::json;

    fn t(s: &str) -> Ticker {
        Ticker::parse(s).unwrap()
    }

    fn repo() -> (AccountRepository, Arc<MemoryStore>, Session) {
        let store = Arc::new(MemoryStore::new());
        let session = Session::signed_in(UserId::parse("erin").unwrap());
        (AccountRepository::new(store.clone()), store, session)
    }

    #[test]
    fn add_update_remove_holding() {
        let (repo, _, session) = repo();
        assert!(repo
            .add_holding(&session, Holding::new(t("VTI"), 10.0, 60.0))
            .unwrap());
        assert!(repo
            .update_holding(
                &session,
                Holding::new(t("VTI"), 12.0, 60.0).with_recommendation(UserRecommendation::Hold)
            )
            .unwrap());

        let portfolio = repo.portfolio(&session).unwrap();
        assert_eq!(portfolio.get(&t("VTI")).unwrap().quantity, 12.0);

        assert!(repo.remove_holding(&session, &t("VTI")).unwrap());
        assert!(repo.portfolio(&session).unwrap().is_empty());
    }

    #[test]
    fn duplicate_and_unknown_holdings_are_validation_errors() {
        let (repo, _, session) = repo();
        repo.add_holding(&session, Holding::new(t("VTI"), 1.0, 50.0)).unwrap();

        let dup = repo.add_holding(&session, Holding::new(t("VTI"), 2.0, 50.0));
        assert!(matches!(dup, Err(AccountError::Validation(ValidationError::DuplicateHolding(_)))));

        let unknown = repo.update_holding(&session, Holding::new(t("BND"), 2.0, 50.0));
        assert!(matches!(unknown, Err(AccountError::Validation(ValidationError::UnknownHolding(_)))));

        let gone = repo.remove_holding(&session, &t("BND")).unwrap_err();
        assert!(!gone.is_retryable());
    }

    #[test]
    fn anonymous_session_reads_empty_and_writes_nothing() {
        let (repo, store, _) = repo();
        let anon = Session::anonymous();

        assert!(repo.portfolio(&anon).unwrap().is_empty());
        assert!(!repo.add_holding(&anon, Holding::new(t("VTI"), 1.0, 50.0)).unwrap());
        assert!(!repo
            .save_preferences(&anon, &Preferences { theme: Theme::Dark })
            .unwrap());
        assert_eq!(repo.preferences(&anon).unwrap(), Preferences::default());
        assert_eq!(store.load(&UserId::parse("erin").unwrap()).unwrap(), None);
    }

    #[test]
    fn malformed_holding_is_skipped_not_fatal() {
        let (repo, store, session) = repo();
        let user = session.user().unwrap().clone();
        store
            .update(
                &user,
                &[
                    (
                        FieldPath::new(["portfolio", "AAPL"]),
                        FieldUpdate::Set(json!({"ticker": "AAPL", "quantity": 1.0, "target_percentage": 40.0})),
                    ),
                    (
                        FieldPath::new(["portfolio", "JUNK"]),
                        FieldUpdate::Set(json!({"quantity": "many"})),
                    ),
                ],
            )
            .unwrap();

        let portfolio = repo.portfolio(&session).unwrap();
        assert_eq!(portfolio.len(), 1);
        assert!(portfolio.contains(&t("AAPL")));
    }

    #[test]
    fn watchlist_and_preferences_roundtrip() {
        let (repo, _, session) = repo();
        let item = WatchItem::new(t("NVDA"), 100.0, Some("on dip".into()), Utc::now()).unwrap();
        repo.upsert_watch_item(&session, item.clone()).unwrap();
        assert_eq!(repo.watchlist(&session).unwrap().get(&t("NVDA")), Some(&item));

        repo.remove_watch_item(&session, &t("NVDA")).unwrap();
        assert!(repo.watchlist(&session).unwrap().is_empty());

        repo.save_preferences(&session, &Preferences { theme: Theme::Dark })
            .unwrap();
        assert_eq!(repo.preferences(&session).unwrap().theme, Theme::Dark);
    }

    #[test]
    fn writes_touch_only_their_field() {
        let (repo, store, session) = repo();
        repo.add_holding(&session, Holding::new(t("VTI"), 1.0, 50.0)).unwrap();
        repo.save_preferences(&session, &Preferences { theme: Theme::Dark })
            .unwrap();
        repo.add_holding(&session, Holding::new(t("BND"), 1.0, 50.0)).unwrap();

        let doc = store.load(session.user().unwrap()).unwrap().unwrap();
        assert_eq!(doc["preferences"]["theme"], "dark");
        assert_eq!(doc["portfolio"].as_object().unwrap().len(), 2);
    }
}
