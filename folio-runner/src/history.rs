//! Simulation history: JSONL append-only persistence, one file per user.
//!
//! Each saved simulation is one immutable JSON object per line in
//! `<dir>/<user_id>.jsonl`. Appending never rewrites earlier lines, which
//! keeps the format resilient to partial writes. Reads return newest first
//! and skip malformed lines.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

use folio_core::domain::UserId;
use folio_core::rebalance::{Recommendation, SimulationResult};

use crate::session::Session;

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("history I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to serialize history record: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// One saved simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationRecord {
    /// Content hash (BLAKE3, 16 hex chars) of the record body.
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub investment_amount: f64,
    pub portfolio_value_before: f64,
    pub portfolio_value_after: f64,
    pub percentage_change: f64,
    pub allocated_investment: f64,
    pub recommendations: Vec<Recommendation>,
}

impl SimulationRecord {
    pub fn from_result(result: &SimulationResult, created_at: DateTime<Utc>) -> Result<Self, HistoryError> {
        let mut record = Self {
            id: String::new(),
            created_at,
            investment_amount: result.total_investment,
            portfolio_value_before: result.portfolio_value_before,
            portfolio_value_after: result.portfolio_value_after,
            percentage_change: result.percentage_change,
            allocated_investment: result.allocated_investment,
            recommendations: result.recommendations.clone(),
        };
        record.id = record.content_id()?;
        Ok(record)
    }

    /// Deterministic id over everything but the id itself.
    fn content_id(&self) -> Result<String, HistoryError> {
        let body = serde_json::to_string(&(
            &self.created_at,
            self.investment_amount,
            self.portfolio_value_before,
            &self.recommendations,
        ))?;
        let hash = blake3::hash(body.as_bytes());
        Ok(hash.to_hex()[..16].to_string())
    }
}

/// JSONL history files under one directory.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    dir: PathBuf,
}

impl HistoryStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, user: &UserId) -> PathBuf {
        self.dir.join(format!("{}.jsonl", user.as_str()))
    }

    /// Append a record for the signed-in user.
    ///
    /// Returns `Ok(true)` if written, `Ok(false)` for an anonymous session.
    pub fn append(&self, session: &Session, record: &SimulationRecord) -> Result<bool, HistoryError> {
        let Some(user) = session.user() else {
            return Ok(false);
        };
        let path = self.path_for(user);
        let io_err = |source| HistoryError::Io {
            path: path.clone(),
            source,
        };

        let json = serde_json::to_string(record)?;
        fs::create_dir_all(&self.dir).map_err(io_err)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(io_err)?;
        writeln!(file, "{json}").map_err(io_err)?;
        file.flush().map_err(io_err)?;

        tracing::info!(user = %user, id = %record.id, amount = record.investment_amount, "simulation saved to history");
        Ok(true)
    }

    /// All records for the signed-in user, newest first.
    ///
    /// Skips malformed lines (logged but not fatal).
    pub fn read_all(&self, session: &Session) -> Result<Vec<SimulationRecord>, HistoryError> {
        let Some(user) = session.user() else {
            return Ok(Vec::new());
        };
        let path = self.path_for(user);
        let io_err = |source| HistoryError::Io {
            path: path.clone(),
            source,
        };

        let file = match fs::File::open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_err(e)),
        };

        let mut records = Vec::new();
        for (line_no, line) in io::BufReader::new(file).lines().enumerate() {
            let line = line.map_err(io_err)?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<SimulationRecord>(&line) {
                Ok(record) => records.push(record),
                Err(e) => {
                    tracing::warn!(path = %path.display(), line = line_no + 1, error = %e, "skipping malformed history line")
                }
            }
        }

        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }

    /// Look up one record by id (or unique id prefix).
    pub fn find(&self, session: &Session, id: &str) -> Result<Option<SimulationRecord>, HistoryError> {
        let mut matches = self
            .read_all(session)?
            .into_iter()
            .filter(|r| r.id.starts_with(id));
        let first = matches.next();
        Ok(if matches.next().is_some() { None } else { first })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tempfile::TempDir;

    fn result(amount: f64) -> SimulationResult {
        SimulationResult {
            recommendations: Vec::new(),
            total_investment: amount,
            allocated_investment: 0.0,
            unallocated_cash: amount,
            portfolio_value_before: 1000.0,
            portfolio_value_after: 1000.0 + amount,
            percentage_change: amount / 10.0,
            has_any_above_ceiling: false,
            average_yield_on_cost: None,
            yield_is_estimate: false,
        }
    }

    fn session() -> Session {
        Session::signed_in(UserId::parse("frank").unwrap())
    }

    #[test]
    fn read_returns_newest_first() {
        let dir = TempDir::new().unwrap();
        let store = HistoryStore::new(dir.path());
        let t0 = Utc::now();

        for (i, offset) in [2, 0, 1].into_iter().enumerate() {
            let record =
                SimulationRecord::from_result(&result(100.0 * (i + 1) as f64), t0 + Duration::minutes(offset))
                    .unwrap();
            assert!(store.append(&session(), &record).unwrap());
        }

        let records = store.read_all(&session()).unwrap();
        assert_eq!(records.len(), 3);
        assert!(records.windows(2).all(|w| w[0].created_at >= w[1].created_at));
        assert_eq!(records[0].investment_amount, 100.0);
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let dir = TempDir::new().unwrap();
        let store = HistoryStore::new(dir.path());
        let record = SimulationRecord::from_result(&result(50.0), Utc::now()).unwrap();
        store.append(&session(), &record).unwrap();

        let path = store.path_for(session().user().unwrap());
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        writeln!(file, "{{ truncated").unwrap();
        writeln!(file).unwrap();

        let records = store.read_all(&session()).unwrap();
        assert_eq!(records, vec![record]);
    }

    #[test]
    fn anonymous_session_has_no_history() {
        let dir = TempDir::new().unwrap();
        let store = HistoryStore::new(dir.path());
        let record = SimulationRecord::from_result(&result(50.0), Utc::now()).unwrap();
        assert!(!store.append(&Session::anonymous(), &record).unwrap());
        assert!(store.read_all(&Session::anonymous()).unwrap().is_empty());
        assert!(!dir.path().join("frank.jsonl").exists());
    }

    #[test]
    fn ids_are_stable_and_distinct() {
        let t0 = Utc::now();
        let a = SimulationRecord::from_result(&result(50.0), t0).unwrap();
        let b = SimulationRecord::from_result(&result(50.0), t0).unwrap();
        let c = SimulationRecord::from_result(&result(60.0), t0).unwrap();
        assert_eq!(a.id, b.id);
        assert_ne!(a.id, c.id);
        assert_eq!(a.id.len(), 16);
    }

    #[test]
    fn find_by_prefix() {
        let dir = TempDir::new().unwrap();
        let store = HistoryStore::new(dir.path());
        let record = SimulationRecord::from_result(&result(75.0), Utc::now()).unwrap();
        store.append(&session(), &record).unwrap();

        let found = store.find(&session(), &record.id[..6]).unwrap();
        assert_eq!(found.map(|r| r.id), Some(record.id.clone()));
        assert_eq!(store.find(&session(), "zzzz").unwrap(), None);
    }
}
