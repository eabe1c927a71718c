//! Read-through quote cache with a single fixed TTL.
//!
//! Layout: one JSON object file, `{ "<TICKER>": { "value": f64, "timestamp": ms } }`.
//!
//! - Entries are kept as raw JSON and validated on read, so one malformed
//!   entry is a miss for that ticker only
//! - Expired, malformed, non-finite or future-dated entries are misses, never errors
//! - A missing or corrupt file is an empty cache
//! - Writes are atomic (write to .tmp, rename into place)

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::domain::Ticker;

/// Default time-to-live for cached quotes.
pub const DEFAULT_TTL_SECS: i64 = 5 * 60;

/// Stored form of a cached price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub value: f64,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
}

impl CacheEntry {
    fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        let age_ms = now.timestamp_millis() - self.timestamp;
        age_ms >= 0 && age_ms <= ttl.num_milliseconds()
    }
}

/// Quote cache shared by concurrent price fetches.
#[derive(Debug)]
pub struct QuoteCache {
    path: Option<PathBuf>,
    ttl: Duration,
    entries: Mutex<HashMap<String, Value>>,
}

impl QuoteCache {
    /// Open a file-backed cache. An unreadable or malformed file starts empty.
    pub fn open(path: impl Into<PathBuf>, ttl: Duration) -> Self {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str::<HashMap<String, Value>>(&content)
                .unwrap_or_else(|e| {
                    tracing::warn!(path = %path.display(), error = %e, "quote cache unreadable, starting empty");
                    HashMap::new()
                }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "quote cache unreadable, starting empty");
                HashMap::new()
            }
        };
        Self {
            path: Some(path),
            ttl,
            entries: Mutex::new(entries),
        }
    }

    /// A cache that lives only as long as the process.
    pub fn in_memory(ttl: Duration) -> Self {
        Self {
            path: None,
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Value>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, ticker: &Ticker) -> Option<f64> {
        self.get_at(ticker, Utc::now())
    }

    /// Fresh cached price as of `now`, or `None` on any kind of miss.
    pub fn get_at(&self, ticker: &Ticker, now: DateTime<Utc>) -> Option<f64> {
        let raw = self.lock().get(ticker.as_str()).cloned()?;
        let entry: CacheEntry = match serde_json::from_value(raw) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::debug!(%ticker, error = %e, "malformed quote cache entry");
                return None;
            }
        };
        (entry.value.is_finite() && entry.is_fresh(now, self.ttl)).then_some(entry.value)
    }

    pub fn put(&self, ticker: &Ticker, value: f64) -> io::Result<()> {
        self.put_at(ticker, value, Utc::now())
    }

    pub fn put_at(&self, ticker: &Ticker, value: f64, now: DateTime<Utc>) -> io::Result<()> {
        let entry = CacheEntry {
            value,
            timestamp: now.timestamp_millis(),
        };
        let raw = serde_json::to_value(entry)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        let mut entries = self.lock();
        entries.insert(ticker.to_string(), raw);
        self.persist(&entries)
    }

    /// Drop expired and malformed entries. Returns how many were removed.
    pub fn purge_expired(&self) -> io::Result<usize> {
        let now = Utc::now();
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, raw| {
            serde_json::from_value::<CacheEntry>(raw.clone())
                .is_ok_and(|e| e.value.is_finite() && e.is_fresh(now, self.ttl))
        });
        let removed = before - entries.len();
        if removed > 0 {
            self.persist(&entries)?;
        }
        Ok(removed)
    }

    pub fn clear(&self) -> io::Result<()> {
        let mut entries = self.lock();
        entries.clear();
        self.persist(&entries)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn persist(&self, entries: &HashMap<String, Value>) -> io::Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string(entries)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, json)?;
        fs::rename(&tmp_path, path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            e
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn t(s: &str) -> Ticker {
        Ticker::parse(s).unwrap()
    }

    fn ttl() -> Duration {
        Duration::seconds(DEFAULT_TTL_SECS)
    }

    #[test]
    fn hit_within_ttl_miss_after() {
        let cache = QuoteCache::in_memory(ttl());
        let t0 = Utc::now();
        cache.put_at(&t("AAPL"), 190.0, t0).unwrap();

        assert_eq!(cache.get_at(&t("AAPL"), t0 + Duration::seconds(299)), Some(190.0));
        assert_eq!(cache.get_at(&t("AAPL"), t0 + Duration::seconds(301)), None);
        assert_eq!(cache.get_at(&t("MSFT"), t0), None);
    }

    #[test]
    fn future_dated_entry_is_a_miss() {
        let cache = QuoteCache::in_memory(ttl());
        let t0 = Utc::now();
        cache.put_at(&t("AAPL"), 190.0, t0 + Duration::hours(1)).unwrap();
        assert_eq!(cache.get_at(&t("AAPL"), t0), None);
    }

    #[test]
    fn persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("quotes.json");
        {
            let cache = QuoteCache::open(&path, ttl());
            cache.put(&t("VTI"), 250.5).unwrap();
        }
        let cache = QuoteCache::open(&path, ttl());
        assert_eq!(cache.get(&t("VTI")), Some(250.5));
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn malformed_entry_is_a_miss_for_that_ticker_only() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("quotes.json");
        let now_ms = Utc::now().timestamp_millis();
        fs::write(
            &path,
            format!(
                r#"{{"AAPL":{{"value":"oops","timestamp":{now_ms}}},
                    "MSFT":{{"value":410.0,"timestamp":{now_ms}}},
                    "NVDA":"garbage"}}"#
            ),
        )
        .unwrap();

        let cache = QuoteCache::open(&path, ttl());
        assert_eq!(cache.get(&t("AAPL")), None);
        assert_eq!(cache.get(&t("NVDA")), None);
        assert_eq!(cache.get(&t("MSFT")), Some(410.0));
    }

    #[test]
    fn corrupt_file_is_empty_cache() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("quotes.json");
        fs::write(&path, "not json {{{").unwrap();
        let cache = QuoteCache::open(&path, ttl());
        assert!(cache.is_empty());
        // and it can still be written
        cache.put(&t("AAPL"), 1.0).unwrap();
        assert_eq!(cache.get(&t("AAPL")), Some(1.0));
    }

    #[test]
    fn purge_removes_stale_and_malformed() {
        let cache = QuoteCache::in_memory(ttl());
        let old = Utc::now() - Duration::hours(1);
        cache.put_at(&t("OLD"), 1.0, old).unwrap();
        cache.put(&t("NEW"), 2.0).unwrap();
        cache
            .lock()
            .insert("BAD".into(), Value::String("x".into()));

        assert_eq!(cache.purge_expired().unwrap(), 2);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&t("NEW")), Some(2.0));
    }
}
