//! Per-user document store.
//!
//! Each user owns one JSON document:
//!
//! ```json
//! { "portfolio": { "AAPL": {...} }, "watchlist": { ... }, "preferences": { ... } }
//! ```
//!
//! Writes are batches of field-path updates, so adding one holding touches
//! `["portfolio", "AAPL"]` only and never rewrites the whole map. Deleting a
//! key uses [`FieldUpdate::Delete`].

pub mod json_file;
pub mod memory;

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;

use serde_json::{Map, Value};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use folio_core::domain::UserId;

/// Errors from a document store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("document {path} is not valid JSON: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("field path must not be empty")]
    EmptyPath,
}

/// Path of keys from the document root, e.g. `["portfolio", "BRK.B"]`.
///
/// Segments are kept separate because tickers may contain dots.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldPath(Vec<String>);

impl FieldPath {
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("/"))
    }
}

/// What to do at a field path.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldUpdate {
    Set(Value),
    /// Remove the key. Deleting a missing key is a no-op.
    Delete,
}

/// Backend holding one JSON document per user.
pub trait DocumentStore: Send + Sync {
    /// The user's document, or `None` if they have never written anything.
    fn load(&self, user: &UserId) -> Result<Option<Value>, StoreError>;

    /// Apply all updates as one batch: either every update lands or none do.
    fn update(&self, user: &UserId, updates: &[(FieldPath, FieldUpdate)]) -> Result<(), StoreError>;
}

/// Apply a batch of updates to a document in place.
///
/// `Set` creates missing intermediate objects and replaces any non-object
/// value standing in the way. Paths are checked before anything is touched.
pub fn apply_updates(doc: &mut Value, updates: &[(FieldPath, FieldUpdate)]) -> Result<(), StoreError> {
    if updates.iter().any(|(path, _)| path.is_empty()) {
        return Err(StoreError::EmptyPath);
    }
    for (path, update) in updates {
        apply_one(doc, path.segments(), update);
    }
    Ok(())
}

fn apply_one(doc: &mut Value, segments: &[String], update: &FieldUpdate) {
    let Some((last, parents)) = segments.split_last() else {
        return;
    };

    let create = matches!(update, FieldUpdate::Set(_));
    let mut node = doc;
    for key in parents {
        let Some(map) = as_object(node, create) else {
            return;
        };
        node = if create {
            map.entry(key.clone())
                .or_insert_with(|| Value::Object(Map::new()))
        } else {
            match map.get_mut(key) {
                Some(child) => child,
                None => return,
            }
        };
    }

    match update {
        FieldUpdate::Set(value) => {
            if let Some(map) = as_object(node, true) {
                map.insert(last.clone(), value.clone());
            }
        }
        FieldUpdate::Delete => {
            if let Some(map) = as_object(node, false) {
                map.remove(last);
            }
        }
    }
}

/// View `node` as an object, replacing a non-object only when `create` is set.
fn as_object(node: &mut Value, create: bool) -> Option<&mut Map<String, Value>> {
    if !node.is_object() {
        if !create {
            return None;
        }
        *node = Value::Object(Map::new());
    }
    node.as_object_mut()
}
