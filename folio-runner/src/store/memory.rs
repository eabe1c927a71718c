//! In-memory document store for tests and embedding.

use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use folio_core::domain::UserId;

use super::{apply_updates, DocumentStore, FieldPath, FieldUpdate, StoreError};

#[derive(Debug, Default)]
pub struct MemoryStore {
    docs: Mutex<HashMap<UserId, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DocumentStore for MemoryStore {
    fn load(&self, user: &UserId) -> Result<Option<Value>, StoreError> {
        let docs = self.docs.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(docs.get(user).cloned())
    }

    fn update(&self, user: &UserId, updates: &[(FieldPath, FieldUpdate)]) -> Result<(), StoreError> {
        let mut docs = self.docs.lock().unwrap_or_else(PoisonError::into_inner);
        // Work on a copy so a rejected batch leaves the stored document alone.
        let mut doc = docs
            .get(user)
            .cloned()
            .unwrap_or_else(|| Value::Object(Map::new()));
        apply_updates(&mut doc, updates)?;
        docs.insert(user.clone(), doc);
        Ok(())
    }
}
