//! One JSON file per user under a root directory.
//!
//! Layout: `<root>/<user_id>.json`. Updates are read-modify-write under a
//! process-wide lock and land atomically (write to .tmp, rename into place),
//! so a crash mid-write leaves the previous document intact.

use serde_json::{Map, Value};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use folio_core::domain::UserId;

use super::{apply_updates, DocumentStore, FieldPath, FieldUpdate, StoreError};

pub struct JsonFileStore {
    root: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File backing `user`'s document.
    pub fn document_path(&self, user: &UserId) -> PathBuf {
        self.root.join(format!("{}.json", user.as_str()))
    }

    fn read(&self, path: &Path) -> Result<Option<Value>, StoreError> {
        let content = match fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(StoreError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|source| StoreError::Corrupt {
                path: path.to_path_buf(),
                source,
            })
    }

    fn write_atomic(&self, path: &Path, doc: &Value) -> Result<(), StoreError> {
        let io_err = |source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        };
        fs::create_dir_all(&self.root).map_err(io_err)?;
        let json = serde_json::to_string_pretty(doc)?;
        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, json).map_err(io_err)?;
        fs::rename(&tmp_path, path).map_err(|source| {
            let _ = fs::remove_file(&tmp_path);
            io_err(source)
        })
    }
}

impl DocumentStore for JsonFileStore {
    fn load(&self, user: &UserId) -> Result<Option<Value>, StoreError> {
        self.read(&self.document_path(user))
    }

    fn update(&self, user: &UserId, updates: &[(FieldPath, FieldUpdate)]) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let path = self.document_path(user);
        let mut doc = self
            .read(&path)?
            .unwrap_or_else(|| Value::Object(Map::new()));
        apply_updates(&mut doc, updates)?;
        self.write_atomic(&path, &doc)?;
        tracing::debug!(user = %user, path = %path.display(), updates = updates.len(), "document updated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn user() -> UserId {
        UserId::parse("alice").unwrap()
    }

    #[test]
    fn missing_document_is_none() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(dir.path());
        assert_eq!(store.load(&user()).unwrap(), None);
    }

    #[test]
    fn updates_persist_and_leave_no_tmp() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(dir.path().join("users"));
        store
            .update(
                &user(),
                &[(
                    FieldPath::new(["portfolio", "VTI"]),
                    FieldUpdate::Set(json!({"quantity": 3.0})),
                )],
            )
            .unwrap();

        let reopened = JsonFileStore::new(dir.path().join("users"));
        let doc = reopened.load(&user()).unwrap().unwrap();
        assert_eq!(doc["portfolio"]["VTI"]["quantity"], 3.0);

        let path = store.document_path(&user());
        assert!(path.exists());
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn corrupt_document_is_an_error_and_not_overwritten() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(dir.path());
        let path = store.document_path(&user());
        fs::write(&path, "{ not json").unwrap();

        assert!(matches!(store.load(&user()), Err(StoreError::Corrupt { .. })));
        let err = store
            .update(&user(), &[(FieldPath::new(["preferences"]), FieldUpdate::Delete)])
            .unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }));
        assert_eq!(fs::read_to_string(&path).unwrap(), "{ not json");
    }

    #[test]
    fn users_are_isolated() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(dir.path());
        let bob = UserId::parse("bob").unwrap();
        store
            .update(&user(), &[(FieldPath::new(["watchlist", "TSLA"]), FieldUpdate::Set(json!(1)))])
            .unwrap();
        assert_eq!(store.load(&bob).unwrap(), None);
    }
}
