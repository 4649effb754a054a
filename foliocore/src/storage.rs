//! Key-value storage for folio
//!
//! Every persisted record is a JSON document stored under a short string
//! key. Writes replace the whole value for a key. Reads are forgiving: the
//! typed helpers turn a missing or unreadable value into the type's default
//! and log the problem instead of surfacing it.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid storage key: {0:?}")]
    InvalidKey(String),
}

pub type Result<T> = std::result::Result<T, StorageError>;

/// A durable string-keyed store of serialized values.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// The store handle shared by the managers of one reading session.
pub type SharedStore = Rc<dyn KeyValueStore>;

/// Stores each key as `<key>.json` inside one directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key)?;
        match std::fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key)?;
        // Write beside the target and rename so a crash never leaves half a record.
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, value)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory store, used when the data directory is unusable and in tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RefCell<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries.borrow_mut().remove(key);
        Ok(())
    }
}

/// Read and decode a value. `Ok(None)` when the key has never been written.
pub fn load<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Result<Option<T>> {
    match store.get(key)? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

/// Read a value, falling back to `T::default()` when it is missing or corrupt.
pub fn load_or_default<T: DeserializeOwned + Default>(store: &dyn KeyValueStore, key: &str) -> T {
    match load(store, key) {
        Ok(Some(value)) => value,
        Ok(None) => T::default(),
        Err(e) => {
            log::warn!("ignoring unreadable {key:?} record: {e}");
            T::default()
        }
    }
}

/// Encode and write a value, replacing whatever the key held.
pub fn save<T: Serialize + ?Sized>(store: &dyn KeyValueStore, key: &str, value: &T) -> Result<()> {
    let raw = serde_json::to_string(value)?;
    store.set(key, &raw)
}

/// Get the config directory for an app
pub fn config_dir(app_name: &str) -> PathBuf {
    directories::ProjectDirs::from("org", "folio", app_name)
        .map(|dirs| dirs.config_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_memory_round_trip_and_remove() {
        let store = MemoryStore::new();
        assert_eq!(store.get("settings").unwrap(), None);
        store.set("settings", "{}").unwrap();
        assert_eq!(store.get("settings").unwrap().as_deref(), Some("{}"));
        store.remove("settings").unwrap();
        assert_eq!(store.get("settings").unwrap(), None);
    }

    #[test]
    fn test_file_store_persists_across_handles() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path().join("data")).unwrap();
        save(&store, "chapter-index", &7usize).unwrap();

        let reopened = FileStore::open(dir.path().join("data")).unwrap();
        let value: Option<usize> = load(&reopened, "chapter-index").unwrap();
        assert_eq!(value, Some(7));
        assert!(reopened.dir().join("chapter-index.json").exists());
        assert!(!reopened.dir().join("chapter-index.json.tmp").exists());
    }

    #[test]
    fn test_file_store_missing_key_and_remove_missing() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        assert_eq!(store.get("bookmarks").unwrap(), None);
        store.remove("bookmarks").unwrap();
    }

    #[test]
    fn test_file_store_rejects_path_like_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        assert!(matches!(store.set("../escape", "1"), Err(StorageError::InvalidKey(_))));
        assert!(matches!(store.get(""), Err(StorageError::InvalidKey(_))));
    }

    #[test]
    fn test_load_or_default_tolerates_corruption() {
        let store = MemoryStore::new();
        store.set("scroll-positions", "{not json").unwrap();
        let positions: BTreeMap<usize, f32> = load_or_default(&store, "scroll-positions");
        assert!(positions.is_empty());

        store.set("chapter-index", "-4").unwrap();
        let index: usize = load_or_default(&store, "chapter-index");
        assert_eq!(index, 0);
    }

    #[test]
    fn test_integer_map_keys_survive_json() {
        let store = MemoryStore::new();
        let mut positions = BTreeMap::new();
        positions.insert(3usize, 0.8f32);
        positions.insert(11usize, 0.25f32);
        save(&store, "scroll-positions", &positions).unwrap();

        let raw = store.get("scroll-positions").unwrap().unwrap();
        assert!(raw.contains("\"3\":0.8"));
        let back: BTreeMap<usize, f32> = load_or_default(&store, "scroll-positions");
        assert_eq!(back, positions);
    }
}
