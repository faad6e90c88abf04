//! Whole-value persistence behind a small interface.
//!
//! Both the snapshot and the subscriber registry are read and written as a
//! single document. A reader always sees either the previous or the next
//! complete document, never a partial write.

use std::{
    fs,
    io::ErrorKind,
    marker::PhantomData,
    path::{Path, PathBuf},
    sync::Mutex,
};

use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use crate::{errors::Error, Result};

/// A store holding one value of type `T`.
///
/// `load` never fails: anything unreadable is treated as a fresh, empty store.
pub trait Store<T>: Send + Sync {
    fn load(&self) -> T;
    fn save(&self, value: &T) -> Result<()>;
}

/// Pretty-printed UTF-8 JSON file.
pub struct JsonFileStore<T> {
    path: PathBuf,
    _value: PhantomData<fn() -> T>,
}

impl<T> JsonFileStore<T> {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _value: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persistence_error(&self, reason: impl ToString) -> Error {
        Error::Persistence {
            path: self.path.clone(),
            reason: reason.to_string(),
        }
    }
}

impl<T> Store<T> for JsonFileStore<T>
where
    T: Serialize + DeserializeOwned + Default,
{
    fn load(&self) -> T {
        let txt = match fs::read_to_string(&self.path) {
            Ok(txt) => txt,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "store file missing, starting empty");
                return T::default();
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "store file unreadable, starting empty");
                return T::default();
            }
        };

        match serde_json::from_str(&txt) {
            Ok(v) => v,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "store file malformed, starting empty");
                T::default()
            }
        }
    }

    fn save(&self, value: &T) -> Result<()> {
        let txt = serde_json::to_string_pretty(value).map_err(|e| self.persistence_error(e))?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        fs::write(&tmp, txt).map_err(|e| self.persistence_error(e))?;
        fs::rename(&tmp, &self.path).map_err(|e| {
            let _ = fs::remove_file(&tmp);
            self.persistence_error(e)
        })?;
        Ok(())
    }
}

/// In-memory store for tests and dry runs.
pub struct MemoryStore<T> {
    value: Mutex<T>,
    fail_saves: Mutex<bool>,
}

impl<T: Clone> MemoryStore<T> {
    pub fn new(value: T) -> Self {
        Self {
            value: Mutex::new(value),
            fail_saves: Mutex::new(false),
        }
    }

    /// Make subsequent `save` calls fail with a persistence error.
    pub fn set_fail_saves(&self, fail: bool) {
        if let Ok(mut f) = self.fail_saves.lock() {
            *f = fail;
        }
    }

    /// Current contents without going through `Store::load`.
    pub fn get(&self) -> Option<T> {
        self.value.lock().ok().map(|v| v.clone())
    }
}

impl<T: Clone + Default> Default for MemoryStore<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> Store<T> for MemoryStore<T>
where
    T: Clone + Default + Send,
{
    fn load(&self) -> T {
        self.value.lock().map(|v| v.clone()).unwrap_or_default()
    }

    fn save(&self, value: &T) -> Result<()> {
        let fail = self.fail_saves.lock().map(|f| *f).unwrap_or(false);
        if fail {
            return Err(Error::Persistence {
                path: PathBuf::from("<memory>"),
                reason: "save disabled".to_string(),
            });
        }
        let mut guard = self
            .value
            .lock()
            .map_err(|_| Error::External("memory store poisoned".to_string()))?;
        *guard = value.clone();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn tmp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("stockbot-store-{name}-{}.json", std::process::id()))
    }

    #[test]
    fn missing_file_loads_default() {
        let store: JsonFileStore<BTreeMap<String, u32>> = JsonFileStore::new(tmp_path("missing"));
        let _ = fs::remove_file(store.path());
        assert!(store.load().is_empty());
    }

    #[test]
    fn malformed_file_loads_default() {
        let path = tmp_path("malformed");
        fs::write(&path, "{ not json").unwrap();
        let store: JsonFileStore<BTreeMap<String, u32>> = JsonFileStore::new(&path);
        assert!(store.load().is_empty());
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn save_overwrites_whole_file_and_keeps_utf8() {
        let path = tmp_path("save");
        let store: JsonFileStore<BTreeMap<String, String>> = JsonFileStore::new(&path);

        let mut first = BTreeMap::new();
        first.insert("1".to_string(), "旧".to_string());
        first.insert("2".to_string(), "b".to_string());
        store.save(&first).unwrap();

        let mut second = BTreeMap::new();
        second.insert("3".to_string(), "新商品".to_string());
        store.save(&second).unwrap();

        assert_eq!(store.load(), second);
        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("新商品"));
        assert!(!raw.contains("旧"));

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn save_into_missing_directory_is_persistence_failure() {
        let store: JsonFileStore<BTreeMap<String, u32>> =
            JsonFileStore::new("/nonexistent-stockbot-dir/cache.json");
        let err = store.save(&BTreeMap::new()).unwrap_err();
        assert!(matches!(err, Error::Persistence { .. }));
    }

    #[test]
    fn memory_store_can_simulate_failed_writes() {
        let store = MemoryStore::new(1u32);
        store.set_fail_saves(true);
        assert!(store.save(&2).is_err());
        assert_eq!(store.load(), 1);

        store.set_fail_saves(false);
        store.save(&3).unwrap();
        assert_eq!(store.get(), Some(3));
    }
}
