//! Key-value store with automatic JSON serialization.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::{FileLock, StoreError};

type Entries = BTreeMap<String, Value>;

/// Lock taken by every write to the backing file.
const WRITE_LOCK: &str = "write";

/// Type-safe store backed by a JSON document on disk.
///
/// Provides automatic JSON serialization for any type that implements
/// `Serialize` and `DeserializeOwned`. A store opened with
/// [`Store::in_memory`] behaves the same but never touches the disk.
///
/// Several handles (in one process or many) may share a file. Reads see the
/// latest committed document, and each write re-reads the file under an
/// exclusive lock and changes only the keys it names.
#[derive(Debug)]
pub struct Store {
    path: Option<PathBuf>,
    entries: Mutex<Entries>,
}

impl Store {
    /// Open the store at `path`, creating it on first write.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let store = Store::open(".storefront/store.json")?;
    /// ```
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let entries = load(&path)?;

        tracing::debug!(path = %path.display(), keys = entries.len(), "opened store");

        Ok(Self {
            path: Some(path),
            entries: Mutex::new(entries),
        })
    }

    /// Create a store that lives only in memory.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            entries: Mutex::new(Entries::new()),
        }
    }

    /// Path of the backing file, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Get a value from the store.
    ///
    /// Returns `None` if the key doesn't exist.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let order: Option<Order> = store.get("order:ord_abc")?;
    /// ```
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        let entries = self.current()?;
        decode(entries.get(key))
    }

    /// Set a value in the store.
    ///
    /// The write is on disk when this returns `Ok`. On failure the stored
    /// document is left as it was before the call.
    pub fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let value = serde_json::to_value(value)?;
        self.set_many(vec![(key.to_string(), value)])
    }

    /// Set several raw values with a single durable write.
    pub fn set_many(&self, values: Vec<(String, Value)>) -> Result<(), StoreError> {
        self.transaction(|tx| {
            for (key, value) in values {
                tx.set_raw(key, value);
            }
            Ok::<_, StoreError>(())
        })
    }

    /// Delete a value from the store.
    ///
    /// Returns whether the key existed.
    pub fn delete(&self, key: &str) -> Result<bool, StoreError> {
        self.transaction(|tx| Ok::<_, StoreError>(tx.delete(key)))
    }

    /// Check if a key exists in the store.
    pub fn exists(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.current()?.contains_key(key))
    }

    /// Get all keys in the store, sorted.
    pub fn keys(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.current()?.keys().cloned().collect())
    }

    /// Read, change and write keys as one step.
    ///
    /// `f` sees the latest committed document. Its changes are written in a
    /// single durable write if it returns `Ok`, and discarded if it returns
    /// `Err`. No other writer on the same file runs in between. `f` must
    /// not call back into this store.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// store.transaction(|tx| {
    ///     let mut index: Vec<String> = tx.get("orders:index")?.unwrap_or_default();
    ///     index.push(order_id.clone());
    ///     tx.set("orders:index", &index)?;
    ///     Ok::<_, StoreError>(())
    /// })?;
    /// ```
    pub fn transaction<R, E, F>(&self, f: F) -> Result<R, E>
    where
        F: FnOnce(&mut Transaction<'_>) -> Result<R, E>,
        E: From<StoreError>,
    {
        let mut entries = self.lock()?;
        let _write_lock = self.named_lock(WRITE_LOCK)?;
        if let Some(path) = &self.path {
            *entries = load(path)?;
        }

        let mut working = entries.clone();
        let mut tx = Transaction {
            entries: &mut working,
            changed: false,
        };
        let result = f(&mut tx)?;
        let changed = tx.changed;

        if changed {
            if let Some(path) = &self.path {
                persist(path, &working)?;
            }
            *entries = working;
        }
        Ok(result)
    }

    /// Take the exclusive lock named `name` for this store's file.
    ///
    /// The lock lives in a sidecar file next to the store and is released
    /// when the returned guard drops. In-memory stores have nothing to lock
    /// and return `None`.
    pub fn named_lock(&self, name: &str) -> Result<Option<FileLock>, StoreError> {
        match &self.path {
            Some(path) => FileLock::acquire(sidecar(path, &format!("{}.lock", name))).map(Some),
            None => Ok(None),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Entries>, StoreError> {
        self.entries.lock().map_err(|_| StoreError::Poisoned)
    }

    /// The cached entries, refreshed from disk for file-backed stores.
    fn current(&self) -> Result<MutexGuard<'_, Entries>, StoreError> {
        let mut entries = self.lock()?;
        if let Some(path) = &self.path {
            *entries = load(path)?;
        }
        Ok(entries)
    }
}

/// Pending changes inside [`Store::transaction`].
#[derive(Debug)]
pub struct Transaction<'a> {
    entries: &'a mut Entries,
    changed: bool,
}

impl Transaction<'_> {
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        decode(self.entries.get(key))
    }

    pub fn set<T: Serialize>(&mut self, key: &str, value: &T) -> Result<(), StoreError> {
        let value = serde_json::to_value(value)?;
        self.set_raw(key.to_string(), value);
        Ok(())
    }

    pub fn set_raw(&mut self, key: String, value: Value) {
        self.entries.insert(key, value);
        self.changed = true;
    }

    /// Returns whether the key existed.
    pub fn delete(&mut self, key: &str) -> bool {
        let existed = self.entries.remove(key).is_some();
        self.changed |= existed;
        existed
    }
}

fn decode<T: DeserializeOwned>(value: Option<&Value>) -> Result<Option<T>, StoreError> {
    match value {
        Some(value) => Ok(Some(serde_json::from_value(value.clone())?)),
        None => Ok(None),
    }
}

fn load(path: &Path) -> Result<Entries, StoreError> {
    let open_error = |reason: String| StoreError::OpenError {
        path: path.to_path_buf(),
        reason,
    };

    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Entries::new()),
        Err(e) => return Err(open_error(e.to_string())),
    };
    if content.trim().is_empty() {
        return Ok(Entries::new());
    }
    serde_json::from_str(&content).map_err(|e| open_error(e.to_string()))
}

/// Replace the file with `entries`: unique temp file, sync, rename, sync dir.
fn persist(path: &Path, entries: &Entries) -> Result<(), StoreError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let bytes = serde_json::to_vec_pretty(entries)?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(&bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    sync_dir(dir)?;

    tracing::trace!(path = %path.display(), bytes = bytes.len(), "store persisted");
    Ok(())
}

#[cfg(unix)]
fn sync_dir(dir: &Path) -> io::Result<()> {
    File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> io::Result<()> {
    Ok(())
}

/// `store.json` + `write.lock` -> `store.json.write.lock`
fn sidecar(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path
        .file_name()
        .map_or_else(|| OsString::from("store"), OsString::from);
    name.push(".");
    name.push(suffix);
    path.with_file_name(name)
}

/// Helper to build store keys with namespacing.
///
/// # Example
///
/// ```rust,ignore
/// let key = store_key!("order", order_id);
/// // Returns "order:ord_abc"
/// ```
#[macro_export]
macro_rules! store_key {
    ($prefix:expr, $($part:expr),+) => {{
        let mut key = String::from($prefix);
        $(
            key.push(':');
            key.push_str(&$part.to_string());
        )+
        key
    }};
}
