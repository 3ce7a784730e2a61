use crate::error::PersistenceError;
use camino::{Utf8Path, Utf8PathBuf};
use regex::Regex;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{LazyLock, PoisonError, RwLock};

static KEY_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]*(/[A-Za-z0-9][A-Za-z0-9._-]*)*$")
        .expect("Invalid store key regex")
});

/// Key/blob storage behind the configuration and the snapshot archive.
///
/// Every call is atomic on its own: a reader never observes a half-written
/// blob. Keys are `/`-separated names such as `configuration` or
/// `snapshots/<id>`.
#[cfg_attr(test, mockall::automock)]
pub trait BackingStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, PersistenceError>;

    fn put(&self, key: &str, bytes: &[u8]) -> Result<(), PersistenceError>;

    /// Remove `key`, returning whether it existed.
    fn delete(&self, key: &str) -> Result<bool, PersistenceError>;

    /// All keys starting with `prefix`, sorted.
    fn keys(&self, prefix: &str) -> Result<Vec<String>, PersistenceError>;
}

/// One JSON file per key under a root directory.
///
/// Writes go to `<file>.tmp`, are synced, then renamed over the target.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: Utf8PathBuf,
}

impl FileStore {
    pub fn open<P: AsRef<Utf8Path>>(root: P) -> Result<Self, PersistenceError> {
        let root = root.as_ref().to_path_buf();
        if !root.exists() {
            fs::create_dir_all(&root).map_err(|e| PersistenceError::Io {
                operation: "create directory",
                key: root.to_string(),
                source: e,
            })?;
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<Utf8PathBuf, PersistenceError> {
        if !KEY_PATTERN.is_match(key) {
            return Err(PersistenceError::Unavailable(format!("invalid store key '{key}'")));
        }
        Ok(self.root.join(format!("{key}.json")))
    }
}

impl BackingStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, PersistenceError> {
        let path = self.path_for(key)?;
        if !path.exists() {
            return Ok(None);
        }
        fs::read(&path).map(Some).map_err(|e| PersistenceError::Io {
            operation: "read",
            key: key.to_string(),
            source: e,
        })
    }

    fn put(&self, key: &str, bytes: &[u8]) -> Result<(), PersistenceError> {
        let path = self.path_for(key)?;
        let temp_path = path.with_extension("json.tmp");

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| PersistenceError::Io {
                operation: "create directory",
                key: key.to_string(),
                source: e,
            })?;
        }

        let io_err = |operation: &'static str| {
            move |e: std::io::Error| PersistenceError::Io {
                operation,
                key: key.to_string(),
                source: e,
            }
        };

        let mut file = File::create(&temp_path).map_err(io_err("create"))?;
        file.write_all(bytes).map_err(io_err("write"))?;
        file.sync_all().map_err(io_err("sync"))?;

        fs::rename(&temp_path, &path).map_err(|e| PersistenceError::AtomicWriteFailed {
            key: key.to_string(),
            source: e,
        })?;

        tracing::debug!("Wrote {} ({} bytes)", path, bytes.len());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<bool, PersistenceError> {
        let path = self.path_for(key)?;
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(&path).map_err(|e| PersistenceError::Io {
            operation: "delete",
            key: key.to_string(),
            source: e,
        })?;
        Ok(true)
    }

    fn keys(&self, prefix: &str) -> Result<Vec<String>, PersistenceError> {
        let (dir_part, _) = prefix.rsplit_once('/').unwrap_or(("", prefix));
        let dir = if dir_part.is_empty() {
            self.root.clone()
        } else {
            self.root.join(dir_part)
        };
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let entries = dir.read_dir_utf8().map_err(|e| PersistenceError::Io {
            operation: "list",
            key: prefix.to_string(),
            source: e,
        })?;

        let mut keys = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| PersistenceError::Io {
                operation: "list",
                key: prefix.to_string(),
                source: e,
            })?;
            let Some(stem) = entry.file_name().strip_suffix(".json") else {
                continue;
            };
            let key = if dir_part.is_empty() {
                stem.to_string()
            } else {
                format!("{dir_part}/{stem}")
            };
            if key.starts_with(prefix) {
                keys.push(key);
            }
        }
        keys.sort();
        Ok(keys)
    }
}

/// In-process store, used by tests and as a fallback when no data
/// directory is usable.
#[derive(Debug, Default)]
pub struct MemoryStore {
    blobs: RwLock<BTreeMap<String, Vec<u8>>>,
    puts: AtomicU64,
    unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful `put` calls so far.
    pub fn put_count(&self) -> u64 {
        self.puts.load(Ordering::SeqCst)
    }

    /// Make every subsequent call fail with [`PersistenceError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), PersistenceError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(PersistenceError::Unavailable("memory store offline".to_string()))
        } else {
            Ok(())
        }
    }
}

impl BackingStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, PersistenceError> {
        self.check_available()?;
        let blobs = self.blobs.read().unwrap_or_else(PoisonError::into_inner);
        Ok(blobs.get(key).cloned())
    }

    fn put(&self, key: &str, bytes: &[u8]) -> Result<(), PersistenceError> {
        self.check_available()?;
        let mut blobs = self.blobs.write().unwrap_or_else(PoisonError::into_inner);
        blobs.insert(key.to_string(), bytes.to_vec());
        self.puts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<bool, PersistenceError> {
        self.check_available()?;
        let mut blobs = self.blobs.write().unwrap_or_else(PoisonError::into_inner);
        Ok(blobs.remove(key).is_some())
    }

    fn keys(&self, prefix: &str) -> Result<Vec<String>, PersistenceError> {
        self.check_available()?;
        let blobs = self.blobs.read().unwrap_or_else(PoisonError::into_inner);
        Ok(blobs
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_store() -> (FileStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let root = Utf8PathBuf::try_from(temp_dir.path().join("data")).unwrap();
        let store = FileStore::open(&root).unwrap();
        (store, temp_dir)
    }

    #[test]
    fn test_file_store_round_trip() {
        let (store, _temp_dir) = create_test_store();

        assert_eq!(store.get("configuration").unwrap(), None);
        store.put("configuration", b"{}").unwrap();
        assert_eq!(store.get("configuration").unwrap(), Some(b"{}".to_vec()));

        assert!(store.root().join("configuration.json").exists());
        assert!(!store.root().join("configuration.json.tmp").exists());
    }

    #[test]
    fn test_file_store_nested_keys() {
        let (store, _temp_dir) = create_test_store();

        store.put("snapshots/b", b"2").unwrap();
        store.put("snapshots/a", b"1").unwrap();
        store.put("configuration", b"c").unwrap();

        assert_eq!(
            store.keys("snapshots/").unwrap(),
            vec!["snapshots/a".to_string(), "snapshots/b".to_string()]
        );
        assert_eq!(store.keys("conf").unwrap(), vec!["configuration".to_string()]);
        assert!(store.keys("missing/").unwrap().is_empty());
    }

    #[test]
    fn test_file_store_delete() {
        let (store, _temp_dir) = create_test_store();
        store.put("snapshots/a", b"1").unwrap();

        assert!(store.delete("snapshots/a").unwrap());
        assert!(!store.delete("snapshots/a").unwrap());
        assert_eq!(store.get("snapshots/a").unwrap(), None);
    }

    #[test]
    fn test_file_store_rejects_traversal() {
        let (store, _temp_dir) = create_test_store();
        assert!(store.put("../escape", b"x").is_err());
        assert!(store.get("/etc/passwd").is_err());
    }

    #[test]
    fn test_memory_store_counts_and_outage() {
        let store = MemoryStore::new();
        store.put("a", b"1").unwrap();
        store.put("a", b"2").unwrap();
        assert_eq!(store.put_count(), 2);
        assert_eq!(store.get("a").unwrap(), Some(b"2".to_vec()));

        store.set_unavailable(true);
        assert!(matches!(store.get("a"), Err(PersistenceError::Unavailable(_))));
        assert!(store.put("a", b"3").is_err());
        assert_eq!(store.put_count(), 2);

        store.set_unavailable(false);
        assert_eq!(store.keys("").unwrap(), vec!["a".to_string()]);
    }
}
