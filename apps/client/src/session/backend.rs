// Standard library imports
use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

// External crate imports
use parking_lot::Mutex;
use tracing::{debug, trace, warn};

// Internal crate imports
use crate::error::StorageError;

// ============================================================================
// KeyValueStore Trait and Implementations
// ============================================================================

/// String slots that survive a restart.
///
/// Multi-key writes and removals are all-or-nothing: when `set_all` or
/// `remove_all` returns an error the previous contents are still in place.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    fn set_all(&self, entries: &[(&str, String)]) -> Result<(), StorageError>;

    /// Removing keys that are not present is not an error.
    fn remove_all(&self, keys: &[&str]) -> Result<(), StorageError>;
}

/// Process-local store for tests and embedders that persist elsewhere.
#[derive(Debug, Default)]
pub struct MemoryStore {
    slots: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a raw value, bypassing any session-level validation.
    pub fn insert_raw(&self, key: &str, value: impl Into<String>) {
        self.slots.lock().insert(key.to_string(), value.into());
    }

    pub fn len(&self) -> usize {
        self.slots.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.lock().is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.slots.lock().get(key).cloned())
    }

    fn set_all(&self, entries: &[(&str, String)]) -> Result<(), StorageError> {
        let mut slots = self.slots.lock();
        for (key, value) in entries {
            slots.insert((*key).to_string(), value.clone());
        }
        Ok(())
    }

    fn remove_all(&self, keys: &[&str]) -> Result<(), StorageError> {
        let mut slots = self.slots.lock();
        for key in keys {
            slots.remove(*key);
        }
        Ok(())
    }
}

/// How long a writer waits for another process to release `<path>.lock`.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(2);

/// JSON document on disk holding every slot.
///
/// Writes go to `<path>.tmp` and are renamed over the document, so a crash
/// mid-write leaves the previous document intact. An OS exclusive lock on
/// `<path>.lock` serializes writers across processes. The lock is polled
/// with backoff and a writer gives up with [`StorageError::Io`] once the
/// lock timeout has passed.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
    lock_path: PathBuf,
    lock_timeout: Duration,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let lock_path = sibling(&path, "lock");
        Self {
            path,
            lock_path,
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }

    pub fn with_lock_timeout(mut self, lock_timeout: Duration) -> Self {
        self.lock_timeout = lock_timeout;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn with_lock<T>(
        &self,
        op: impl FnOnce() -> Result<T, StorageError>,
    ) -> Result<T, StorageError> {
        use fs4::fs_std::FileExt;

        if let Some(parent) = self.lock_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&self.lock_path)?;
        self.acquire(&file)?;

        let result = op();

        if let Err(e) = FileExt::unlock(&file) {
            // The lock is released when the handle drops anyway
            debug!(
                lock_path = %self.lock_path.display(),
                error = %e,
                "session file unlock returned error (may be benign)"
            );
        }
        result
    }

    /// Poll `try_lock_exclusive` with capped exponential backoff until the
    /// lock timeout runs out.
    fn acquire(&self, file: &File) -> Result<(), StorageError> {
        use fs4::fs_std::FileExt;

        let start = Instant::now();
        let mut attempts: u32 = 0;
        loop {
            attempts += 1;
            match FileExt::try_lock_exclusive(file) {
                Ok(true) => {
                    trace!(
                        lock_path = %self.lock_path.display(),
                        attempts,
                        "session file lock acquired"
                    );
                    return Ok(());
                }
                Ok(false) => {}
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {}
                Err(e) => return Err(e.into()),
            }

            let elapsed = start.elapsed();
            if elapsed >= self.lock_timeout {
                warn!(
                    lock_path = %self.lock_path.display(),
                    attempts,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "session file lock acquisition timed out"
                );
                return Err(StorageError::io(format!(
                    "timed out after {elapsed:?} waiting for {} ({attempts} attempts)",
                    self.lock_path.display()
                )));
            }

            let backoff_ms = (5u64 << (attempts - 1).min(4)).min(80);
            let delay = Duration::from_millis(backoff_ms).min(self.lock_timeout - elapsed);
            std::thread::sleep(delay);
        }
    }

    fn read_document(&self) -> Result<BTreeMap<String, String>, StorageError> {
        match fs::read_to_string(&self.path) {
            Ok(text) if text.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(text) => serde_json::from_str(&text).map_err(|e| {
                StorageError::corruption(format!("{}: {e}", self.path.display()))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Document for a read-modify-write. A document that no longer parses
    /// is replaced rather than blocking every future write.
    fn read_document_for_update(&self) -> Result<BTreeMap<String, String>, StorageError> {
        match self.read_document() {
            Err(StorageError::Corruption { detail }) => {
                warn!(%detail, "replacing unreadable session document");
                Ok(BTreeMap::new())
            }
            other => other,
        }
    }

    fn write_document(&self, doc: &BTreeMap<String, String>) -> Result<(), StorageError> {
        if doc.is_empty() {
            return match fs::remove_file(&self.path) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(e.into()),
            };
        }

        let tmp_path = sibling(&self.path, "tmp");
        let bytes = serde_json::to_vec_pretty(doc)?;
        {
            let mut tmp = File::create(&tmp_path)?;
            tmp.write_all(&bytes)?;
            tmp.sync_all()?;
        }
        if let Err(e) = fs::rename(&tmp_path, &self.path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e.into());
        }
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.read_document()?.get(key).cloned())
    }

    fn set_all(&self, entries: &[(&str, String)]) -> Result<(), StorageError> {
        self.with_lock(|| {
            let mut doc = self.read_document_for_update()?;
            for (key, value) in entries {
                doc.insert((*key).to_string(), value.clone());
            }
            self.write_document(&doc)
        })
    }

    fn remove_all(&self, keys: &[&str]) -> Result<(), StorageError> {
        self.with_lock(|| {
            let mut doc = self.read_document_for_update()?;
            let before = doc.len();
            for key in keys {
                doc.remove(*key);
            }
            if before > 0 && doc.len() == before {
                return Ok(());
            }
            self.write_document(&doc)
        })
    }
}

fn sibling(path: &Path, extension: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".");
    name.push(extension);
    PathBuf::from(name)
}
