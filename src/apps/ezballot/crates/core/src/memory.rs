//! In-memory reference ledger.
//!
//! World state is a `BTreeMap` from key to bytes, so query results come back
//! in key order. Every write also appends a [`KeyModification`] to the key's
//! history. A single async mutex makes each call atomic, which is the
//! atomicity unit the contract relies on.
//!
//! Across processes sharing one snapshot file, a host must hold a
//! [`SnapshotLock`] for the whole load, invoke and save span.

use async_trait::async_trait;
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::ledger::{KeyModification, KeyValue, Ledger, ResultIterator};
use crate::{Error, Result};

/// Bytes as they appear in a snapshot file: text when valid UTF-8.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
enum StoredBytes {
    Text(String),
    Raw(Vec<u8>),
}

impl From<&[u8]> for StoredBytes {
    fn from(bytes: &[u8]) -> Self {
        match std::str::from_utf8(bytes) {
            Ok(text) => StoredBytes::Text(text.to_string()),
            Err(_) => StoredBytes::Raw(bytes.to_vec()),
        }
    }
}

impl From<StoredBytes> for Vec<u8> {
    fn from(stored: StoredBytes) -> Self {
        match stored {
            StoredBytes::Text(text) => text.into_bytes(),
            StoredBytes::Raw(bytes) => bytes,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct SnapshotModification {
    tx_id: String,
    timestamp: String,
    is_delete: bool,
    value: StoredBytes,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Snapshot {
    state: BTreeMap<String, StoredBytes>,
    #[serde(default)]
    history: BTreeMap<String, Vec<SnapshotModification>>,
}

#[derive(Debug, Default)]
struct LedgerState {
    world: BTreeMap<String, Vec<u8>>,
    history: BTreeMap<String, Vec<KeyModification>>,
}

impl LedgerState {
    fn present(&self, key: &str) -> bool {
        self.world.get(key).is_some_and(|v| !v.is_empty())
    }

    fn write(&mut self, key: &str, value: Vec<u8>) {
        let modification = KeyModification {
            tx_id: uuid::Uuid::new_v4().to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            is_delete: false,
            value: value.clone(),
        };
        self.history
            .entry(key.to_string())
            .or_default()
            .push(modification);
        self.world.insert(key.to_string(), value);
    }
}

/// Ledger backed by process memory, optionally persisted as a JSON snapshot.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    inner: Mutex<LedgerState>,
}

impl MemoryLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a ledger from a snapshot file. A missing file yields an empty ledger.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!("No ledger snapshot at {}, starting empty", path.display());
            return Ok(Self::new());
        }

        let content = std::fs::read_to_string(path)?;
        let snapshot: Snapshot = serde_json::from_str(&content)?;

        let world: BTreeMap<String, Vec<u8>> = snapshot
            .state
            .into_iter()
            .map(|(key, value)| (key, value.into()))
            .collect();
        let history: BTreeMap<String, Vec<KeyModification>> = snapshot
            .history
            .into_iter()
            .map(|(key, mods)| {
                let mods: Vec<KeyModification> = mods
                    .into_iter()
                    .map(|m| KeyModification {
                        tx_id: m.tx_id,
                        timestamp: m.timestamp,
                        is_delete: m.is_delete,
                        value: m.value.into(),
                    })
                    .collect();
                (key, mods)
            })
            .collect();

        info!("Loaded ledger snapshot from {}", path.display());
        Ok(Self {
            inner: Mutex::new(LedgerState { world, history }),
        })
    }

    /// Write the whole ledger to a snapshot file.
    ///
    /// The snapshot is written to a temporary file in the same directory and
    /// renamed over `path`, so readers never observe a partial file.
    pub async fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let snapshot = {
            let inner = self.inner.lock().await;
            Snapshot {
                state: inner
                    .world
                    .iter()
                    .map(|(k, v)| (k.clone(), StoredBytes::from(v.as_slice())))
                    .collect(),
                history: inner
                    .history
                    .iter()
                    .map(|(k, mods)| {
                        let mods: Vec<SnapshotModification> = mods
                            .iter()
                            .map(|m| SnapshotModification {
                                tx_id: m.tx_id.clone(),
                                timestamp: m.timestamp.clone(),
                                is_delete: m.is_delete,
                                value: StoredBytes::from(m.value.as_slice()),
                            })
                            .collect();
                        (k.clone(), mods)
                    })
                    .collect(),
            }
        };

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;

        let mut temp = NamedTempFile::new_in(dir)?;
        temp.write_all(serde_json::to_string_pretty(&snapshot)?.as_bytes())?;
        temp.as_file().sync_all()?;
        temp.persist(path).map_err(|e| Error::Io(e.error))?;
        info!("Ledger snapshot written to {}", path.display());
        Ok(())
    }

    /// Number of keys in world state.
    pub async fn len(&self) -> usize {
        self.inner.lock().await.world.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.world.is_empty()
    }
}

/// Exclusive advisory lock (`flock(LOCK_EX)`) guarding one snapshot path.
///
/// The lock is taken on a sibling `<snapshot>.lock` file, since `save`
/// replaces the snapshot file itself. Dropping the guard releases it.
#[derive(Debug)]
pub struct SnapshotLock {
    file: File,
    path: PathBuf,
}

impl SnapshotLock {
    /// Block until the lock for `snapshot` is held by this guard.
    pub async fn acquire<P: AsRef<Path>>(snapshot: P) -> Result<Self> {
        let path = lock_path(snapshot.as_ref());
        tokio::task::spawn_blocking(move || Self::acquire_blocking(path))
            .await
            .map_err(|e| Error::ledger(format!("lock task failed: {}", e)))?
    }

    fn acquire_blocking(path: PathBuf) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&path)?;
        FileExt::lock_exclusive(&file)?;
        debug!("Acquired ledger lock {}", path.display());
        Ok(Self { file, path })
    }
}

impl Drop for SnapshotLock {
    fn drop(&mut self) {
        match FileExt::unlock(&self.file) {
            Ok(()) => debug!("Released ledger lock {}", self.path.display()),
            Err(e) => warn!("Failed to release ledger lock {}: {}", self.path.display(), e),
        }
    }
}

fn lock_path(snapshot: &Path) -> PathBuf {
    let mut name = snapshot
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("ledger"));
    name.push(".lock");
    snapshot.with_file_name(name)
}

/// Parse a `{"selector": {...}}` document into its field constraints.
fn parse_selector(query: &str) -> Result<serde_json::Map<String, serde_json::Value>> {
    let document: serde_json::Value =
        serde_json::from_str(query).map_err(|e| Error::InvalidQuery(e.to_string()))?;

    match document.get("selector") {
        Some(serde_json::Value::Object(fields)) => Ok(fields.clone()),
        Some(_) => Err(Error::InvalidQuery("selector must be an object".into())),
        None => Err(Error::InvalidQuery("missing selector".into())),
    }
}

/// A stored value matches when it is a JSON object carrying every selector field.
fn selector_matches(value: &[u8], selector: &serde_json::Map<String, serde_json::Value>) -> bool {
    let Ok(serde_json::Value::Object(record)) = serde_json::from_slice::<serde_json::Value>(value)
    else {
        return false;
    };
    selector
        .iter()
        .all(|(field, expected)| record.get(field) == Some(expected))
}

#[async_trait]
impl Ledger for MemoryLedger {
    async fn get_state(&self, key: &str) -> Result<Option<Vec<u8>>> {
        debug!("get_state {}", key);
        Ok(self.inner.lock().await.world.get(key).cloned())
    }

    async fn put_state(&self, key: &str, value: Vec<u8>) -> Result<()> {
        debug!("put_state {} ({} bytes)", key, value.len());
        self.inner.lock().await.write(key, value);
        Ok(())
    }

    async fn put_state_if_absent(&self, key: &str, value: Vec<u8>) -> Result<bool> {
        let mut inner = self.inner.lock().await;
        if inner.present(key) {
            debug!("put_state_if_absent {} refused: key present", key);
            return Ok(false);
        }
        debug!("put_state_if_absent {} ({} bytes)", key, value.len());
        inner.write(key, value);
        Ok(true)
    }

    async fn get_query_result(&self, query: &str) -> Result<Box<dyn ResultIterator<KeyValue>>> {
        let selector = parse_selector(query)?;
        let inner = self.inner.lock().await;

        let items: Vec<KeyValue> = inner
            .world
            .iter()
            .filter(|(_, value)| selector_matches(value, &selector))
            .map(|(key, value)| KeyValue {
                key: key.clone(),
                value: value.clone(),
            })
            .collect();

        debug!("get_query_result {} matched {} keys", query, items.len());
        Ok(Box::new(SnapshotIterator::new(items)))
    }

    async fn get_history_for_key(
        &self,
        key: &str,
    ) -> Result<Box<dyn ResultIterator<KeyModification>>> {
        let inner = self.inner.lock().await;
        let items = inner.history.get(key).cloned().unwrap_or_default();
        debug!("get_history_for_key {} has {} entries", key, items.len());
        Ok(Box::new(SnapshotIterator::new(items)))
    }
}

/// Iterator over results captured when the query ran.
pub struct SnapshotIterator<T> {
    items: std::vec::IntoIter<T>,
    closed: bool,
}

impl<T> SnapshotIterator<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items: items.into_iter(),
            closed: false,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

#[async_trait]
impl<T: Send> ResultIterator<T> for SnapshotIterator<T> {
    async fn next(&mut self) -> Result<Option<T>> {
        if self.closed {
            return Ok(None);
        }
        Ok(self.items.next())
    }

    async fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }
}
