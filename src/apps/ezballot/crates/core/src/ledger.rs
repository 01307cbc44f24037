//! The ledger collaborator contract.
//!
//! The ledger owns all state. It provides atomic point reads and writes and
//! lazy iterators over selector queries and key history. Nothing in this
//! crate holds state between invocations; every operation re-reads what it
//! needs through this trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;

/// One (key, value) pair yielded by a current-state query.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyValue {
    pub key: String,
    pub value: Vec<u8>,
}

/// One historical modification of a key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyModification {
    pub tx_id: String,
    pub timestamp: String,
    pub is_delete: bool,
    pub value: Vec<u8>,
}

/// A lazy, single-pass cursor over ledger results.
///
/// Callers must call [`ResultIterator::close`] once they are done, whether
/// or not the iterator was fully drained.
#[async_trait]
pub trait ResultIterator<T>: Send {
    /// Next item, or `None` once the iterator is exhausted.
    async fn next(&mut self) -> Result<Option<T>>;

    /// Release the cursor.
    async fn close(&mut self) -> Result<()>;
}

/// Point access and queries over the key-value ledger.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Read the bytes stored at `key`. `None` when the key was never written.
    async fn get_state(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Write `value` at `key`, replacing anything stored there.
    async fn put_state(&self, key: &str, value: Vec<u8>) -> Result<()>;

    /// Write `value` at `key` only if the key holds no non-empty value.
    ///
    /// Returns `false` without writing when the key is already present. This
    /// is the compare-and-swap that keeps creation writes unique when two
    /// invocations pass their existence checks concurrently.
    async fn put_state_if_absent(&self, key: &str, value: Vec<u8>) -> Result<bool>;

    /// Run a selector query document (`{"selector": {...}}`).
    async fn get_query_result(&self, query: &str) -> Result<Box<dyn ResultIterator<KeyValue>>>;

    /// Every recorded modification of `key`, oldest first.
    async fn get_history_for_key(
        &self,
        key: &str,
    ) -> Result<Box<dyn ResultIterator<KeyModification>>>;
}
