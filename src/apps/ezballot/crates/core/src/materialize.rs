//! Result materializer: drains a ledger iterator into decoded records.
//!
//! The iterator's item type selects the mode. [`KeyValue`] items become
//! [`StateRecord`]s and [`KeyModification`] items become [`HistoryRecord`]s.
//! Payloads that are not valid JSON are kept as raw strings.

use tracing::{debug, warn};

use crate::Result;
use crate::ledger::{KeyModification, KeyValue, ResultIterator};
use crate::records::{HistoryRecord, StateRecord, decode_or_fallback};

/// A ledger item that can be turned into an output record.
pub trait Materialize: Send {
    type Record;

    fn payload(&self) -> &[u8];

    fn into_record(self, decoded: serde_json::Value) -> Self::Record;
}

impl Materialize for KeyValue {
    type Record = StateRecord;

    fn payload(&self) -> &[u8] {
        &self.value
    }

    fn into_record(self, decoded: serde_json::Value) -> StateRecord {
        StateRecord {
            key: self.key,
            record: decoded,
        }
    }
}

impl Materialize for KeyModification {
    type Record = HistoryRecord;

    fn payload(&self) -> &[u8] {
        &self.value
    }

    fn into_record(self, decoded: serde_json::Value) -> HistoryRecord {
        HistoryRecord {
            tx_id: self.tx_id,
            timestamp: self.timestamp,
            is_delete: self.is_delete.to_string(),
            value: decoded,
        }
    }
}

/// Drain `iter` completely, preserving ledger order, and close it.
///
/// Items with an empty payload are skipped. The iterator is closed on every
/// exit path, including when `next()` fails part way through.
pub async fn materialize<T: Materialize + 'static>(
    mut iter: Box<dyn ResultIterator<T>>,
) -> Result<Vec<T::Record>> {
    let drained = drain(iter.as_mut()).await;
    let closed = iter.close().await;

    let records = match drained {
        Ok(records) => records,
        Err(e) => {
            if let Err(close_err) = closed {
                warn!("Failed to close iterator after error: {}", close_err);
            }
            return Err(e);
        }
    };
    closed?;

    debug!("Materialized {} records", records.len());
    Ok(records)
}

async fn drain<T: Materialize>(iter: &mut dyn ResultIterator<T>) -> Result<Vec<T::Record>> {
    let mut records = Vec::new();
    while let Some(item) = iter.next().await? {
        if item.payload().is_empty() {
            continue;
        }
        let decoded = decode_or_fallback(item.payload());
        records.push(item.into_record(decoded));
    }
    Ok(records)
}
