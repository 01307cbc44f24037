//! Stored record shapes and the two JSON decode paths.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{Error, Result};

/// A party, voter or election: an opaque value wrapped as `{"value": ...}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    pub value: serde_json::Value,
}

impl EntityRecord {
    pub fn new(value: serde_json::Value) -> Self {
        Self { value }
    }
}

/// A cast vote. The voter is encoded in the ledger key, not in the record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRecord {
    pub election_id: String,
    pub party_id: String,
}

/// One current-state query result.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StateRecord {
    #[serde(rename = "Key")]
    pub key: String,
    #[serde(rename = "Record")]
    pub record: serde_json::Value,
}

/// One entry of a key's history.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    #[serde(rename = "TxId")]
    pub tx_id: String,
    #[serde(rename = "Timestamp")]
    pub timestamp: String,
    #[serde(rename = "IsDelete")]
    pub is_delete: String,
    #[serde(rename = "Value")]
    pub value: serde_json::Value,
}

/// Decode bytes read for a caller that needs structured data. Malformed JSON
/// is an error.
pub fn decode_or_fail(key: &str, bytes: &[u8]) -> Result<serde_json::Value> {
    serde_json::from_slice(bytes).map_err(|source| Error::Decode {
        key: key.to_string(),
        source,
    })
}

/// Decode bytes drained from a bulk iterator. Malformed JSON is logged and
/// returned as the raw string so one bad record cannot fail the whole batch.
pub fn decode_or_fallback(bytes: &[u8]) -> serde_json::Value {
    let text = String::from_utf8_lossy(bytes);
    match serde_json::from_str(&text) {
        Ok(value) => value,
        Err(e) => {
            warn!("Keeping undecodable payload as raw string: {}", e);
            serde_json::Value::String(text.into_owned())
        }
    }
}
