//! The election contract: the operations a host dispatches into.

use serde_json::Value;
use std::sync::Arc;

use crate::ledger::Ledger;
use crate::materialize::materialize;
use crate::query::{self, Selector};
use crate::records::{HistoryRecord, StateRecord};
use crate::store::EntityStore;
use crate::{Error, KeyLayout, Result};

/// Election contract bound to one ledger.
///
/// Stateless between calls: each operation is one unit of work against the
/// ledger, and the ledger decides how concurrent invocations are isolated.
#[derive(Clone)]
pub struct ElectionContract {
    ledger: Arc<dyn Ledger>,
    layout: KeyLayout,
}

impl ElectionContract {
    /// Create a contract using the flat key layout.
    pub fn new(ledger: Arc<dyn Ledger>) -> Self {
        Self::with_layout(ledger, KeyLayout::Flat)
    }

    pub fn with_layout(ledger: Arc<dyn Ledger>, layout: KeyLayout) -> Self {
        Self { ledger, layout }
    }

    fn store(&self) -> EntityStore<'_> {
        EntityStore::new(self.ledger.as_ref(), self.layout)
    }

    /// Whether a non-empty value is stored at the raw ledger key `id`.
    pub async fn value_exists(&self, id: &str) -> Result<bool> {
        self.store().exists_by_key(id).await
    }

    /// Decoded JSON stored at the raw ledger key `id`.
    pub async fn read_value(&self, id: &str) -> Result<Value> {
        self.store().read_value(id).await
    }

    pub async fn create_party(&self, id: &str, value: Value) -> Result<()> {
        self.store().create_party(id, value).await
    }

    pub async fn create_voter(&self, id: &str, value: Value) -> Result<()> {
        self.store().create_voter(id, value).await
    }

    pub async fn create_election(&self, id: &str, value: Value) -> Result<()> {
        self.store().create_election(id, value).await
    }

    pub async fn create_vote(&self, election_id: &str, voter_id: &str, party_id: &str) -> Result<()> {
        self.store().create_vote(election_id, voter_id, party_id).await
    }

    pub async fn votes_for_party(&self, election_id: &str, party_id: &str) -> Result<Vec<StateRecord>> {
        query::votes_for_party(self.ledger.as_ref(), election_id, party_id).await
    }

    /// Records whose fields equal every entry of `fields`, which must be a JSON object.
    pub async fn query_by_selector(&self, fields: Value) -> Result<Vec<StateRecord>> {
        let Value::Object(fields) = fields else {
            return Err(Error::invalid_argument("selector fields must be a JSON object"));
        };
        query::query_by_selector(self.ledger.as_ref(), &Selector::from_fields(fields)).await
    }

    /// Every recorded modification of the raw ledger key `id`, oldest first.
    pub async fn history_for_key(&self, id: &str) -> Result<Vec<HistoryRecord>> {
        let iter = self.ledger.get_history_for_key(id).await?;
        materialize(iter).await
    }
}
