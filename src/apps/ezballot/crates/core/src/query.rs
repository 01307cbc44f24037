//! Selector queries over current ledger state.

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::Result;
use crate::ledger::Ledger;
use crate::materialize::materialize;
use crate::records::StateRecord;

/// A conjunctive exact-match selector document: `{"selector": {field: value, ...}}`.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Selector {
    selector: Map<String, Value>,
}

impl Selector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `field` to equal `value`.
    pub fn field<V: Into<Value>>(mut self, field: &str, value: V) -> Self {
        self.selector.insert(field.to_string(), value.into());
        self
    }

    pub fn from_fields(fields: Map<String, Value>) -> Self {
        Self { selector: fields }
    }

    pub fn to_query_string(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Run `selector` against the ledger and materialize every match.
pub async fn query_by_selector(ledger: &dyn Ledger, selector: &Selector) -> Result<Vec<StateRecord>> {
    let query = selector.to_query_string()?;
    debug!("Running selector query {}", query);
    let iter = ledger.get_query_result(&query).await?;
    materialize(iter).await
}

/// Every vote cast for `party_id` in `election_id`.
pub async fn votes_for_party(
    ledger: &dyn Ledger,
    election_id: &str,
    party_id: &str,
) -> Result<Vec<StateRecord>> {
    let selector = Selector::new()
        .field("electionId", election_id)
        .field("partyId", party_id);
    query_by_selector(ledger, &selector).await
}
