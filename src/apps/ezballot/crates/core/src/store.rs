//! Entity store: write-once creation and referential checks over the ledger.

use tracing::{debug, info, warn};

use crate::ledger::Ledger;
use crate::records::{EntityRecord, VoteRecord, decode_or_fail};
use crate::{EntityKind, Error, KeyLayout, Result};

/// Creation and lookup of parties, voters, elections and votes.
///
/// Holds no state of its own; every call re-reads the ledger.
pub struct EntityStore<'a> {
    ledger: &'a dyn Ledger,
    layout: KeyLayout,
}

impl<'a> EntityStore<'a> {
    pub fn new(ledger: &'a dyn Ledger, layout: KeyLayout) -> Self {
        Self { ledger, layout }
    }

    /// A key exists when it holds a non-empty value.
    pub async fn exists_by_key(&self, key: &str) -> Result<bool> {
        let value = self.ledger.get_state(key).await?;
        Ok(value.is_some_and(|bytes| !bytes.is_empty()))
    }

    /// Read and decode the JSON stored at `key`.
    pub async fn read_value(&self, key: &str) -> Result<serde_json::Value> {
        if !self.exists_by_key(key).await? {
            return Err(Error::key_not_found(key));
        }
        let bytes = self
            .ledger
            .get_state(key)
            .await?
            .ok_or_else(|| Error::key_not_found(key))?;
        decode_or_fail(key, &bytes)
    }

    pub async fn create_party(&self, id: &str, value: serde_json::Value) -> Result<()> {
        self.create_entity(EntityKind::Party, id, value).await
    }

    pub async fn create_voter(&self, id: &str, value: serde_json::Value) -> Result<()> {
        self.create_entity(EntityKind::Voter, id, value).await
    }

    pub async fn create_election(&self, id: &str, value: serde_json::Value) -> Result<()> {
        self.create_entity(EntityKind::Election, id, value).await
    }

    async fn create_entity(
        &self,
        kind: EntityKind,
        id: &str,
        value: serde_json::Value,
    ) -> Result<()> {
        let key = self.layout.entity_key(kind, id);
        if self.exists_by_key(&key).await? {
            warn!("Refusing to recreate {} {}", kind, id);
            return Err(Error::already_exists(kind, id));
        }

        let bytes = serde_json::to_vec(&EntityRecord::new(value))?;
        if !self.ledger.put_state_if_absent(&key, bytes).await? {
            warn!("{} {} was created concurrently", kind, id);
            return Err(Error::already_exists(kind, id));
        }

        info!("Created {} {}", kind, id);
        Ok(())
    }

    /// Cast the single vote of `voter_id` in `election_id` for `party_id`.
    ///
    /// Checks run in a fixed order and stop at the first failure: duplicate
    /// vote, then election, voter and party existence.
    pub async fn create_vote(
        &self,
        election_id: &str,
        voter_id: &str,
        party_id: &str,
    ) -> Result<()> {
        let vote_key = self.layout.vote_key(election_id, voter_id);
        let duplicate = || Error::DuplicateVote {
            election_id: election_id.to_string(),
            voter_id: voter_id.to_string(),
        };

        if self.exists_by_key(&vote_key).await? {
            warn!("Voter {} already voted in {}", voter_id, election_id);
            return Err(duplicate());
        }

        let references = [
            (EntityKind::Election, election_id),
            (EntityKind::Voter, voter_id),
            (EntityKind::Party, party_id),
        ];
        for (kind, id) in references {
            let key = self.layout.entity_key(kind, id);
            if !self.exists_by_key(&key).await? {
                warn!("Vote references missing {} {}", kind, id);
                return Err(Error::not_found(kind, id));
            }
            debug!("{} {} present", kind, id);
        }

        let record = VoteRecord {
            election_id: election_id.to_string(),
            party_id: party_id.to_string(),
        };
        let bytes = serde_json::to_vec(&record)?;
        if !self.ledger.put_state_if_absent(&vote_key, bytes).await? {
            warn!("Vote {} was cast concurrently", vote_key);
            return Err(duplicate());
        }

        info!("Recorded vote {} for party {}", vote_key, party_id);
        Ok(())
    }
}
