//! Ledger key derivation for every entity kind.
//!
//! All entities share one string-keyed namespace. With [`KeyLayout::Flat`]
//! the entity id is the ledger key and a vote lives under
//! `electionId/voterId`. [`KeyLayout::Namespaced`] prefixes each kind so a
//! voter id can never collide with a party or election id.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The kinds of entity stored in the ledger.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Party,
    Voter,
    Election,
    Vote,
}

impl EntityKind {
    pub fn label(&self) -> &'static str {
        match self {
            EntityKind::Party => "party",
            EntityKind::Voter => "voter",
            EntityKind::Election => "election",
            EntityKind::Vote => "vote",
        }
    }

    fn prefix(&self) -> &'static str {
        match self {
            EntityKind::Party => "party:",
            EntityKind::Voter => "voter:",
            EntityKind::Election => "election:",
            EntityKind::Vote => "vote:",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// How entity ids map onto ledger keys.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyLayout {
    /// Entity id is the ledger key.
    #[default]
    Flat,
    /// Entity id is prefixed with its kind (`party:`, `voter:`, ...).
    Namespaced,
}

impl KeyLayout {
    /// Ledger key for a party, voter or election id.
    pub fn entity_key(&self, kind: EntityKind, id: &str) -> String {
        match self {
            KeyLayout::Flat => id.to_string(),
            KeyLayout::Namespaced => format!("{}{}", kind.prefix(), id),
        }
    }

    /// Composite ledger key holding the single vote of `voter_id` in `election_id`.
    pub fn vote_key(&self, election_id: &str, voter_id: &str) -> String {
        let composite = format!("{}/{}", election_id, voter_id);
        self.entity_key(EntityKind::Vote, &composite)
    }
}
