//! ezballot-core: election records on a key-value ledger.
//!
//! This crate implements:
//! - `Ledger`: the collaborator contract for point reads, writes and queries
//! - `EntityStore`: write-once parties, voters and elections, and one vote per voter per election
//! - `materialize`: drains a ledger iterator into decoded records
//! - `ElectionContract`: the operations a host invokes, by method or by name

mod contract;
mod dispatch;
mod error;
mod keys;
pub mod ledger;
pub mod materialize;
mod memory;
pub mod query;
mod records;
mod store;

pub use contract::ElectionContract;
pub use dispatch::FUNCTIONS;
pub use error::{Error, Result};
pub use keys::{EntityKind, KeyLayout};
pub use ledger::{KeyModification, KeyValue, Ledger, ResultIterator};
pub use memory::{MemoryLedger, SnapshotIterator, SnapshotLock};
pub use query::Selector;
pub use records::{
    EntityRecord, HistoryRecord, StateRecord, VoteRecord, decode_or_fail, decode_or_fallback,
};
pub use store::EntityStore;
