//! Error types for ezballot-core.

use thiserror::Error;

use crate::EntityKind;

/// Core errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Key absent when presence is required. `kind` is `None` for raw key reads.
    #[error("the {} {id} does not exist", .kind.map_or("value", |k| k.label()))]
    NotFound {
        kind: Option<EntityKind>,
        id: String,
    },

    /// Key present when absence is required.
    #[error("the {kind} {id} already exists")]
    AlreadyExists { kind: EntityKind, id: String },

    /// A vote already exists for this (election, voter) pair.
    #[error("voter {voter_id} has already voted in election {election_id}")]
    DuplicateVote {
        election_id: String,
        voter_id: String,
    },

    /// Stored bytes under `key` are not valid JSON.
    #[error("value stored at {key} is not valid JSON: {source}")]
    Decode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Malformed selector query document.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// Invocation with the wrong function name or arguments.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Failure reported by the ledger collaborator.
    #[error("ledger error: {0}")]
    Ledger(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for ezballot-core operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn not_found<S: Into<String>>(kind: EntityKind, id: S) -> Self {
        Self::NotFound {
            kind: Some(kind),
            id: id.into(),
        }
    }

    pub fn key_not_found<S: Into<String>>(key: S) -> Self {
        Self::NotFound {
            kind: None,
            id: key.into(),
        }
    }

    pub fn already_exists<S: Into<String>>(kind: EntityKind, id: S) -> Self {
        Self::AlreadyExists {
            kind,
            id: id.into(),
        }
    }

    pub fn invalid_argument<S: Into<String>>(message: S) -> Self {
        Self::InvalidArgument(message.into())
    }

    pub fn ledger<S: Into<String>>(message: S) -> Self {
        Self::Ledger(message.into())
    }

    /// Get the error category for logging.
    pub fn category(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::AlreadyExists { .. } => "already_exists",
            Self::DuplicateVote { .. } => "duplicate_vote",
            Self::Decode { .. } => "decode",
            Self::Serialization(_) => "serialization",
            Self::InvalidQuery(_) => "invalid_query",
            Self::InvalidArgument(_) => "invalid_argument",
            Self::Ledger(_) => "ledger",
            Self::Io(_) => "io",
        }
    }
}
