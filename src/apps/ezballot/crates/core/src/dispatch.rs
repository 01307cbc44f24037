//! String-keyed invocation of contract operations.
//!
//! A host delivers a function name and positional string arguments; the
//! result comes back as JSON bytes. Writes return `null`.

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::{ElectionContract, Error, Result};

/// Every function name [`ElectionContract::invoke`] accepts.
pub const FUNCTIONS: &[&str] = &[
    "valueExists",
    "readValue",
    "createParty",
    "createVoter",
    "createElection",
    "createVote",
    "votesForParty",
    "queryBySelector",
    "historyForKey",
];

fn expect_args<'a, const N: usize>(function: &str, args: &'a [String]) -> Result<[&'a str; N]> {
    if args.len() != N {
        return Err(Error::invalid_argument(format!(
            "{} expects {} argument(s), got {}",
            function,
            N,
            args.len()
        )));
    }
    Ok(std::array::from_fn(|i| args[i].as_str()))
}

/// Entity values arrive as strings and are stored as given.
fn entity_value(raw: &str) -> Value {
    Value::String(raw.to_string())
}

fn to_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(value)?)
}

impl ElectionContract {
    /// Invoke `function` with positional `args`.
    pub async fn invoke(&self, function: &str, args: &[String]) -> Result<Vec<u8>> {
        debug!("Invoking {} with {} argument(s)", function, args.len());
        let result = self.invoke_inner(function, args).await;
        if let Err(e) = &result {
            warn!("{} failed ({}): {}", function, e.category(), e);
        }
        result
    }

    async fn invoke_inner(&self, function: &str, args: &[String]) -> Result<Vec<u8>> {
        match function {
            "valueExists" => {
                let [id] = expect_args::<1>(function, args)?;
                to_bytes(&self.value_exists(id).await?)
            }
            "readValue" => {
                let [id] = expect_args::<1>(function, args)?;
                to_bytes(&self.read_value(id).await?)
            }
            "createParty" => {
                let [id, value] = expect_args::<2>(function, args)?;
                self.create_party(id, entity_value(value)).await?;
                to_bytes(&Value::Null)
            }
            "createVoter" => {
                let [id, value] = expect_args::<2>(function, args)?;
                self.create_voter(id, entity_value(value)).await?;
                to_bytes(&Value::Null)
            }
            "createElection" => {
                let [id, value] = expect_args::<2>(function, args)?;
                self.create_election(id, entity_value(value)).await?;
                to_bytes(&Value::Null)
            }
            "createVote" => {
                let [election_id, voter_id, party_id] = expect_args::<3>(function, args)?;
                self.create_vote(election_id, voter_id, party_id).await?;
                to_bytes(&Value::Null)
            }
            "votesForParty" => {
                let [election_id, party_id] = expect_args::<2>(function, args)?;
                to_bytes(&self.votes_for_party(election_id, party_id).await?)
            }
            "queryBySelector" => {
                let [fields] = expect_args::<1>(function, args)?;
                let fields: Value = serde_json::from_str(fields).map_err(|e| {
                    Error::invalid_argument(format!("selector fields are not JSON: {}", e))
                })?;
                to_bytes(&self.query_by_selector(fields).await?)
            }
            "historyForKey" => {
                let [id] = expect_args::<1>(function, args)?;
                to_bytes(&self.history_for_key(id).await?)
            }
            _ => Err(Error::invalid_argument(format!("unknown function: {}", function))),
        }
    }
}
