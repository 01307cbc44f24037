//! Conformance tests for the election contract.
//!
//! Grouped by property: existence (EX), entity creation (EC), vote casting
//! (VC), queries (QY) and materialization (MZ).

use ezballot_core::{
    ElectionContract, EntityKind, Error, KeyLayout, KeyValue, Ledger, MemoryLedger,
    SnapshotIterator, materialize::materialize,
};
use proptest::prelude::*;
use serde_json::json;
use std::sync::Arc;

// =============================================================================
// Test Utilities
// =============================================================================

fn new_contract() -> (ElectionContract, Arc<MemoryLedger>) {
    let ledger = Arc::new(MemoryLedger::new());
    (ElectionContract::new(ledger.clone()), ledger)
}

/// Contract with election E1, voter V1 and parties P1, P2.
async fn seeded_contract() -> ElectionContract {
    let (contract, _) = new_contract();
    contract.create_election("E1", json!("general")).await.unwrap();
    contract.create_voter("V1", json!({"name": "Ada"})).await.unwrap();
    contract.create_party("P1", json!("Greens")).await.unwrap();
    contract.create_party("P2", json!("Reds")).await.unwrap();
    contract
}

// =============================================================================
// EX: Existence
// =============================================================================

proptest! {
    /// EX-01: Keys never written do not exist and cannot be read.
    #[test]
    fn ex_01_unwritten_keys_absent(id in "[A-Za-z0-9:/_-]{1,24}") {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let (contract, _) = new_contract();
            prop_assert!(!contract.value_exists(&id).await.unwrap());
            let is_not_found = matches!(
                contract.read_value(&id).await,
                Err(Error::NotFound { .. })
            );
            prop_assert!(is_not_found);
            Ok(())
        })?;
    }
}

/// EX-02: A zero-length stored value counts as absent.
#[tokio::test]
async fn ex_02_empty_value_is_absent() {
    let (contract, ledger) = new_contract();
    ledger.put_state("P1", Vec::new()).await.unwrap();

    assert!(!contract.value_exists("P1").await.unwrap());
    contract.create_party("P1", json!("ok")).await.unwrap();
    assert!(contract.value_exists("P1").await.unwrap());
}

// =============================================================================
// EC: Entity Creation
// =============================================================================

/// EC-01: A created entity exists and reads back wrapped in `value`.
#[tokio::test]
async fn ec_01_create_then_read() {
    let (contract, _) = new_contract();
    contract
        .create_party("P1", json!({"leader": "Grace"}))
        .await
        .unwrap();

    assert!(contract.value_exists("P1").await.unwrap());
    assert_eq!(
        contract.read_value("P1").await.unwrap(),
        json!({"value": {"leader": "Grace"}})
    );
}

/// EC-02: Creation is write-once; a second create fails and changes nothing.
#[tokio::test]
async fn ec_02_create_is_write_once() {
    let (contract, _) = new_contract();
    contract.create_party("P1", json!("first")).await.unwrap();

    let err = contract.create_party("P1", json!("second")).await.unwrap_err();
    assert!(matches!(
        err,
        Error::AlreadyExists {
            kind: EntityKind::Party,
            ref id,
        } if id == "P1"
    ));
    assert_eq!(
        contract.read_value("P1").await.unwrap(),
        json!({"value": "first"})
    );
}

/// EC-03: Voters and elections follow the same protocol.
#[tokio::test]
async fn ec_03_all_kinds_are_write_once() {
    let (contract, _) = new_contract();
    contract.create_voter("V1", json!(1)).await.unwrap();
    contract.create_election("E1", json!(2)).await.unwrap();

    assert!(matches!(
        contract.create_voter("V1", json!(3)).await,
        Err(Error::AlreadyExists {
            kind: EntityKind::Voter,
            ..
        })
    ));
    assert!(matches!(
        contract.create_election("E1", json!(4)).await,
        Err(Error::AlreadyExists {
            kind: EntityKind::Election,
            ..
        })
    ));
}

/// EC-04: Concurrent creates of one party id store exactly one value.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn ec_04_concurrent_creates_store_one() {
    let (contract, ledger) = new_contract();
    let contract = Arc::new(contract);

    let mut handles = Vec::new();
    for i in 0..16 {
        let contract = contract.clone();
        handles.push(tokio::spawn(async move {
            contract.create_party("P1", json!(i)).await.map(|()| i)
        }));
    }

    let mut winners = Vec::new();
    for handle in handles {
        match handle.await.unwrap() {
            Ok(i) => winners.push(i),
            Err(Error::AlreadyExists {
                kind: EntityKind::Party,
                ..
            }) => {}
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
    assert_eq!(winners.len(), 1);
    assert_eq!(
        contract.read_value("P1").await.unwrap(),
        json!({"value": winners[0]})
    );

    let mut history = ledger.get_history_for_key("P1").await.unwrap();
    assert!(history.next().await.unwrap().is_some());
    assert!(history.next().await.unwrap().is_none());
}

// =============================================================================
// VC: Vote Casting
// =============================================================================

/// VC-01: Missing references are reported in election, voter, party order.
#[tokio::test]
async fn vc_01_reference_checks_in_order() {
    let (contract, _) = new_contract();

    let err = contract.create_vote("E1", "V1", "P1").await.unwrap_err();
    assert!(matches!(
        err,
        Error::NotFound {
            kind: Some(EntityKind::Election),
            ..
        }
    ));

    contract.create_election("E1", json!("e")).await.unwrap();
    let err = contract.create_vote("E1", "V1", "P1").await.unwrap_err();
    assert!(matches!(
        err,
        Error::NotFound {
            kind: Some(EntityKind::Voter),
            ..
        }
    ));

    contract.create_voter("V1", json!("v")).await.unwrap();
    let err = contract.create_vote("E1", "V1", "P1").await.unwrap_err();
    assert!(matches!(
        err,
        Error::NotFound {
            kind: Some(EntityKind::Party),
            ..
        }
    ));

    contract.create_party("P1", json!("p")).await.unwrap();
    contract.create_vote("E1", "V1", "P1").await.unwrap();
    assert!(contract.value_exists("E1/V1").await.unwrap());
}

/// VC-02: A voter votes at most once per election, whatever the party.
#[tokio::test]
async fn vc_02_duplicate_vote_rejected() {
    let contract = seeded_contract().await;
    contract.create_vote("E1", "V1", "P1").await.unwrap();

    for party in ["P1", "P2", "missing"] {
        let err = contract.create_vote("E1", "V1", party).await.unwrap_err();
        assert!(matches!(err, Error::DuplicateVote { .. }), "party {party}");
    }
    assert_eq!(
        contract.read_value("E1/V1").await.unwrap(),
        json!({"electionId": "E1", "partyId": "P1"})
    );
}

/// VC-03: The same voter may vote once in each election.
#[tokio::test]
async fn vc_03_one_vote_per_election() {
    let contract = seeded_contract().await;
    contract.create_election("E2", json!("runoff")).await.unwrap();

    contract.create_vote("E1", "V1", "P1").await.unwrap();
    contract.create_vote("E2", "V1", "P2").await.unwrap();
}

/// VC-04: Concurrent votes for one (election, voter) pair record exactly one.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn vc_04_concurrent_votes_record_one() {
    let contract = Arc::new(seeded_contract().await);

    let mut handles = Vec::new();
    for i in 0..16 {
        let contract = contract.clone();
        let party = if i % 2 == 0 { "P1" } else { "P2" };
        handles.push(tokio::spawn(async move {
            contract.create_vote("E1", "V1", party).await
        }));
    }

    let mut accepted = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(()) => accepted += 1,
            Err(Error::DuplicateVote { .. }) => {}
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
    assert_eq!(accepted, 1);
}

// =============================================================================
// QY: Queries
// =============================================================================

/// QY-01: A cast vote is returned for its party only.
#[tokio::test]
async fn qy_01_votes_for_party() {
    let contract = seeded_contract().await;
    contract.create_vote("E1", "V1", "P1").await.unwrap();

    let votes = contract.votes_for_party("E1", "P1").await.unwrap();
    assert_eq!(votes.len(), 1);
    assert_eq!(votes[0].key, "E1/V1");
    assert_eq!(votes[0].record, json!({"electionId": "E1", "partyId": "P1"}));

    assert!(contract.votes_for_party("E1", "P2").await.unwrap().is_empty());
    assert!(contract.votes_for_party("E2", "P1").await.unwrap().is_empty());
}

/// QY-02: Namespaced keys keep the same query results.
#[tokio::test]
async fn qy_02_namespaced_layout_queries() {
    let ledger = Arc::new(MemoryLedger::new());
    let contract = ElectionContract::with_layout(ledger, KeyLayout::Namespaced);
    contract.create_election("S", json!("e")).await.unwrap();
    contract.create_voter("S", json!("v")).await.unwrap();
    contract.create_party("S", json!("p")).await.unwrap();
    contract.create_vote("S", "S", "S").await.unwrap();

    let votes = contract.votes_for_party("S", "S").await.unwrap();
    assert_eq!(votes.len(), 1);
    assert_eq!(votes[0].key, "vote:S/S");
}

// =============================================================================
// MZ: Materialization
// =============================================================================

/// MZ-01: One malformed payload does not disturb its neighbours.
#[tokio::test]
async fn mz_01_fallback_is_local() {
    let items: Vec<KeyValue> = (0..5)
        .map(|i| KeyValue {
            key: format!("k{i}"),
            value: if i == 2 {
                b"{oops".to_vec()
            } else {
                serde_json::to_vec(&json!({"i": i})).unwrap()
            },
        })
        .collect();

    let records = materialize::<KeyValue>(Box::new(SnapshotIterator::new(items)))
        .await
        .unwrap();
    assert_eq!(records.len(), 5);
    for (i, record) in records.iter().enumerate() {
        assert_eq!(record.key, format!("k{i}"));
        if i == 2 {
            assert_eq!(record.record, json!("{oops"));
        } else {
            assert_eq!(record.record, json!({"i": i}));
        }
    }
}

// =============================================================================
// Scenario
// =============================================================================

/// Full election walk-through.
#[tokio::test]
async fn scenario_single_vote() {
    let (contract, _) = new_contract();
    contract.create_election("E1", json!("e")).await.unwrap();
    contract.create_voter("V1", json!("v")).await.unwrap();
    contract.create_party("P1", json!("p1")).await.unwrap();
    contract.create_party("P2", json!("p2")).await.unwrap();

    contract.create_vote("E1", "V1", "P1").await.unwrap();
    assert!(matches!(
        contract.create_vote("E1", "V1", "P2").await,
        Err(Error::DuplicateVote { .. })
    ));

    let votes = contract.votes_for_party("E1", "P1").await.unwrap();
    assert_eq!(votes.len(), 1);
}
