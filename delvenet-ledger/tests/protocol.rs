use std::sync::Arc;

use delvenet_fhe::MockFheEngine;
use delvenet_ledger::{
    ActorId, LedgerError, PartyKeeper, ProtocolConfig, ProtocolEvent, UnixSecs,
};
use delvenet_oracle::{
    CommitmentVerifier, DecryptionProof, MockDecryptionOracle, ProofVerifier, RequestId,
};

const COOLDOWN: u64 = 60;
const T0: UnixSecs = 1_700_000_000;

struct Harness {
    keeper: PartyKeeper,
    engine: Arc<MockFheEngine>,
    oracle: Arc<MockDecryptionOracle>,
}

fn owner() -> ActorId {
    ActorId::new("owner")
}

fn harness() -> Harness {
    let engine = Arc::new(MockFheEngine::new());
    let oracle = Arc::new(MockDecryptionOracle::new(engine.clone(), 42));
    let config = ProtocolConfig {
        cooldown_secs: COOLDOWN,
        ..ProtocolConfig::sample()
    };
    let mut keeper = PartyKeeper::new(
        config,
        owner(),
        engine.clone(),
        oracle.clone(),
        Arc::new(CommitmentVerifier),
    );
    keeper
        .add_provider(&owner(), ActorId::new("alice"))
        .expect("register alice");
    keeper
        .add_provider(&owner(), ActorId::new("bob"))
        .expect("register bob");
    Harness {
        keeper,
        engine,
        oracle,
    }
}

fn submit(
    harness: &mut Harness,
    provider: &str,
    batch_id: u64,
    values: (u64, u64, u64),
    now: UnixSecs,
) -> Result<(), LedgerError> {
    let (s, a, i) = values;
    harness.keeper.submit_attributes(
        &ActorId::new(provider),
        batch_id,
        harness.engine.encrypt(s),
        harness.engine.encrypt(a),
        harness.engine.encrypt(i),
        now,
    )
}

fn deliver(harness: &mut Harness, request_id: RequestId) -> Result<[u64; 4], LedgerError> {
    let response = harness.oracle.fulfill(request_id).expect("oracle fulfil");
    let cleartexts: [u64; 4] = response
        .cleartexts
        .clone()
        .try_into()
        .expect("four cleartexts");
    harness
        .keeper
        .on_decryption_result(request_id, cleartexts, &response.proof)
        .map(|party| [party.strength, party.agility, party.intellect, party.seed])
}

#[test]
fn scenario_two_submissions_then_reveal() {
    let mut harness = harness();
    let batch_id = harness.keeper.open_batch(&owner()).expect("open");

    submit(&mut harness, "alice", batch_id, (5, 3, 4), T0).expect("alice submits");
    submit(&mut harness, "bob", batch_id, (4, 5, 2), T0).expect("bob submits");

    let request_id = harness
        .keeper
        .generate_seed(&owner(), batch_id, T0)
        .expect("seed generation");
    let revealed = deliver(&mut harness, request_id).expect("finalize");
    assert_eq!(revealed, [9, 8, 6, 78]);

    let events = harness.keeper.drain_events();
    assert!(matches!(
        events.first(),
        Some(ProtocolEvent::BatchOpened { batch_id: 0 })
    ));
    assert!(events.iter().any(|event| matches!(
        event,
        ProtocolEvent::DecryptionCompleted {
            strength: 9,
            agility: 8,
            intellect: 6,
            seed: 78,
            ..
        }
    )));
}

#[test]
fn submission_during_pending_decryption_invalidates_the_result() {
    let mut harness = harness();
    let batch_id = harness.keeper.open_batch(&owner()).expect("open");
    submit(&mut harness, "alice", batch_id, (5, 3, 4), T0).expect("alice submits");
    submit(&mut harness, "bob", batch_id, (4, 5, 2), T0).expect("bob submits");
    let request_id = harness
        .keeper
        .generate_seed(&owner(), batch_id, T0)
        .expect("seed generation");

    // A third provider lands a contribution inside the request/response
    // window. The oracle still answers for the snapshotted handles and the
    // proof verifies, yet delivery must fail.
    harness
        .keeper
        .add_provider(&owner(), ActorId::new("carol"))
        .expect("register carol");
    submit(&mut harness, "carol", batch_id, (1, 1, 1), T0).expect("carol submits");

    let response = harness.oracle.fulfill(request_id).expect("oracle fulfil");
    assert!(CommitmentVerifier.verify(request_id, &response.cleartexts, &response.proof));

    let err = deliver(&mut harness, request_id).unwrap_err();
    assert!(matches!(err, LedgerError::StateMismatch { .. }));

    // The stale context is terminal; a fresh request over the new state
    // reveals the updated aggregate.
    let retry_at = T0 + COOLDOWN;
    let second = harness
        .keeper
        .generate_seed(&owner(), batch_id, retry_at)
        .expect("fresh seed generation");
    let revealed = deliver(&mut harness, second).expect("finalize fresh request");
    assert_eq!(revealed, [10, 9, 7, 97]);

    let replay = deliver(&mut harness, request_id).unwrap_err();
    assert!(matches!(replay, LedgerError::StateMismatch { .. }));
}

#[test]
fn replayed_result_is_rejected_exactly_once_processed() {
    let mut harness = harness();
    let batch_id = harness.keeper.open_batch(&owner()).expect("open");
    submit(&mut harness, "alice", batch_id, (2, 2, 2), T0).expect("submit");
    let request_id = harness
        .keeper
        .generate_seed(&owner(), batch_id, T0)
        .expect("seed generation");

    deliver(&mut harness, request_id).expect("first delivery");
    let err = deliver(&mut harness, request_id).unwrap_err();
    assert!(matches!(err, LedgerError::ReplayAttempt { .. }));

    let context = harness
        .keeper
        .pending_request(request_id)
        .expect("context retained for audit");
    assert!(context.processed);
}

#[test]
fn unknown_request_id_is_rejected() {
    let mut harness = harness();
    harness.keeper.open_batch(&owner()).expect("open");
    let proof = DecryptionProof::commit(RequestId(999), &[0, 0, 0, 0]);
    let err = harness
        .keeper
        .on_decryption_result(RequestId(999), [0, 0, 0, 0], &proof)
        .unwrap_err();
    assert!(matches!(err, LedgerError::InvalidBatchId));
}

#[test]
fn invalid_proof_is_rejected_without_consuming_the_context() {
    let mut harness = harness();
    let batch_id = harness.keeper.open_batch(&owner()).expect("open");
    submit(&mut harness, "alice", batch_id, (3, 3, 3), T0).expect("submit");
    let request_id = harness
        .keeper
        .generate_seed(&owner(), batch_id, T0)
        .expect("seed generation");

    let response = harness.oracle.fulfill(request_id).expect("oracle fulfil");
    let err = harness
        .keeper
        .on_decryption_result(request_id, [1, 2, 3, 4], &response.proof)
        .unwrap_err();
    assert!(matches!(err, LedgerError::ProofInvalid { .. }));

    // The failed attempt neither finalized nor burned the request.
    let genuine: [u64; 4] = response.cleartexts.try_into().expect("four cleartexts");
    harness
        .keeper
        .on_decryption_result(request_id, genuine, &response.proof)
        .expect("genuine result still lands");
}

#[test]
fn role_gating_blocks_outsiders_and_removed_providers() {
    let mut harness = harness();
    let batch_id = harness.keeper.open_batch(&owner()).expect("open");

    let err = submit(&mut harness, "mallory", batch_id, (1, 1, 1), T0).unwrap_err();
    assert!(matches!(err, LedgerError::NotProvider));

    submit(&mut harness, "alice", batch_id, (1, 1, 1), T0).expect("alice is registered");
    harness
        .keeper
        .remove_provider(&owner(), &ActorId::new("alice"))
        .expect("deregister alice");
    let err = submit(&mut harness, "alice", batch_id, (1, 1, 1), T0 + COOLDOWN).unwrap_err();
    assert!(matches!(err, LedgerError::NotProvider));
}

#[test]
fn pause_is_checked_before_role_and_batch_state() {
    let mut harness = harness();
    let batch_id = harness.keeper.open_batch(&owner()).expect("open");
    harness.keeper.set_paused(&owner(), true).expect("pause");

    // Even a caller who would fail the role check sees `Paused` first.
    let err = submit(&mut harness, "mallory", batch_id, (1, 1, 1), T0).unwrap_err();
    assert!(matches!(err, LedgerError::Paused));
    let err = harness
        .keeper
        .generate_seed(&ActorId::new("mallory"), batch_id, T0)
        .unwrap_err();
    assert!(matches!(err, LedgerError::Paused));
    let err = harness.keeper.open_batch(&owner()).unwrap_err();
    assert!(matches!(err, LedgerError::Paused));

    harness.keeper.set_paused(&owner(), false).expect("resume");
    submit(&mut harness, "alice", batch_id, (1, 1, 1), T0).expect("submissions resume");
}

#[test]
fn submission_cooldown_boundary_is_exact() {
    let mut harness = harness();
    let batch_id = harness.keeper.open_batch(&owner()).expect("open");

    submit(&mut harness, "alice", batch_id, (1, 1, 1), T0).expect("first");
    let err = submit(&mut harness, "alice", batch_id, (1, 1, 1), T0 + COOLDOWN - 1).unwrap_err();
    assert!(matches!(err, LedgerError::CooldownActive { .. }));
    submit(&mut harness, "alice", batch_id, (1, 1, 1), T0 + COOLDOWN)
        .expect("boundary is inclusive");
}

#[test]
fn submission_and_seed_cooldowns_are_independent() {
    let mut harness = harness();
    let batch_id = harness.keeper.open_batch(&owner()).expect("open");

    submit(&mut harness, "alice", batch_id, (1, 1, 1), T0).expect("submit");
    harness
        .keeper
        .generate_seed(&ActorId::new("alice"), batch_id, T0)
        .expect("seed generation is not throttled by the submit window");
}

#[test]
fn failed_operation_does_not_consume_the_cooldown() {
    let mut harness = harness();
    let batch_id = harness.keeper.open_batch(&owner()).expect("open");

    // Fails on batch state, after the cooldown check position.
    let err = submit(&mut harness, "alice", batch_id + 1, (1, 1, 1), T0).unwrap_err();
    assert!(matches!(err, LedgerError::BatchClosed { .. }));
    submit(&mut harness, "alice", batch_id, (1, 1, 1), T0)
        .expect("cooldown untouched by the failed call");
}

#[test]
fn only_one_batch_is_active_and_ids_advance() {
    let mut harness = harness();
    let first = harness.keeper.open_batch(&owner()).expect("open");
    submit(&mut harness, "alice", first, (5, 5, 5), T0).expect("submit");
    let frozen = harness.keeper.batch(first).expect("batch").strength;

    let second = harness.keeper.open_batch(&owner()).expect("reopen");
    assert!(first < second);

    let superseded = harness.keeper.batch(first).expect("retained");
    assert!(!superseded.open);
    assert_eq!(superseded.strength, frozen);

    let err = submit(&mut harness, "alice", first, (1, 1, 1), T0 + COOLDOWN).unwrap_err();
    assert!(matches!(err, LedgerError::BatchClosed { .. }));
    submit(&mut harness, "alice", second, (1, 1, 1), T0 + COOLDOWN)
        .expect("current batch accepts submissions");
}

#[test]
fn homomorphic_sums_match_plaintext_totals() {
    let mut harness = harness();
    let batch_id = harness.keeper.open_batch(&owner()).expect("open");
    let contributions = [(5, 3, 4), (4, 5, 2), (7, 11, 13)];
    harness
        .keeper
        .add_provider(&owner(), ActorId::new("carol"))
        .expect("register carol");
    for (provider, values) in ["alice", "bob", "carol"].into_iter().zip(contributions) {
        submit(&mut harness, provider, batch_id, values, T0).expect("submit");
    }

    let batch = harness.keeper.batch(batch_id).expect("batch");
    assert_eq!(harness.engine.reveal(&batch.strength).unwrap(), 16);
    assert_eq!(harness.engine.reveal(&batch.agility).unwrap(), 19);
    assert_eq!(harness.engine.reveal(&batch.intellect).unwrap(), 19);
}

#[test]
fn generate_seed_requires_an_open_batch() {
    let mut harness = harness();
    let batch_id = harness.keeper.open_batch(&owner()).expect("open");
    harness.keeper.close_batch(&owner()).expect("close");
    let err = harness
        .keeper
        .generate_seed(&owner(), batch_id, T0)
        .unwrap_err();
    assert!(matches!(err, LedgerError::BatchClosed { .. }));
}

#[test]
fn decryption_survives_batch_supersession_when_state_is_unchanged() {
    // Opening a new batch retires the old one but does not touch its
    // accumulators, so a pending decryption over the old batch still matches
    // its snapshot and may finalize.
    let mut harness = harness();
    let first = harness.keeper.open_batch(&owner()).expect("open");
    submit(&mut harness, "alice", first, (2, 3, 4), T0).expect("submit");
    let request_id = harness
        .keeper
        .generate_seed(&owner(), first, T0)
        .expect("seed generation");

    harness.keeper.open_batch(&owner()).expect("supersede");
    let revealed = deliver(&mut harness, request_id).expect("finalize against old batch");
    assert_eq!(revealed, [2, 3, 4, 10]);
}

#[test]
fn generate_seed_leaves_accumulators_untouched() {
    let mut harness = harness();
    let batch_id = harness.keeper.open_batch(&owner()).expect("open");
    submit(&mut harness, "alice", batch_id, (5, 3, 4), T0).expect("submit");
    let before = {
        let batch = harness.keeper.batch(batch_id).expect("batch");
        (batch.strength, batch.agility, batch.intellect)
    };
    harness
        .keeper
        .generate_seed(&owner(), batch_id, T0)
        .expect("seed generation");
    let batch = harness.keeper.batch(batch_id).expect("batch");
    assert_eq!(
        (batch.strength, batch.agility, batch.intellect),
        before
    );
    assert!(batch.seed.is_some());
}
