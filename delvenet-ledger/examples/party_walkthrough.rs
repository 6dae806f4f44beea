//! End-to-end walkthrough: two providers contribute, the oracle reveals the
//! aggregate, and a contribution racing a pending request gets rejected.
//!
//! Run with `cargo run -p delvenet-ledger --example party_walkthrough`.

use std::sync::Arc;

use delvenet_fhe::MockFheEngine;
use delvenet_ledger::{ActorId, LedgerError, PartyKeeper, ProtocolConfig};
use delvenet_oracle::{CommitmentVerifier, MockDecryptionOracle};

fn main() -> anyhow::Result<()> {
    let engine = Arc::new(MockFheEngine::new());
    let oracle = Arc::new(MockDecryptionOracle::new(engine.clone(), 1));
    let owner = ActorId::new("owner");
    let mut keeper = PartyKeeper::new(
        ProtocolConfig::sample(),
        owner.clone(),
        engine.clone(),
        oracle.clone(),
        Arc::new(CommitmentVerifier),
    );

    for provider in ["alice", "bob", "carol"] {
        keeper.add_provider(&owner, ActorId::new(provider))?;
    }

    let now = 1_700_000_000;
    let batch_id = keeper.open_batch(&owner)?;
    println!("opened batch {batch_id}");

    keeper.submit_attributes(
        &ActorId::new("alice"),
        batch_id,
        engine.encrypt(5),
        engine.encrypt(3),
        engine.encrypt(4),
        now,
    )?;
    keeper.submit_attributes(
        &ActorId::new("bob"),
        batch_id,
        engine.encrypt(4),
        engine.encrypt(5),
        engine.encrypt(2),
        now,
    )?;

    let request_id = keeper.generate_seed(&owner, batch_id, now)?;
    println!("decryption requested: {request_id}");

    // Carol's contribution lands while the request is in flight.
    keeper.submit_attributes(
        &ActorId::new("carol"),
        batch_id,
        engine.encrypt(1),
        engine.encrypt(1),
        engine.encrypt(1),
        now,
    )?;

    let stale = oracle.fulfill(request_id)?;
    let cleartexts: [u64; 4] = stale.cleartexts.clone().try_into().expect("four values");
    match keeper.on_decryption_result(request_id, cleartexts, &stale.proof) {
        Err(LedgerError::StateMismatch { .. }) => {
            println!("stale result rejected, as intended");
        }
        other => anyhow::bail!("expected a stale-snapshot rejection, got {other:?}"),
    }

    // A fresh request over the settled state finalizes.
    let retry = keeper.generate_seed(&owner, batch_id, now + 60)?;
    let response = oracle.fulfill(retry)?;
    let cleartexts: [u64; 4] = response.cleartexts.clone().try_into().expect("four values");
    let party = keeper.on_decryption_result(retry, cleartexts, &response.proof)?;
    println!(
        "revealed party: strength={} agility={} intellect={} seed={}",
        party.strength, party.agility, party.intellect, party.seed
    );

    for event in keeper.drain_events() {
        println!("event: {}", serde_json::to_string(&event)?);
    }
    Ok(())
}
