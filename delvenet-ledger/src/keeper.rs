//! The protocol entry points, executed as atomic, serialized units.
//!
//! Gated operations evaluate their checks in a fixed order — Paused, then
//! role, then cooldown, then batch state — so observable error precedence
//! never depends on internal layout. State is mutated only once every check
//! and every capability call has succeeded; a failing operation leaves the
//! keeper exactly as it found it.
//!
//! The decryption round-trip is the one asynchronous seam. `generate_seed`
//! registers a pending context bound to a snapshot hash and returns
//! immediately; `on_decryption_result` arrives later, with unbounded delay,
//! and is validated against both the stored context and the ciphertext state
//! as it stands at delivery time. No lock spans that window — staleness is
//! detected, not prevented.

use std::collections::BTreeMap;
use std::sync::Arc;

use delvenet_fhe::{CiphertextHandle, FheEngine};
use delvenet_oracle::{DecryptionOracle, DecryptionProof, ProofVerifier, RequestId};
use tracing::{info, warn};

use crate::access::{AccessRegistry, ActionKind, ActorId};
use crate::batch::{Batch, BatchBook};
use crate::config::ProtocolConfig;
use crate::cooldown::{CooldownTracker, UnixSecs};
use crate::error::{LedgerError, LedgerResult};
use crate::events::{EventLog, ProtocolEvent};
use crate::seed::{ProductPlusIntellect, SeedCombiner};
use crate::snapshot::{state_hash, DecryptionContext, RevealedParty};

pub struct PartyKeeper {
    config: ProtocolConfig,
    engine: Arc<dyn FheEngine>,
    oracle: Arc<dyn DecryptionOracle>,
    verifier: Arc<dyn ProofVerifier>,
    combiner: Box<dyn SeedCombiner>,
    access: AccessRegistry,
    cooldowns: CooldownTracker,
    batches: BatchBook,
    pending: BTreeMap<RequestId, DecryptionContext>,
    events: EventLog,
}

impl PartyKeeper {
    pub fn new(
        config: ProtocolConfig,
        owner: ActorId,
        engine: Arc<dyn FheEngine>,
        oracle: Arc<dyn DecryptionOracle>,
        verifier: Arc<dyn ProofVerifier>,
    ) -> Self {
        Self::with_combiner(
            config,
            owner,
            engine,
            oracle,
            verifier,
            Box::new(ProductPlusIntellect),
        )
    }

    /// Construct with a non-default seed-derivation formula.
    pub fn with_combiner(
        config: ProtocolConfig,
        owner: ActorId,
        engine: Arc<dyn FheEngine>,
        oracle: Arc<dyn DecryptionOracle>,
        verifier: Arc<dyn ProofVerifier>,
        combiner: Box<dyn SeedCombiner>,
    ) -> Self {
        let cooldown_secs = config.cooldown_secs;
        Self {
            config,
            engine,
            oracle,
            verifier,
            combiner,
            access: AccessRegistry::new(owner, cooldown_secs),
            cooldowns: CooldownTracker::new(),
            batches: BatchBook::new(),
            pending: BTreeMap::new(),
            events: EventLog::new(),
        }
    }

    // ---- administration -------------------------------------------------

    pub fn transfer_ownership(&mut self, caller: &ActorId, new_owner: ActorId) -> LedgerResult<()> {
        self.access.transfer_ownership(caller, new_owner)
    }

    pub fn add_provider(&mut self, caller: &ActorId, provider: ActorId) -> LedgerResult<()> {
        self.access.add_provider(caller, provider)
    }

    pub fn remove_provider(&mut self, caller: &ActorId, provider: &ActorId) -> LedgerResult<()> {
        self.access.remove_provider(caller, provider)
    }

    pub fn set_paused(&mut self, caller: &ActorId, paused: bool) -> LedgerResult<()> {
        self.access.set_paused(caller, paused)
    }

    pub fn set_cooldown(&mut self, caller: &ActorId, cooldown_secs: u64) -> LedgerResult<()> {
        self.access.set_cooldown(caller, cooldown_secs)
    }

    // ---- batch lifecycle ------------------------------------------------

    /// Open a fresh batch, superseding the current one if it is still open.
    pub fn open_batch(&mut self, caller: &ActorId) -> LedgerResult<u64> {
        self.access.ensure_not_paused()?;
        self.access.ensure_owner(caller)?;
        let batch_id = self.batches.open(self.engine.as_ref())?;
        self.events.record(ProtocolEvent::BatchOpened { batch_id });
        info!(batch_id, "batch opened");
        Ok(batch_id)
    }

    /// Close the current batch. Remains available while paused so the owner
    /// can wind a window down.
    pub fn close_batch(&mut self, caller: &ActorId) -> LedgerResult<u64> {
        self.access.ensure_owner(caller)?;
        let batch_id = self.batches.close()?;
        self.events.record(ProtocolEvent::BatchClosed { batch_id });
        info!(batch_id, "batch closed");
        Ok(batch_id)
    }

    // ---- contribution ---------------------------------------------------

    /// Fold a provider's encrypted attribute triple into the accumulators of
    /// the current open batch. No plaintext is observed anywhere on this
    /// path; only identities are reported outward.
    pub fn submit_attributes(
        &mut self,
        caller: &ActorId,
        batch_id: u64,
        strength: CiphertextHandle,
        agility: CiphertextHandle,
        intellect: CiphertextHandle,
        now: UnixSecs,
    ) -> LedgerResult<()> {
        self.access.ensure_not_paused()?;
        self.access.ensure_provider(caller)?;
        self.cooldowns.ready(
            caller,
            ActionKind::SubmitAttributes,
            now,
            self.access.cooldown_secs(),
        )?;
        let (acc_s, acc_a, acc_i) = {
            let batch = self.batches.writable(batch_id)?;
            (batch.strength, batch.agility, batch.intellect)
        };
        let new_s = self.engine.add(&acc_s, &strength)?;
        let new_a = self.engine.add(&acc_a, &agility)?;
        let new_i = self.engine.add(&acc_i, &intellect)?;

        let batch = self.batches.writable(batch_id)?;
        batch.strength = new_s;
        batch.agility = new_a;
        batch.intellect = new_i;
        self.cooldowns
            .record(caller, ActionKind::SubmitAttributes, now);
        self.events.record(ProtocolEvent::PartyAttributesSubmitted {
            batch_id,
            provider: caller.clone(),
        });
        info!(batch_id, provider = %caller, "party attributes submitted");
        Ok(())
    }

    // ---- decryption bridge ----------------------------------------------

    /// Derive the seed ciphertext, snapshot the four current handles, and ask
    /// the oracle to decrypt them. The batch stays open: contributions that
    /// land before the callback will invalidate the snapshot, which is the
    /// intended resolution of that race.
    pub fn generate_seed(
        &mut self,
        caller: &ActorId,
        batch_id: u64,
        now: UnixSecs,
    ) -> LedgerResult<RequestId> {
        self.access.ensure_not_paused()?;
        self.access.ensure_owner_or_provider(caller)?;
        self.cooldowns.ready(
            caller,
            ActionKind::GenerateSeed,
            now,
            self.access.cooldown_secs(),
        )?;
        let (acc_s, acc_a, acc_i) = {
            let batch = self.batches.writable(batch_id)?;
            (batch.strength, batch.agility, batch.intellect)
        };
        let seed = self
            .combiner
            .combine(self.engine.as_ref(), &acc_s, &acc_a, &acc_i)?;
        let handles = [acc_s, acc_a, acc_i, seed];
        let snapshot = state_hash(&self.config.protocol_id, &handles);
        let request_id = self.oracle.request_decryption(&handles)?;

        self.batches.writable(batch_id)?.seed = Some(seed);
        self.pending.insert(
            request_id,
            DecryptionContext {
                batch_id,
                state_hash: snapshot,
                processed: false,
            },
        );
        self.cooldowns.record(caller, ActionKind::GenerateSeed, now);
        self.events.record(ProtocolEvent::DungeonSeedGenerated {
            batch_id,
            caller: caller.clone(),
        });
        self.events.record(ProtocolEvent::DecryptionRequested {
            batch_id,
            request_id,
        });
        info!(batch_id, %request_id, "dungeon seed generated, decryption requested");
        Ok(request_id)
    }

    // ---- callback verification ------------------------------------------

    /// Fulfilment entry point for the oracle actor.
    ///
    /// Validation order: context exists → not yet processed → ciphertext
    /// state unchanged since request time → proof authenticates the
    /// cleartexts. Any rejection is terminal for this request id; obtaining a
    /// consistent result requires a fresh `generate_seed`.
    pub fn on_decryption_result(
        &mut self,
        request_id: RequestId,
        cleartexts: [u64; 4],
        proof: &DecryptionProof,
    ) -> LedgerResult<RevealedParty> {
        let Some(context) = self.pending.get_mut(&request_id) else {
            return Err(LedgerError::InvalidBatchId);
        };
        let batch_id = context.batch_id;
        let Some(batch) = self.batches.get(batch_id) else {
            return Err(LedgerError::InvalidBatchId);
        };
        if context.processed {
            warn!(%request_id, "replayed decryption result rejected");
            return Err(LedgerError::ReplayAttempt { request_id });
        }
        let current = batch
            .snapshot_handles()
            .ok_or(LedgerError::StateMismatch { request_id })?;
        if state_hash(&self.config.protocol_id, &current) != context.state_hash {
            warn!(%request_id, batch_id, "stale decryption result rejected");
            return Err(LedgerError::StateMismatch { request_id });
        }
        if !self.verifier.verify(request_id, &cleartexts, proof) {
            return Err(LedgerError::ProofInvalid { request_id });
        }

        context.processed = true;
        let [strength, agility, intellect, seed] = cleartexts;
        self.events.record(ProtocolEvent::DecryptionCompleted {
            batch_id,
            request_id,
            strength,
            agility,
            intellect,
            seed,
        });
        info!(batch_id, %request_id, "decryption finalized");
        Ok(RevealedParty {
            batch_id,
            request_id,
            strength,
            agility,
            intellect,
            seed,
        })
    }

    // ---- read surface ----------------------------------------------------

    pub fn current_batch(&self) -> Option<&Batch> {
        self.batches.current()
    }

    pub fn current_batch_id(&self) -> u64 {
        self.batches.current_id()
    }

    pub fn batch(&self, batch_id: u64) -> Option<&Batch> {
        self.batches.get(batch_id)
    }

    pub fn pending_request(&self, request_id: RequestId) -> Option<&DecryptionContext> {
        self.pending.get(&request_id)
    }

    pub fn owner(&self) -> &ActorId {
        self.access.owner()
    }

    pub fn is_provider(&self, actor: &ActorId) -> bool {
        self.access.is_provider(actor)
    }

    pub fn paused(&self) -> bool {
        self.access.paused()
    }

    /// Buffered lifecycle events, without consuming them.
    pub fn events(&self) -> &[ProtocolEvent] {
        self.events.pending()
    }

    /// Take every buffered lifecycle event.
    pub fn drain_events(&mut self) -> Vec<ProtocolEvent> {
        self.events.drain()
    }
}
