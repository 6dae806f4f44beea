use std::sync::Arc;

use delvenet_fhe::MockFheEngine;
use delvenet_ledger::{ActorId, LedgerError, PartyKeeper, ProtocolEvent, UnixSecs};
use delvenet_oracle::{
    CommitmentVerifier, MockDecryptionOracle, OracleError, RequestId,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha12Rng;
use thiserror::Error;

use crate::config::{Config, GatewaySection};

/// Demo rounds start here; each round advances past the cooldown window.
const GENESIS_CLOCK: UnixSecs = 1_700_000_000;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    Oracle(#[from] OracleError),
    #[error("oracle returned {0} cleartexts, expected 4")]
    MalformedResponse(usize),
}

/// Outcome of one full contribution → reveal round.
#[derive(Clone, Debug, PartialEq)]
pub struct RoundReport {
    pub batch_id: u64,
    pub request_id: RequestId,
    pub strength: u64,
    pub agility: u64,
    pub intellect: u64,
    pub seed: u64,
    pub events: Vec<ProtocolEvent>,
}

/// Drives the keeper with the bundled mock capabilities: every registered
/// provider submits once, the owner requests the reveal, and the oracle
/// answer is delivered straight back.
pub struct GatewayService {
    gateway: GatewaySection,
    cooldown_secs: u64,
    keeper: PartyKeeper,
    engine: Arc<MockFheEngine>,
    oracle: Arc<MockDecryptionOracle>,
    values_rng: ChaCha12Rng,
    clock: UnixSecs,
}

impl GatewayService {
    pub fn new(config: &Config) -> Result<Self, ServiceError> {
        let engine = Arc::new(MockFheEngine::new());
        let oracle = Arc::new(MockDecryptionOracle::new(
            engine.clone(),
            config.gateway.oracle_seed,
        ));
        let owner = ActorId::new(config.gateway.owner.as_str());
        let mut keeper = PartyKeeper::new(
            config.protocol.clone(),
            owner.clone(),
            engine.clone(),
            oracle.clone(),
            Arc::new(CommitmentVerifier),
        );
        for provider in &config.gateway.providers {
            keeper.add_provider(&owner, ActorId::new(provider.as_str()))?;
        }
        Ok(Self {
            gateway: config.gateway.clone(),
            cooldown_secs: config.protocol.cooldown_secs,
            keeper,
            engine,
            oracle,
            values_rng: ChaCha12Rng::seed_from_u64(config.gateway.oracle_seed),
            clock: GENESIS_CLOCK,
        })
    }

    pub fn run_round(&mut self) -> Result<RoundReport, ServiceError> {
        let owner = ActorId::new(self.gateway.owner.as_str());
        let now = self.clock;
        let batch_id = self.keeper.open_batch(&owner)?;

        for provider in self.gateway.providers.clone() {
            let (s, a, i) = (
                self.values_rng.gen_range(1..=12u64),
                self.values_rng.gen_range(1..=12u64),
                self.values_rng.gen_range(1..=12u64),
            );
            self.keeper.submit_attributes(
                &ActorId::new(provider.as_str()),
                batch_id,
                self.engine.encrypt(s),
                self.engine.encrypt(a),
                self.engine.encrypt(i),
                now,
            )?;
        }

        let request_id = self.keeper.generate_seed(&owner, batch_id, now)?;
        let response = self.oracle.fulfill(request_id)?;
        let count = response.cleartexts.len();
        let cleartexts: [u64; 4] = response
            .cleartexts
            .try_into()
            .map_err(|_| ServiceError::MalformedResponse(count))?;
        let party = self
            .keeper
            .on_decryption_result(request_id, cleartexts, &response.proof)?;

        self.clock += self.cooldown_secs + 1;
        Ok(RoundReport {
            batch_id,
            request_id,
            strength: party.strength,
            agility: party.agility,
            intellect: party.intellect,
            seed: party.seed,
            events: self.keeper.drain_events(),
        })
    }

    pub fn keeper(&self) -> &PartyKeeper {
        &self.keeper
    }
}
