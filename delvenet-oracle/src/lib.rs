//! Decryption-oracle capability boundary for delvenet.
//!
//! Requesting decryption is synchronous and cheap: the oracle hands back an
//! opaque [`RequestId`] and fulfils the request at some later, unordered
//! point. The protocol core consumes two traits — [`DecryptionOracle`] to
//! issue requests and [`ProofVerifier`] to authenticate results — and never
//! assumes anything about timing. [`MockDecryptionOracle`] fulfils requests
//! on demand against a [`MockFheEngine`] so tests control the schedule.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use blake3::Hasher;
use delvenet_fhe::{CiphertextHandle, MockFheEngine};
use parking_lot::Mutex;
use rand::RngCore;
use rand::SeedableRng;
use rand_chacha::ChaCha12Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const DOMAIN_REQUEST_ID: &[u8] = b"DELVENET:ORACLE:REQ";
const DOMAIN_PROOF: &[u8] = b"DELVENET:ORACLE:PROOF";

/// Opaque identifier the oracle assigns to a pending decryption request.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "req-{:016x}", self.0)
    }
}

/// Attestation that a set of cleartexts is the decryption for a request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecryptionProof {
    pub commitment: [u8; 32],
}

impl DecryptionProof {
    /// Commitment binding `cleartexts` to `request_id`.
    pub fn commit(request_id: RequestId, cleartexts: &[u64]) -> Self {
        let mut hasher = Hasher::new();
        hasher.update(DOMAIN_PROOF);
        hasher.update(&request_id.0.to_le_bytes());
        for value in cleartexts {
            hasher.update(&value.to_le_bytes());
        }
        Self {
            commitment: *hasher.finalize().as_bytes(),
        }
    }
}

#[derive(Debug, Error, Clone)]
pub enum OracleError {
    #[error("decryption requested for an empty handle set")]
    EmptyRequest,
    #[error("no pending decryption for {0}")]
    UnknownRequest(RequestId),
    #[error("oracle could not resolve a ciphertext handle: {0}")]
    UnresolvableHandle(String),
}

/// Issues decryption requests against a set of ciphertext handles.
pub trait DecryptionOracle: Send + Sync {
    fn request_decryption(
        &self,
        handles: &[CiphertextHandle],
    ) -> Result<RequestId, OracleError>;
}

/// Authenticates a decryption result against its request.
pub trait ProofVerifier: Send + Sync {
    fn verify(&self, request_id: RequestId, cleartexts: &[u64], proof: &DecryptionProof) -> bool;
}

/// Cleartexts plus proof, as delivered by the oracle actor.
#[derive(Clone, Debug)]
pub struct OracleResponse {
    pub request_id: RequestId,
    pub cleartexts: Vec<u64>,
    pub proof: DecryptionProof,
}

struct OracleState {
    pending: BTreeMap<RequestId, Vec<CiphertextHandle>>,
    nonce_rng: ChaCha12Rng,
}

/// Deterministic in-process oracle backed by the mock engine's registry.
///
/// `request_decryption` only records the handle set; plaintext is resolved
/// when `fulfill` runs, which is what lets tests interleave contributions
/// between request and response.
pub struct MockDecryptionOracle {
    engine: Arc<MockFheEngine>,
    state: Mutex<OracleState>,
}

impl MockDecryptionOracle {
    pub fn new(engine: Arc<MockFheEngine>, seed: u64) -> Self {
        Self {
            engine,
            state: Mutex::new(OracleState {
                pending: BTreeMap::new(),
                nonce_rng: ChaCha12Rng::seed_from_u64(seed),
            }),
        }
    }

    /// Resolve a pending request to cleartexts and a commitment proof.
    ///
    /// The request stays resolvable afterwards: replay protection is the
    /// verifier's job, not the oracle's.
    pub fn fulfill(&self, request_id: RequestId) -> Result<OracleResponse, OracleError> {
        let handles = {
            let state = self.state.lock();
            state
                .pending
                .get(&request_id)
                .cloned()
                .ok_or(OracleError::UnknownRequest(request_id))?
        };
        let mut cleartexts = Vec::with_capacity(handles.len());
        for handle in &handles {
            let value = self
                .engine
                .reveal(handle)
                .map_err(|err| OracleError::UnresolvableHandle(err.to_string()))?;
            cleartexts.push(value);
        }
        let proof = DecryptionProof::commit(request_id, &cleartexts);
        Ok(OracleResponse {
            request_id,
            cleartexts,
            proof,
        })
    }

    /// Request ids currently awaiting fulfilment.
    pub fn pending(&self) -> Vec<RequestId> {
        self.state.lock().pending.keys().copied().collect()
    }
}

impl DecryptionOracle for MockDecryptionOracle {
    fn request_decryption(
        &self,
        handles: &[CiphertextHandle],
    ) -> Result<RequestId, OracleError> {
        if handles.is_empty() {
            return Err(OracleError::EmptyRequest);
        }
        let mut state = self.state.lock();
        let nonce = state.nonce_rng.next_u64();
        let mut hasher = Hasher::new();
        hasher.update(DOMAIN_REQUEST_ID);
        hasher.update(&nonce.to_le_bytes());
        for handle in handles {
            hasher.update(handle.digest());
        }
        let digest = hasher.finalize();
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&digest.as_bytes()[..8]);
        let request_id = RequestId(u64::from_le_bytes(bytes));
        state.pending.insert(request_id, handles.to_vec());
        Ok(request_id)
    }
}

/// Verifier that recomputes the oracle's blake3 commitment.
#[derive(Clone, Copy, Debug, Default)]
pub struct CommitmentVerifier;

impl ProofVerifier for CommitmentVerifier {
    fn verify(&self, request_id: RequestId, cleartexts: &[u64], proof: &DecryptionProof) -> bool {
        DecryptionProof::commit(request_id, cleartexts) == *proof
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn oracle() -> (Arc<MockFheEngine>, MockDecryptionOracle) {
        let engine = Arc::new(MockFheEngine::new());
        let oracle = MockDecryptionOracle::new(engine.clone(), 7);
        (engine, oracle)
    }

    #[test]
    fn request_then_fulfill_reveals_cleartexts() {
        let (engine, oracle) = oracle();
        let a = engine.encrypt(41);
        let b = engine.encrypt(1);
        let id = oracle.request_decryption(&[a, b]).expect("request");
        let response = oracle.fulfill(id).expect("fulfill");
        assert_eq!(response.cleartexts, vec![41, 1]);
        assert!(CommitmentVerifier.verify(id, &response.cleartexts, &response.proof));
    }

    #[test]
    fn fulfilment_resolves_state_at_fulfil_time() {
        // The oracle stores handles, not values: what it reveals is whatever
        // those exact handles decrypt to, independent of later activity.
        let (engine, oracle) = oracle();
        let snapshot = engine.encrypt(10);
        let id = oracle.request_decryption(&[snapshot]).expect("request");
        let _newer = engine.encrypt(99);
        let response = oracle.fulfill(id).expect("fulfill");
        assert_eq!(response.cleartexts, vec![10]);
    }

    #[test]
    fn unknown_request_is_rejected() {
        let (_engine, oracle) = oracle();
        let err = oracle.fulfill(RequestId(123)).unwrap_err();
        assert!(matches!(err, OracleError::UnknownRequest(_)));
    }

    #[test]
    fn empty_handle_set_is_rejected() {
        let (_engine, oracle) = oracle();
        let err = oracle.request_decryption(&[]).unwrap_err();
        assert!(matches!(err, OracleError::EmptyRequest));
    }

    #[test]
    fn tampered_cleartexts_fail_verification() {
        let (engine, oracle) = oracle();
        let ct = engine.encrypt(5);
        let id = oracle.request_decryption(&[ct]).expect("request");
        let response = oracle.fulfill(id).expect("fulfill");
        assert!(!CommitmentVerifier.verify(id, &[6], &response.proof));
        let forged = DecryptionProof {
            commitment: [0u8; 32],
        };
        assert!(!CommitmentVerifier.verify(id, &response.cleartexts, &forged));
    }

    #[test]
    fn request_ids_are_unique_per_request() {
        let (engine, oracle) = oracle();
        let ct = engine.encrypt(5);
        let first = oracle.request_decryption(&[ct]).expect("request");
        let second = oracle.request_decryption(&[ct]).expect("request");
        assert_ne!(first, second);
    }
}
