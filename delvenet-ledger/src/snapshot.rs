//! Binding digest over the ciphertext handles referenced by a decryption
//! request. Recomputed at callback time to detect contributions that landed
//! while the request was in flight.

use blake3::Hasher;
use delvenet_fhe::CiphertextHandle;
use delvenet_oracle::RequestId;

const DOMAIN_STATE_SNAPSHOT: &[u8] = b"DELVENET:SNAPSHOT:V1";

/// Digest of the four handles (strength, agility, intellect, seed) plus the
/// protocol identity. Pure: same handles and identity, same hash.
pub fn state_hash(protocol_id: &str, handles: &[CiphertextHandle; 4]) -> [u8; 32] {
    let mut hasher = Hasher::new();
    hasher.update(DOMAIN_STATE_SNAPSHOT);
    hasher.update(protocol_id.as_bytes());
    for handle in handles {
        hasher.update(handle.digest());
    }
    *hasher.finalize().as_bytes()
}

/// Pending-decryption record, keyed by the oracle's request id.
///
/// Created when the request is issued, flipped to `processed` by exactly one
/// successful callback, and retained forever for replay detection.
#[derive(Clone, Debug)]
pub struct DecryptionContext {
    pub batch_id: u64,
    pub state_hash: [u8; 32],
    pub processed: bool,
}

/// Plaintext outcome of a finalized decryption callback.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RevealedParty {
    pub batch_id: u64,
    pub request_id: RequestId,
    pub strength: u64,
    pub agility: u64,
    pub intellect: u64,
    pub seed: u64,
}
