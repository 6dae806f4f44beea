//! Homomorphic-encryption capability boundary for delvenet.
//!
//! The protocol core never inspects ciphertext: it holds opaque
//! [`CiphertextHandle`]s and combines them through the [`FheEngine`] trait.
//! Real deployments back the trait with an external FHE coprocessor; the
//! bundled [`MockFheEngine`] keeps a plaintext registry behind the same
//! opaque handles so tests and demos can observe end-to-end arithmetic.

use std::collections::BTreeMap;
use std::fmt;

use blake3::Hasher;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const DOMAIN_ZERO: &[u8] = b"DELVENET:FHE:ZERO";
const DOMAIN_ENCRYPT: &[u8] = b"DELVENET:FHE:ENC";
const DOMAIN_ADD: &[u8] = b"DELVENET:FHE:ADD";
const DOMAIN_MUL: &[u8] = b"DELVENET:FHE:MUL";

/// Opaque reference to an encrypted value held by the external engine.
///
/// Handles are minted exclusively by [`FheEngine`] implementations; the
/// protocol core only stores, compares, and hashes them.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CiphertextHandle([u8; 32]);

impl CiphertextHandle {
    /// Wrap an engine-produced digest. Reserved for engine implementations.
    pub fn from_digest(digest: [u8; 32]) -> Self {
        Self(digest)
    }

    /// Digest bytes, for binding hashes over referenced ciphertexts.
    pub fn digest(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for CiphertextHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CiphertextHandle({})", self)
    }
}

impl fmt::Display for CiphertextHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0[..8] {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Error, Clone)]
#[error("{0}")]
pub struct FheError(pub String);

impl FheError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

/// The only operations the protocol core may perform on ciphertext.
pub trait FheEngine: Send + Sync {
    /// Ciphertext encoding of zero, used to initialize accumulators.
    fn zero(&self) -> Result<CiphertextHandle, FheError>;

    /// Homomorphic addition of two ciphertexts.
    fn add(
        &self,
        a: &CiphertextHandle,
        b: &CiphertextHandle,
    ) -> Result<CiphertextHandle, FheError>;

    /// Homomorphic multiplication of two ciphertexts.
    fn multiply(
        &self,
        a: &CiphertextHandle,
        b: &CiphertextHandle,
    ) -> Result<CiphertextHandle, FheError>;
}

#[derive(Default)]
struct MockState {
    registry: BTreeMap<CiphertextHandle, u64>,
    enc_nonce: u64,
}

/// In-process stand-in for the external FHE coprocessor.
///
/// Every operation mints a fresh digest-chained handle, so the handle held by
/// an accumulator changes whenever a contribution lands. That property is what
/// the protocol's snapshot hash relies on to detect stale decryption results.
pub struct MockFheEngine {
    state: Mutex<MockState>,
}

impl MockFheEngine {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState::default()),
        }
    }

    /// Encrypt a plaintext on behalf of a contributing party.
    ///
    /// Handles are nonce-salted: encrypting the same value twice yields
    /// distinct ciphertexts, as a randomized scheme would.
    pub fn encrypt(&self, value: u64) -> CiphertextHandle {
        let mut state = self.state.lock();
        state.enc_nonce += 1;
        let mut hasher = Hasher::new();
        hasher.update(DOMAIN_ENCRYPT);
        hasher.update(&state.enc_nonce.to_le_bytes());
        hasher.update(&value.to_le_bytes());
        let handle = CiphertextHandle(*hasher.finalize().as_bytes());
        state.registry.insert(handle, value);
        handle
    }

    /// Reveal the plaintext behind a handle. Reserved for the decryption
    /// oracle; the protocol core has no path to this method.
    pub fn reveal(&self, handle: &CiphertextHandle) -> Result<u64, FheError> {
        self.state
            .lock()
            .registry
            .get(handle)
            .copied()
            .ok_or_else(|| FheError::new(format!("unknown ciphertext handle {handle}")))
    }

    fn lookup(state: &MockState, handle: &CiphertextHandle) -> Result<u64, FheError> {
        state
            .registry
            .get(handle)
            .copied()
            .ok_or_else(|| FheError::new(format!("unknown ciphertext handle {handle}")))
    }

    fn combine(
        &self,
        domain: &[u8],
        a: &CiphertextHandle,
        b: &CiphertextHandle,
        op: impl Fn(u64, u64) -> u64,
    ) -> Result<CiphertextHandle, FheError> {
        let mut state = self.state.lock();
        let lhs = Self::lookup(&state, a)?;
        let rhs = Self::lookup(&state, b)?;
        let mut hasher = Hasher::new();
        hasher.update(domain);
        hasher.update(a.digest());
        hasher.update(b.digest());
        let handle = CiphertextHandle(*hasher.finalize().as_bytes());
        state.registry.insert(handle, op(lhs, rhs));
        Ok(handle)
    }
}

impl Default for MockFheEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl FheEngine for MockFheEngine {
    fn zero(&self) -> Result<CiphertextHandle, FheError> {
        let mut state = self.state.lock();
        let mut hasher = Hasher::new();
        hasher.update(DOMAIN_ZERO);
        let handle = CiphertextHandle(*hasher.finalize().as_bytes());
        state.registry.insert(handle, 0);
        Ok(handle)
    }

    fn add(
        &self,
        a: &CiphertextHandle,
        b: &CiphertextHandle,
    ) -> Result<CiphertextHandle, FheError> {
        self.combine(DOMAIN_ADD, a, b, u64::wrapping_add)
    }

    fn multiply(
        &self,
        a: &CiphertextHandle,
        b: &CiphertextHandle,
    ) -> Result<CiphertextHandle, FheError> {
        self.combine(DOMAIN_MUL, a, b, u64::wrapping_mul)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_reveals_as_zero() {
        let engine = MockFheEngine::new();
        let zero = engine.zero().expect("zero");
        assert_eq!(engine.reveal(&zero).unwrap(), 0);
    }

    #[test]
    fn add_and_multiply_track_plaintext() {
        let engine = MockFheEngine::new();
        let five = engine.encrypt(5);
        let three = engine.encrypt(3);
        let sum = engine.add(&five, &three).expect("add");
        let product = engine.multiply(&five, &three).expect("mul");
        assert_eq!(engine.reveal(&sum).unwrap(), 8);
        assert_eq!(engine.reveal(&product).unwrap(), 15);
    }

    #[test]
    fn encrypting_same_value_twice_yields_distinct_handles() {
        let engine = MockFheEngine::new();
        let a = engine.encrypt(7);
        let b = engine.encrypt(7);
        assert_ne!(a, b);
        assert_eq!(engine.reveal(&a).unwrap(), engine.reveal(&b).unwrap());
    }

    #[test]
    fn accumulator_handle_changes_on_every_addition() {
        let engine = MockFheEngine::new();
        let mut acc = engine.zero().expect("zero");
        let before = acc;
        acc = engine.add(&acc, &engine.encrypt(1)).expect("add");
        assert_ne!(before, acc);
        let mid = acc;
        acc = engine.add(&acc, &engine.encrypt(0)).expect("add");
        // Even a zero-valued contribution re-chains the digest.
        assert_ne!(mid, acc);
        assert_eq!(engine.reveal(&acc).unwrap(), 1);
    }

    #[test]
    fn combining_foreign_handles_fails() {
        let engine = MockFheEngine::new();
        let other = MockFheEngine::new();
        let local = engine.encrypt(1);
        let foreign = other.encrypt(1);
        let err = engine.add(&local, &foreign).unwrap_err();
        assert!(err.0.contains("unknown ciphertext handle"));
    }
}
