//! Seed derivation over the three encrypted aggregates.
//!
//! The combination formula is an acknowledged placeholder. It lives behind a
//! trait so a deployment can swap it without touching snapshotting, request
//! issuance, or callback verification.

use delvenet_fhe::{CiphertextHandle, FheEngine, FheError};

/// Derives the dungeon-seed ciphertext from the three aggregate accumulators.
pub trait SeedCombiner: Send + Sync {
    fn combine(
        &self,
        engine: &dyn FheEngine,
        strength: &CiphertextHandle,
        agility: &CiphertextHandle,
        intellect: &CiphertextHandle,
    ) -> Result<CiphertextHandle, FheError>;
}

/// `strength × agility + intellect`.
#[derive(Clone, Copy, Debug, Default)]
pub struct ProductPlusIntellect;

impl SeedCombiner for ProductPlusIntellect {
    fn combine(
        &self,
        engine: &dyn FheEngine,
        strength: &CiphertextHandle,
        agility: &CiphertextHandle,
        intellect: &CiphertextHandle,
    ) -> Result<CiphertextHandle, FheError> {
        let product = engine.multiply(strength, agility)?;
        engine.add(&product, intellect)
    }
}
