//! Batch lifecycle: one current batch at a time, monotonically increasing
//! ids, ciphertext-zero accumulators at open.

use std::collections::BTreeMap;

use delvenet_fhe::{CiphertextHandle, FheEngine};

use crate::error::{LedgerError, LedgerResult};

/// A bounded contribution window with three encrypted accumulators.
///
/// Superseded batches stay in the book unmodified — a pending decryption may
/// still reference them — but can never accept further submissions.
#[derive(Clone, Debug)]
pub struct Batch {
    pub id: u64,
    pub open: bool,
    pub strength: CiphertextHandle,
    pub agility: CiphertextHandle,
    pub intellect: CiphertextHandle,
    /// Set by seed generation; replaced if seed generation runs again.
    pub seed: Option<CiphertextHandle>,
}

impl Batch {
    /// The four handles a decryption request snapshots, in protocol order.
    pub fn snapshot_handles(&self) -> Option<[CiphertextHandle; 4]> {
        self.seed
            .map(|seed| [self.strength, self.agility, self.intellect, seed])
    }
}

#[derive(Debug, Default)]
pub struct BatchBook {
    current_id: u64,
    batches: BTreeMap<u64, Batch>,
}

impl BatchBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a fresh batch, superseding the current one if present.
    ///
    /// Ids are never reused: whenever a batch exists under the current id —
    /// open or closed — the id advances before the new batch is created.
    pub fn open(&mut self, engine: &dyn FheEngine) -> LedgerResult<u64> {
        let strength = engine.zero()?;
        let agility = engine.zero()?;
        let intellect = engine.zero()?;
        if let Some(current) = self.batches.get_mut(&self.current_id) {
            current.open = false;
            self.current_id += 1;
        }
        let id = self.current_id;
        self.batches.insert(
            id,
            Batch {
                id,
                open: true,
                strength,
                agility,
                intellect,
                seed: None,
            },
        );
        Ok(id)
    }

    /// Close the current batch; fails if there is none or it is already closed.
    pub fn close(&mut self) -> LedgerResult<u64> {
        let id = self.current_id;
        match self.batches.get_mut(&id) {
            Some(batch) if batch.open => {
                batch.open = false;
                Ok(id)
            }
            _ => Err(LedgerError::BatchClosed { batch_id: id }),
        }
    }

    /// The batch a mutation may target: must be the current one and open.
    pub fn writable(&mut self, batch_id: u64) -> LedgerResult<&mut Batch> {
        if batch_id != self.current_id {
            return Err(LedgerError::BatchClosed { batch_id });
        }
        match self.batches.get_mut(&batch_id) {
            Some(batch) if batch.open => Ok(batch),
            _ => Err(LedgerError::BatchClosed { batch_id }),
        }
    }

    pub fn get(&self, batch_id: u64) -> Option<&Batch> {
        self.batches.get(&batch_id)
    }

    pub fn current(&self) -> Option<&Batch> {
        self.batches.get(&self.current_id)
    }

    pub fn current_id(&self) -> u64 {
        self.current_id
    }
}
