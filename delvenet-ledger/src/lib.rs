//! Confidential party-attribute aggregation with snapshot-bound decryption.
//!
//! Providers fold encrypted attribute triples into the accumulators of the
//! current batch; an authorized caller later derives a seed ciphertext and
//! asks an external oracle to reveal the aggregates. The request is bound to
//! a blake3 snapshot of the exact ciphertext handles it covers, so a result
//! computed against state that has since moved on is rejected at delivery
//! (`StateMismatch`), and a result delivered twice is rejected on the second
//! attempt (`ReplayAttempt`). Optimistic detection replaces locking: the
//! batch stays open for contributions for the whole request/response window.

pub mod access;
pub mod batch;
pub mod config;
pub mod cooldown;
pub mod error;
pub mod events;
pub mod keeper;
pub mod seed;
pub mod snapshot;

pub use access::{AccessRegistry, ActionKind, ActorId};
pub use batch::{Batch, BatchBook};
pub use config::{ProtocolConfig, ProtocolConfigError};
pub use cooldown::{CooldownTracker, UnixSecs};
pub use error::{LedgerError, LedgerResult};
pub use events::{EventLog, ProtocolEvent};
pub use keeper::PartyKeeper;
pub use seed::{ProductPlusIntellect, SeedCombiner};
pub use snapshot::{state_hash, DecryptionContext, RevealedParty};
