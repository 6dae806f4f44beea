use delvenet_fhe::FheError;
use delvenet_oracle::{OracleError, RequestId};
use thiserror::Error;

pub type LedgerResult<T> = Result<T, LedgerError>;

/// Every failure aborts the triggering operation with no partial mutation.
///
/// `ReplayAttempt` and `StateMismatch` are security-critical: callers must
/// surface them verbatim, never downgrade or retry.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("caller is not the owner")]
    NotOwner,
    #[error("caller is not a registered provider")]
    NotProvider,
    #[error("protocol is paused")]
    Paused,
    #[error("cooldown active, retry at {retry_at}")]
    CooldownActive { retry_at: u64 },
    #[error("batch {batch_id} is not open for this operation")]
    BatchClosed { batch_id: u64 },
    #[error("decryption result for {request_id} was already processed")]
    ReplayAttempt { request_id: RequestId },
    #[error("ciphertext state changed since {request_id} was issued")]
    StateMismatch { request_id: RequestId },
    #[error("no decryption context matches this request")]
    InvalidBatchId,
    #[error("proof rejected for {request_id}")]
    ProofInvalid { request_id: RequestId },
    #[error(transparent)]
    Fhe(#[from] FheError),
    #[error(transparent)]
    Oracle(#[from] OracleError),
}
