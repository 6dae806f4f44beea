//! Per-(actor, action) rate limiting over unix-second timestamps.
//!
//! `ready` and `record` are split so that an operation can evaluate the
//! cooldown at its fixed position in the check order and only advance the
//! timestamp once every later check has passed; a failed operation must
//! leave the tracker untouched.

use std::collections::BTreeMap;

use crate::access::{ActionKind, ActorId};
use crate::error::{LedgerError, LedgerResult};

/// Unix timestamp in whole seconds.
pub type UnixSecs = u64;

#[derive(Clone, Debug, Default)]
pub struct CooldownTracker {
    last: BTreeMap<(ActorId, ActionKind), UnixSecs>,
}

impl CooldownTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails with `CooldownActive` while `now` is inside the cooldown window.
    pub fn ready(
        &self,
        actor: &ActorId,
        action: ActionKind,
        now: UnixSecs,
        cooldown_secs: u64,
    ) -> LedgerResult<()> {
        if let Some(last) = self.last.get(&(actor.clone(), action)) {
            let retry_at = last.saturating_add(cooldown_secs);
            if now < retry_at {
                return Err(LedgerError::CooldownActive { retry_at });
            }
        }
        Ok(())
    }

    /// Record a successful invocation. Call only after the surrounding
    /// operation can no longer fail.
    pub fn record(&mut self, actor: &ActorId, action: ActionKind, now: UnixSecs) {
        self.last.insert((actor.clone(), action), now);
    }

    /// Combined form for callers with no checks after the cooldown.
    pub fn check_and_advance(
        &mut self,
        actor: &ActorId,
        action: ActionKind,
        now: UnixSecs,
        cooldown_secs: u64,
    ) -> LedgerResult<()> {
        self.ready(actor, action, now, cooldown_secs)?;
        self.record(actor, action, now);
        Ok(())
    }

    pub fn last_invocation(&self, actor: &ActorId, action: ActionKind) -> Option<UnixSecs> {
        self.last.get(&(actor.clone(), action)).copied()
    }
}
