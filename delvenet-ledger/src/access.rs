//! Owner/provider roster, pause flag, and the shared cooldown duration.
//!
//! Role checks are evaluated at call time; removing a provider takes effect
//! for every subsequent operation but is never retroactive.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, LedgerResult};

/// Identity of a calling actor (wallet address, DID, node id — opaque here).
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ActorId(String);

impl ActorId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ActorId({})", self.0)
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ActorId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Rate-limited action kinds. Each keeps an independent cooldown timestamp.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ActionKind {
    SubmitAttributes,
    GenerateSeed,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::SubmitAttributes => "submit-attributes",
            ActionKind::GenerateSeed => "generate-seed",
        }
    }
}

/// Administrative state: one owner, a provider roster, pause, cooldown.
///
/// All mutators are owner-gated and idempotent in effect; re-applying the
/// current value is permitted and changes nothing.
#[derive(Clone, Debug)]
pub struct AccessRegistry {
    owner: ActorId,
    providers: BTreeSet<ActorId>,
    paused: bool,
    cooldown_secs: u64,
}

impl AccessRegistry {
    pub fn new(owner: ActorId, cooldown_secs: u64) -> Self {
        Self {
            owner,
            providers: BTreeSet::new(),
            paused: false,
            cooldown_secs,
        }
    }

    pub fn transfer_ownership(&mut self, caller: &ActorId, new_owner: ActorId) -> LedgerResult<()> {
        self.ensure_owner(caller)?;
        self.owner = new_owner;
        Ok(())
    }

    pub fn add_provider(&mut self, caller: &ActorId, provider: ActorId) -> LedgerResult<()> {
        self.ensure_owner(caller)?;
        self.providers.insert(provider);
        Ok(())
    }

    pub fn remove_provider(&mut self, caller: &ActorId, provider: &ActorId) -> LedgerResult<()> {
        self.ensure_owner(caller)?;
        self.providers.remove(provider);
        Ok(())
    }

    pub fn set_paused(&mut self, caller: &ActorId, paused: bool) -> LedgerResult<()> {
        self.ensure_owner(caller)?;
        self.paused = paused;
        Ok(())
    }

    pub fn set_cooldown(&mut self, caller: &ActorId, cooldown_secs: u64) -> LedgerResult<()> {
        self.ensure_owner(caller)?;
        self.cooldown_secs = cooldown_secs;
        Ok(())
    }

    pub fn ensure_owner(&self, caller: &ActorId) -> LedgerResult<()> {
        if *caller != self.owner {
            return Err(LedgerError::NotOwner);
        }
        Ok(())
    }

    pub fn ensure_not_paused(&self) -> LedgerResult<()> {
        if self.paused {
            return Err(LedgerError::Paused);
        }
        Ok(())
    }

    pub fn ensure_provider(&self, caller: &ActorId) -> LedgerResult<()> {
        if !self.providers.contains(caller) {
            return Err(LedgerError::NotProvider);
        }
        Ok(())
    }

    /// Seed generation is open to the owner as well as providers.
    pub fn ensure_owner_or_provider(&self, caller: &ActorId) -> LedgerResult<()> {
        if *caller == self.owner {
            return Ok(());
        }
        self.ensure_provider(caller)
    }

    pub fn owner(&self) -> &ActorId {
        &self.owner
    }

    pub fn is_provider(&self, actor: &ActorId) -> bool {
        self.providers.contains(actor)
    }

    pub fn paused(&self) -> bool {
        self.paused
    }

    pub fn cooldown_secs(&self) -> u64 {
        self.cooldown_secs
    }
}
