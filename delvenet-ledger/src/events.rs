//! Lifecycle notifications for off-protocol collaborators (frontends,
//! indexers). The log buffers typed events; a collaborator drains a snapshot
//! the way telemetry consumers flush counters.

use serde::Serialize;

use crate::access::ActorId;
use delvenet_oracle::RequestId;

/// Everything observable about the protocol from outside.
///
/// Submission events carry identities only — plaintext attribute values
/// appear exclusively in `DecryptionCompleted`, after the oracle reveal.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case", rename_all_fields = "kebab-case", tag = "event")]
pub enum ProtocolEvent {
    BatchOpened {
        batch_id: u64,
    },
    BatchClosed {
        batch_id: u64,
    },
    PartyAttributesSubmitted {
        batch_id: u64,
        provider: ActorId,
    },
    DungeonSeedGenerated {
        batch_id: u64,
        caller: ActorId,
    },
    DecryptionRequested {
        batch_id: u64,
        request_id: RequestId,
    },
    DecryptionCompleted {
        batch_id: u64,
        request_id: RequestId,
        strength: u64,
        agility: u64,
        intellect: u64,
        seed: u64,
    },
}

#[derive(Debug, Default)]
pub struct EventLog {
    events: Vec<ProtocolEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, event: ProtocolEvent) {
        self.events.push(event);
    }

    /// Take every buffered event, leaving the log empty.
    pub fn drain(&mut self) -> Vec<ProtocolEvent> {
        std::mem::take(&mut self.events)
    }

    /// Peek at buffered events without consuming them.
    pub fn pending(&self) -> &[ProtocolEvent] {
        &self.events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_empties_the_log() {
        let mut log = EventLog::new();
        log.record(ProtocolEvent::BatchOpened { batch_id: 0 });
        log.record(ProtocolEvent::BatchClosed { batch_id: 0 });
        assert_eq!(log.pending().len(), 2);
        let drained = log.drain();
        assert_eq!(drained.len(), 2);
        assert!(log.pending().is_empty());
    }

    #[test]
    fn events_render_as_tagged_json() {
        let event = ProtocolEvent::PartyAttributesSubmitted {
            batch_id: 3,
            provider: ActorId::new("p1"),
        };
        let rendered = serde_json::to_string(&event).expect("serialize");
        assert!(rendered.contains("\"event\":\"party-attributes-submitted\""));
        assert!(rendered.contains("\"batch-id\":3"));
    }
}
