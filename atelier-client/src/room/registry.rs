use crate::consumer::Consumer;
use crate::media::MediaTrack;
use atelier_core::{ConsumerId, ProducerId};
use dashmap::DashMap;
use std::sync::Arc;

/// Whether a peer's media is fully flowing or waiting on the server
/// half of the resume handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerState {
    Ready,
    Stalled,
}

#[derive(Clone)]
pub struct PeerEntry {
    pub producer_id: ProducerId,
    pub track: MediaTrack,
    pub consumer: Arc<Consumer>,
    pub state: PeerState,
}

/// Participant map keyed by producer id. The key makes the uniqueness
/// invariant structural: re-announcing a producer replaces its entry,
/// it can never duplicate one. Written only by the consume flow and
/// session teardown; everyone else reads.
#[derive(Clone, Default)]
pub struct PeerRegistry {
    entries: Arc<DashMap<ProducerId, PeerEntry>>,
}

impl PeerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the entry for its producer id, returning the
    /// replaced entry if there was one.
    pub fn upsert(&self, entry: PeerEntry) -> Option<PeerEntry> {
        self.entries.insert(entry.producer_id, entry)
    }

    pub fn set_state(&self, producer_id: ProducerId, state: PeerState) {
        if let Some(mut entry) = self.entries.get_mut(&producer_id) {
            entry.state = state;
        }
    }

    pub fn remove(&self, producer_id: &ProducerId) -> Option<PeerEntry> {
        self.entries.remove(producer_id).map(|(_, entry)| entry)
    }

    /// Remove the entry only if it still holds the given consumer. A
    /// removal aimed at an entry that has since been replaced in place
    /// must not take the replacement down with it.
    pub fn remove_matching(
        &self,
        producer_id: &ProducerId,
        consumer_id: ConsumerId,
    ) -> Option<PeerEntry> {
        self.entries
            .remove_if(producer_id, |_, entry| entry.consumer.id() == consumer_id)
            .map(|(_, entry)| entry)
    }

    pub fn get(&self, producer_id: &ProducerId) -> Option<PeerEntry> {
        self.entries.get(producer_id).map(|e| e.clone())
    }

    pub fn contains(&self, producer_id: &ProducerId) -> bool {
        self.entries.contains_key(producer_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn producer_ids(&self) -> Vec<ProducerId> {
        self.entries.iter().map(|e| *e.key()).collect()
    }

    /// Remove and return every entry. Used by session teardown.
    pub fn drain(&self) -> Vec<PeerEntry> {
        let ids = self.producer_ids();
        ids.iter().filter_map(|id| self.remove(id)).collect()
    }
}
