use crate::media::MediaTrack;
use atelier_core::{ConsumerId, ConsumerParams, MediaKind, ProducerId};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

/// Subscription to one remote producer's track. Pause state is split
/// in two: the local flag here and the server-side flag behind the
/// `consumer-resume` ack. Both must be cleared before frames flow.
pub struct Consumer {
    id: ConsumerId,
    producer_id: ProducerId,
    kind: MediaKind,
    track: MediaTrack,
    local_paused: AtomicBool,
    server_resumed: AtomicBool,
    closed: AtomicBool,
}

impl Consumer {
    pub(crate) fn new(params: &ConsumerParams, track: MediaTrack) -> Self {
        Self {
            id: params.id,
            producer_id: params.producer_id,
            kind: params.kind,
            track,
            local_paused: AtomicBool::new(params.paused),
            server_resumed: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> ConsumerId {
        self.id
    }

    pub fn producer_id(&self) -> ProducerId {
        self.producer_id
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    pub fn track(&self) -> &MediaTrack {
        &self.track
    }

    pub fn is_paused(&self) -> bool {
        self.local_paused.load(Ordering::SeqCst)
    }

    pub fn resume_local(&self) {
        if self.local_paused.swap(false, Ordering::SeqCst) {
            debug!(consumer = %self.id, "consumer resumed locally");
        }
    }

    pub(crate) fn mark_server_resumed(&self) {
        self.server_resumed.store(true, Ordering::SeqCst);
    }

    pub fn is_server_resumed(&self) -> bool {
        self.server_resumed.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Close the consumer and stop its track. Idempotent.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.track.stop();
        debug!(consumer = %self.id, producer = %self.producer_id, "consumer closed");
    }
}
