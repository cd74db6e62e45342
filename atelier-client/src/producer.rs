use crate::media::MediaTrack;
use atelier_core::{MediaKind, ProducerId};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::info;

/// The session's one outbound published track.
pub struct Producer {
    id: ProducerId,
    kind: MediaKind,
    track: MediaTrack,
    closed: AtomicBool,
}

impl Producer {
    pub(crate) fn new(id: ProducerId, kind: MediaKind, track: MediaTrack) -> Self {
        Self {
            id,
            kind,
            track,
            closed: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> ProducerId {
        self.id
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    pub fn track(&self) -> &MediaTrack {
        &self.track
    }

    /// Stop publishing and release the capture track. Idempotent.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.track.stop();
        info!(producer = %self.id, "producer closed");
    }
}
