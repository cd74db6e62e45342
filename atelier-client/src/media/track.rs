use atelier_core::{MediaKind, TrackId};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackState {
    Live,
    Ended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackEvent {
    Muted,
    Unmuted,
    Ended,
}

struct Listener {
    id: u64,
    tx: mpsc::UnboundedSender<TrackEvent>,
}

struct TrackInner {
    id: TrackId,
    kind: MediaKind,
    remote: bool,
    enabled: AtomicBool,
    muted: AtomicBool,
    ended: AtomicBool,
    next_listener: AtomicU64,
    listeners: Mutex<Vec<Listener>>,
}

/// Shared handle to one media track. Cloning shares the same underlying
/// track; the consumer and the rendering layer hold the same state.
#[derive(Clone)]
pub struct MediaTrack {
    inner: Arc<TrackInner>,
}

impl MediaTrack {
    fn new(kind: MediaKind, remote: bool) -> Self {
        Self {
            inner: Arc::new(TrackInner {
                id: TrackId::new(),
                kind,
                remote,
                enabled: AtomicBool::new(true),
                muted: AtomicBool::new(false),
                ended: AtomicBool::new(false),
                next_listener: AtomicU64::new(0),
                listeners: Mutex::new(Vec::new()),
            }),
        }
    }

    /// A track captured from a local device.
    pub fn local(kind: MediaKind) -> Self {
        Self::new(kind, false)
    }

    /// A track received from a remote producer.
    pub fn remote(kind: MediaKind) -> Self {
        Self::new(kind, true)
    }

    pub fn id(&self) -> TrackId {
        self.inner.id
    }

    pub fn kind(&self) -> MediaKind {
        self.inner.kind
    }

    pub fn is_remote(&self) -> bool {
        self.inner.remote
    }

    pub fn enabled(&self) -> bool {
        self.inner.enabled.load(Ordering::SeqCst)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.inner.enabled.store(enabled, Ordering::SeqCst);
    }

    pub fn is_muted(&self) -> bool {
        self.inner.muted.load(Ordering::SeqCst)
    }

    /// Flip the mute flag and notify listeners. For remote tracks this
    /// mirrors the far end pausing its camera.
    pub fn set_muted(&self, muted: bool) {
        let was = self.inner.muted.swap(muted, Ordering::SeqCst);
        if was != muted {
            self.notify(if muted {
                TrackEvent::Muted
            } else {
                TrackEvent::Unmuted
            });
        }
    }

    pub fn state(&self) -> TrackState {
        if self.inner.ended.load(Ordering::SeqCst) {
            TrackState::Ended
        } else {
            TrackState::Live
        }
    }

    /// Stop the track: mark it ended, tell every listener, then drop
    /// all listeners. The listener list is empty when this returns, so
    /// teardown leaves no handler behind.
    pub fn stop(&self) {
        if self.inner.ended.swap(true, Ordering::SeqCst) {
            return;
        }
        let mut listeners = self
            .inner
            .listeners
            .lock()
            .expect("track listener lock poisoned");
        for listener in listeners.drain(..) {
            let _ = listener.tx.send(TrackEvent::Ended);
        }
        debug!(track = %self.inner.id, "track stopped");
    }

    /// Subscribe to track events. The subscription detaches on drop.
    /// Subscribing to an already-ended track yields `Ended` right away.
    pub fn subscribe(&self) -> TrackSubscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.inner.next_listener.fetch_add(1, Ordering::SeqCst);

        if self.inner.ended.load(Ordering::SeqCst) {
            let _ = tx.send(TrackEvent::Ended);
        } else {
            self.inner
                .listeners
                .lock()
                .expect("track listener lock poisoned")
                .push(Listener { id, tx });
        }

        TrackSubscription {
            id,
            rx,
            track: self.inner.clone(),
        }
    }

    pub fn listener_count(&self) -> usize {
        self.inner
            .listeners
            .lock()
            .expect("track listener lock poisoned")
            .len()
    }

    fn notify(&self, event: TrackEvent) {
        let listeners = self
            .inner
            .listeners
            .lock()
            .expect("track listener lock poisoned");
        for listener in listeners.iter() {
            let _ = listener.tx.send(event);
        }
    }

    pub(crate) fn remove_listener(&self, id: u64) {
        self.inner
            .listeners
            .lock()
            .expect("track listener lock poisoned")
            .retain(|l| l.id != id);
    }
}

impl std::fmt::Debug for MediaTrack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaTrack")
            .field("id", &self.inner.id)
            .field("kind", &self.inner.kind)
            .field("remote", &self.inner.remote)
            .field("state", &self.state())
            .finish()
    }
}

/// Receiving half of a track event subscription. Unregisters itself
/// from the track when dropped.
pub struct TrackSubscription {
    id: u64,
    rx: mpsc::UnboundedReceiver<TrackEvent>,
    track: Arc<TrackInner>,
}

impl TrackSubscription {
    /// `None` once the track has been stopped and the buffered events
    /// are drained.
    pub async fn recv(&mut self) -> Option<TrackEvent> {
        self.rx.recv().await
    }

    pub(crate) fn listener_id(&self) -> u64 {
        self.id
    }
}

impl Drop for TrackSubscription {
    fn drop(&mut self) {
        self.track
            .listeners
            .lock()
            .expect("track listener lock poisoned")
            .retain(|l| l.id != self.id);
    }
}
