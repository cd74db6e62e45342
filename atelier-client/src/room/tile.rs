use crate::consumer::Consumer;
use crate::error::PlaybackError;
use crate::media::{MediaTrack, PlaybackSurface, TrackEvent};
use crate::room::{PeerEntry, SessionHandle};
use atelier_core::ProducerId;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

/// Per-track playback lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileState {
    Loading,
    Playing,
    /// Autoplay was rejected; `retry_play` from a user gesture recovers.
    NeedsInteraction,
    /// Track ended or decode failed. Terminal.
    Ended,
}

/// Renders one peer's track on a playback surface. Owns the track
/// event subscription and releases everything on `detach` or drop.
pub struct VideoTile {
    producer_id: ProducerId,
    track: MediaTrack,
    consumer: Arc<Consumer>,
    surface: Arc<dyn PlaybackSurface>,
    state_tx: Arc<watch::Sender<TileState>>,
    subscription_id: u64,
    events_task: Option<JoinHandle<()>>,
}

impl VideoTile {
    /// Attach the entry's track to the surface and start playback.
    /// The track event listener is registered before the first `play`
    /// attempt so no event can slip by.
    pub async fn attach(
        entry: &PeerEntry,
        surface: Arc<dyn PlaybackSurface>,
        session: SessionHandle,
    ) -> VideoTile {
        let producer_id = entry.producer_id;
        let track = entry.track.clone();
        let consumer = entry.consumer.clone();
        let (state_tx, _state_rx) = watch::channel(TileState::Loading);
        let state_tx = Arc::new(state_tx);

        surface.attach(&track);
        let mut subscription = track.subscribe();
        let subscription_id = subscription.listener_id();

        let events_task = tokio::spawn({
            let track = track.clone();
            let surface = surface.clone();
            let state_tx = state_tx.clone();
            let session = session.clone();
            let consumer_id = consumer.id();
            async move {
                while let Some(event) = subscription.recv().await {
                    match event {
                        TrackEvent::Muted => {
                            // A remote mute is a policy signal here,
                            // not a hard stop.
                            debug!(%producer_id, "remote mute, forcing track enabled");
                            track.set_enabled(true);
                        }
                        TrackEvent::Unmuted => {}
                        TrackEvent::Ended => {
                            warn!(%producer_id, "track ended");
                            state_tx.send_replace(TileState::Ended);
                            surface.clear();
                            session.remove_peer(producer_id, consumer_id).await;
                            break;
                        }
                    }
                }
            }
        });

        let tile = VideoTile {
            producer_id,
            track,
            consumer,
            surface,
            state_tx,
            subscription_id,
            events_task: Some(events_task),
        };

        match tile.surface.play().await {
            Ok(()) => {
                tile.state_tx.send_replace(TileState::Playing);
            }
            Err(PlaybackError::AutoplayBlocked) => {
                warn!(%producer_id, "autoplay blocked, waiting for user gesture");
                tile.state_tx.send_replace(TileState::NeedsInteraction);
            }
            Err(err) => {
                error!(%producer_id, "playback failed: {err}");
                tile.state_tx.send_replace(TileState::Ended);
                tile.surface.clear();
                session.remove_peer(producer_id, tile.consumer.id()).await;
            }
        }

        tile
    }

    pub fn producer_id(&self) -> ProducerId {
        self.producer_id
    }

    pub fn state(&self) -> TileState {
        *self.state_tx.borrow()
    }

    pub fn state_changes(&self) -> watch::Receiver<TileState> {
        self.state_tx.subscribe()
    }

    /// User-gesture recovery from an autoplay block: make sure the
    /// consumer is resumed and the track enabled, then play again.
    pub async fn retry_play(&self) -> Result<(), PlaybackError> {
        if self.state() == TileState::Ended {
            return Err(PlaybackError::TrackEnded);
        }
        self.consumer.resume_local();
        self.track.set_enabled(true);
        self.surface.play().await?;
        self.state_tx.send_replace(TileState::Playing);
        debug!(producer = %self.producer_id, "playback recovered by user gesture");
        Ok(())
    }

    /// Release the surface and the track listener. Safe to call twice;
    /// also runs on drop.
    pub fn detach(&mut self) {
        if let Some(task) = self.events_task.take() {
            task.abort();
            self.track.remove_listener(self.subscription_id);
            self.surface.clear();
        }
    }
}

impl Drop for VideoTile {
    fn drop(&mut self) {
        self.detach();
    }
}
