use crate::error::SessionError;
use atelier_core::{ConsumerId, ProducerId};
use tokio::sync::oneshot;

/// Commands the session actor accepts from its handle.
#[derive(Debug)]
pub enum SessionCommand {
    /// Start the camera and publish the local video track.
    Publish {
        reply: oneshot::Sender<Result<ProducerId, SessionError>>,
    },

    /// Drop a peer whose track ended or whose tile was torn down.
    /// Carries the consumer identity so a removal issued for a
    /// replaced entry cannot evict its successor.
    RemovePeer {
        producer_id: ProducerId,
        consumer_id: ConsumerId,
    },

    /// Tear everything down: consumers, producer, transports, signaling.
    Shutdown { reply: oneshot::Sender<()> },
}
