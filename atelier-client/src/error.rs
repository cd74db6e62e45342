use atelier_core::{MediaKind, RequestId};
use std::time::Duration;
use thiserror::Error;

/// Failures of the signaling channel itself or of a single call on it.
#[derive(Debug, Error)]
pub enum SignalingError {
    #[error("failed to reach signaling server: {0}")]
    Connect(String),
    #[error("signaling channel closed")]
    ChannelClosed,
    #[error("no ack for request {request_id} within {timeout:?}")]
    AckTimeout {
        request_id: RequestId,
        timeout: Duration,
    },
    #[error("server rejected request: {0}")]
    Remote(String),
    #[error("server acked with the wrong body, expected {0}")]
    UnexpectedAck(&'static str),
    #[error("wire codec error: {0}")]
    Codec(#[from] serde_json::Error),
    #[error("websocket error: {0}")]
    WebSocket(String),
}

#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("device is already loaded")]
    AlreadyLoaded,
    #[error("device is not loaded")]
    NotLoaded,
    #[error("router offered no usable codecs")]
    EmptyRouterCapabilities,
    #[error("router does not forward {0} media")]
    UnsupportedKind(MediaKind),
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("transport is not connected")]
    NotConnected,
    #[error("transport connect handshake already performed")]
    AlreadyConnected,
    #[error("transport is closed")]
    Closed,
    #[error("operation not valid for this transport direction")]
    WrongDirection,
    #[error(transparent)]
    Signaling(#[from] SignalingError),
}

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("camera/microphone permission denied")]
    PermissionDenied,
    #[error("capture device unavailable: {0}")]
    DeviceUnavailable(String),
    #[error("capture produced no {0} track")]
    MissingTrack(MediaKind),
}

#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("automatic playback blocked, user gesture required")]
    AutoplayBlocked,
    #[error("decode failure: {0}")]
    Decode(String),
    #[error("track has ended")]
    TrackEnded,
}

/// Failure while consuming one remote producer. Isolated per producer,
/// never fatal to the session.
#[derive(Debug, Error)]
pub enum ConsumeError {
    #[error(transparent)]
    Signaling(#[from] SignalingError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Device(#[from] DeviceError),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Signaling(#[from] SignalingError),
    #[error("capability negotiation failed: {0}")]
    Negotiation(#[from] DeviceError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Media(#[from] MediaError),
    #[error("this session has already published")]
    AlreadyPublished,
    #[error("session is not ready to publish")]
    NotReady,
    #[error("session closed")]
    Closed,
}
