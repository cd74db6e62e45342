//! SFU workshop-room client.
//!
//! Connects to a selective-forwarding media server over a signaling
//! channel, negotiates router capabilities into a local [`Device`],
//! drives the send/recv transport handshakes, publishes the local
//! camera track and consumes every remote producer into a peer
//! registry that a rendering layer reads.

pub mod config;
pub mod consumer;
pub mod device;
pub mod error;
pub mod media;
pub mod producer;
pub mod room;
pub mod signaling;
pub mod transport;

pub use config::{MediaConstraints, ReconnectPolicy, SessionConfig};
pub use consumer::Consumer;
pub use device::Device;
pub use error::{
    ConsumeError, DeviceError, MediaError, PlaybackError, SessionError, SignalingError,
    TransportError,
};
pub use media::{
    MediaSource, MediaStream, MediaTrack, PlaybackSurface, SyntheticMediaSource, TrackEvent,
    TrackState, TrackSubscription,
};
pub use producer::Producer;
pub use room::{PeerEntry, PeerRegistry, PeerState, RoomState, Session, SessionHandle, TileState, VideoTile};
pub use signaling::{ChannelFactory, SignalingChannel, SignalingClient, WsChannel, WsChannelFactory};
pub use transport::{TransportDirection, TransportState, WebRtcTransport};
