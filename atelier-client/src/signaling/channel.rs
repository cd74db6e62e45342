use crate::error::SignalingError;
use async_trait::async_trait;
use atelier_core::{ClientFrame, ServerFrame};

/// One established bidirectional signaling connection. The client owns
/// it through a driver task; implementations only frame and move bytes.
#[async_trait]
pub trait SignalingChannel: Send + 'static {
    async fn send(&mut self, frame: ClientFrame) -> Result<(), SignalingError>;

    /// Next inbound frame. `None` means the server closed the channel.
    async fn recv(&mut self) -> Option<Result<ServerFrame, SignalingError>>;

    async fn close(&mut self) -> Result<(), SignalingError>;
}

/// Opens fresh channels, so connection establishment can be retried
/// with backoff without the caller knowing the concrete transport.
#[async_trait]
pub trait ChannelFactory: Send + Sync + 'static {
    async fn open(&self) -> Result<Box<dyn SignalingChannel>, SignalingError>;
}
