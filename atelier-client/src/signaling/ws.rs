use crate::error::SignalingError;
use crate::signaling::{ChannelFactory, SignalingChannel};
use async_trait::async_trait;
use atelier_core::{ClientFrame, ServerFrame};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info};

/// JSON-over-WebSocket signaling channel.
pub struct WsChannel {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl WsChannel {
    pub async fn connect(url: &str) -> Result<Self, SignalingError> {
        let (stream, _) = connect_async(url)
            .await
            .map_err(|e| SignalingError::Connect(e.to_string()))?;
        info!(url, "signaling websocket connected");
        Ok(Self { stream })
    }
}

#[async_trait]
impl SignalingChannel for WsChannel {
    async fn send(&mut self, frame: ClientFrame) -> Result<(), SignalingError> {
        let json = serde_json::to_string(&frame)?;
        self.stream
            .send(Message::Text(json))
            .await
            .map_err(|e| SignalingError::WebSocket(e.to_string()))
    }

    async fn recv(&mut self) -> Option<Result<ServerFrame, SignalingError>> {
        while let Some(next) = self.stream.next().await {
            match next {
                Ok(Message::Text(text)) => {
                    return Some(serde_json::from_str(&text).map_err(SignalingError::from));
                }
                Ok(Message::Close(_)) => return None,
                // Pings and pongs are handled by the stream itself.
                Ok(other) => debug!("ignoring non-text frame: {other:?}"),
                Err(e) => return Some(Err(SignalingError::WebSocket(e.to_string()))),
            }
        }
        None
    }

    async fn close(&mut self) -> Result<(), SignalingError> {
        self.stream
            .close(None)
            .await
            .map_err(|e| SignalingError::WebSocket(e.to_string()))
    }
}

#[derive(Debug, Clone)]
pub struct WsChannelFactory {
    pub url: String,
}

impl WsChannelFactory {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[async_trait]
impl ChannelFactory for WsChannelFactory {
    async fn open(&self) -> Result<Box<dyn SignalingChannel>, SignalingError> {
        Ok(Box::new(WsChannel::connect(&self.url).await?))
    }
}
