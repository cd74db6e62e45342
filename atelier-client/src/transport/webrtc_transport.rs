use crate::consumer::Consumer;
use crate::error::TransportError;
use crate::media::MediaTrack;
use crate::signaling::SignalingClient;
use atelier_core::{
    ConsumerParams, DtlsParameters, MediaKind, ProducerId, RtpParameters, TransportId,
    TransportParams,
};
use std::sync::Mutex;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportDirection {
    Send,
    Recv,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    Created,
    Connecting,
    Connected,
    Closed,
}

/// One directional transport negotiated with the media server. Built
/// from server-issued ICE/DTLS parameters; usable for produce/consume
/// only after the connect handshake is acknowledged.
pub struct WebRtcTransport {
    id: TransportId,
    direction: TransportDirection,
    state: Mutex<TransportState>,
    remote: TransportParams,
}

impl WebRtcTransport {
    pub(crate) fn new(direction: TransportDirection, params: TransportParams) -> Self {
        Self {
            id: params.id,
            direction,
            state: Mutex::new(TransportState::Created),
            remote: params,
        }
    }

    pub fn id(&self) -> TransportId {
        self.id
    }

    pub fn direction(&self) -> TransportDirection {
        self.direction
    }

    pub fn state(&self) -> TransportState {
        *self.state.lock().expect("transport state lock poisoned")
    }

    /// Server-issued parameters this transport was built from.
    pub fn remote_params(&self) -> &TransportParams {
        &self.remote
    }

    /// Perform the connect handshake: forward our DTLS parameters and
    /// wait for the server ack. A failed handshake returns the
    /// transport to `Created` so it can be retried.
    pub async fn connect(
        &self,
        signaling: &SignalingClient,
        dtls_parameters: DtlsParameters,
    ) -> Result<(), TransportError> {
        {
            let mut state = self.state.lock().expect("transport state lock poisoned");
            match *state {
                TransportState::Created => *state = TransportState::Connecting,
                TransportState::Connecting | TransportState::Connected => {
                    return Err(TransportError::AlreadyConnected);
                }
                TransportState::Closed => return Err(TransportError::Closed),
            }
        }

        match signaling.transport_connect(self.id, dtls_parameters).await {
            Ok(()) => {
                let mut state = self.state.lock().expect("transport state lock poisoned");
                if *state == TransportState::Connecting {
                    *state = TransportState::Connected;
                }
                info!(transport = %self.id, direction = ?self.direction, "transport connected");
                Ok(())
            }
            Err(err) => {
                let mut state = self.state.lock().expect("transport state lock poisoned");
                if *state == TransportState::Connecting {
                    *state = TransportState::Created;
                }
                Err(err.into())
            }
        }
    }

    /// Publish a track's parameters through this (send) transport and
    /// return the server-assigned producer id.
    pub async fn produce(
        &self,
        signaling: &SignalingClient,
        kind: MediaKind,
        rtp_parameters: RtpParameters,
    ) -> Result<ProducerId, TransportError> {
        if self.direction != TransportDirection::Send {
            return Err(TransportError::WrongDirection);
        }
        self.ensure_connected()?;
        let id = signaling
            .transport_produce(self.id, kind, rtp_parameters)
            .await?;
        debug!(transport = %self.id, producer = %id, "producer created");
        Ok(id)
    }

    /// Materialize a consumer from server-issued parameters on this
    /// (recv) transport.
    pub fn consume(&self, params: ConsumerParams) -> Result<Consumer, TransportError> {
        if self.direction != TransportDirection::Recv {
            return Err(TransportError::WrongDirection);
        }
        self.ensure_connected()?;
        let track = MediaTrack::remote(params.kind);
        debug!(transport = %self.id, consumer = %params.id, producer = %params.producer_id,
            paused = params.paused, "consumer created");
        Ok(Consumer::new(&params, track))
    }

    pub fn close(&self) {
        let mut state = self.state.lock().expect("transport state lock poisoned");
        if *state != TransportState::Closed {
            debug!(transport = %self.id, "transport closed");
            *state = TransportState::Closed;
        }
    }

    fn ensure_connected(&self) -> Result<(), TransportError> {
        match self.state() {
            TransportState::Connected => Ok(()),
            TransportState::Closed => Err(TransportError::Closed),
            _ => Err(TransportError::NotConnected),
        }
    }
}
