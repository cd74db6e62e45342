use crate::config::ReconnectPolicy;
use crate::error::SignalingError;
use crate::signaling::{ChannelFactory, SignalingChannel};
use atelier_core::{
    ClientFrame, ClientRequest, ConsumerId, ConsumerParams, DtlsParameters, MediaKind, ProducerId,
    RequestId, ResponseBody, RtpCapabilities, RtpParameters, ServerEvent, ServerFrame, TransportId,
    TransportParams,
};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

enum DriverMessage {
    Frame(ClientFrame),
    Close,
}

struct ClientInner {
    pending: DashMap<RequestId, oneshot::Sender<ResponseBody>>,
    ack_timeout: Duration,
}

/// Request/ack signaling client. Every call is correlated by request id
/// and bounded by the ack timeout; unsolicited pushes are surfaced on a
/// separate event channel.
#[derive(Clone)]
pub struct SignalingClient {
    inner: Arc<ClientInner>,
    driver_tx: mpsc::Sender<DriverMessage>,
}

impl SignalingClient {
    /// Take ownership of an established channel and spawn its driver.
    pub fn start(
        channel: Box<dyn SignalingChannel>,
        ack_timeout: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<ServerEvent>) {
        let (driver_tx, driver_rx) = mpsc::channel(64);
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let inner = Arc::new(ClientInner {
            pending: DashMap::new(),
            ack_timeout,
        });

        tokio::spawn(drive(channel, driver_rx, inner.clone(), event_tx));

        (Self { inner, driver_tx }, event_rx)
    }

    /// Open a channel through the factory, retrying per the backoff
    /// policy. Connection errors surface as `SignalingError::Connect`
    /// once the attempts are exhausted.
    pub async fn connect_with_backoff(
        factory: &dyn ChannelFactory,
        policy: &ReconnectPolicy,
        ack_timeout: Duration,
    ) -> Result<(Self, mpsc::UnboundedReceiver<ServerEvent>), SignalingError> {
        let mut attempt = 0u32;
        loop {
            match factory.open().await {
                Ok(channel) => {
                    if attempt > 0 {
                        info!(attempt, "signaling connection established after retry");
                    }
                    return Ok(Self::start(channel, ack_timeout));
                }
                Err(err) => {
                    attempt += 1;
                    if attempt >= policy.max_attempts {
                        error!("giving up on signaling connection: {err}");
                        return Err(err);
                    }
                    let delay = policy.delay_for(attempt - 1);
                    warn!(attempt, ?delay, "signaling connect failed: {err}, retrying");
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    async fn call_with_timeout(
        &self,
        request: ClientRequest,
        timeout: Duration,
    ) -> Result<ResponseBody, SignalingError> {
        let request_id = RequestId::new();
        let (tx, rx) = oneshot::channel();
        self.inner.pending.insert(request_id, tx);

        let frame = ClientFrame {
            request_id,
            request,
        };
        if self
            .driver_tx
            .send(DriverMessage::Frame(frame))
            .await
            .is_err()
        {
            self.inner.pending.remove(&request_id);
            return Err(SignalingError::ChannelClosed);
        }

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(ResponseBody::Error { message })) => Err(SignalingError::Remote(message)),
            Ok(Ok(body)) => Ok(body),
            Ok(Err(_)) => Err(SignalingError::ChannelClosed),
            Err(_) => {
                self.inner.pending.remove(&request_id);
                Err(SignalingError::AckTimeout {
                    request_id,
                    timeout,
                })
            }
        }
    }

    pub async fn call(&self, request: ClientRequest) -> Result<ResponseBody, SignalingError> {
        self.call_with_timeout(request, self.inner.ack_timeout).await
    }

    pub async fn router_rtp_capabilities(&self) -> Result<RtpCapabilities, SignalingError> {
        match self.call(ClientRequest::GetRouterRtpCapabilities).await? {
            ResponseBody::RouterRtpCapabilities(caps) => Ok(caps),
            _ => Err(SignalingError::UnexpectedAck("routerRtpCapabilities")),
        }
    }

    pub async fn create_transport(&self, sender: bool) -> Result<TransportParams, SignalingError> {
        match self
            .call(ClientRequest::CreateWebRtcTransport { sender })
            .await?
        {
            ResponseBody::TransportCreated(params) => Ok(params),
            _ => Err(SignalingError::UnexpectedAck("transportCreated")),
        }
    }

    pub async fn transport_connect(
        &self,
        transport_id: TransportId,
        dtls_parameters: DtlsParameters,
    ) -> Result<(), SignalingError> {
        match self
            .call(ClientRequest::TransportConnect {
                transport_id,
                dtls_parameters,
            })
            .await?
        {
            ResponseBody::Connected => Ok(()),
            _ => Err(SignalingError::UnexpectedAck("connected")),
        }
    }

    pub async fn transport_produce(
        &self,
        transport_id: TransportId,
        kind: MediaKind,
        rtp_parameters: RtpParameters,
    ) -> Result<ProducerId, SignalingError> {
        match self
            .call(ClientRequest::TransportProduce {
                transport_id,
                kind,
                rtp_parameters,
            })
            .await?
        {
            ResponseBody::Produced { id } => Ok(id),
            _ => Err(SignalingError::UnexpectedAck("produced")),
        }
    }

    pub async fn producers(&self) -> Result<Vec<ProducerId>, SignalingError> {
        match self.call(ClientRequest::GetProducers).await? {
            ResponseBody::Producers(ids) => Ok(ids),
            _ => Err(SignalingError::UnexpectedAck("producers")),
        }
    }

    pub async fn transport_consume(
        &self,
        producer_id: ProducerId,
        rtp_capabilities: RtpCapabilities,
    ) -> Result<ConsumerParams, SignalingError> {
        match self
            .call(ClientRequest::TransportConsume {
                producer_id,
                rtp_capabilities,
            })
            .await?
        {
            ResponseBody::ConsumerCreated(params) => Ok(params),
            _ => Err(SignalingError::UnexpectedAck("consumerCreated")),
        }
    }

    /// Resume the server-side half of a consumer. Bounded by its own
    /// timeout so a lost ack stalls one peer, not the session.
    pub async fn consumer_resume(
        &self,
        consumer_id: ConsumerId,
        timeout: Duration,
    ) -> Result<(), SignalingError> {
        match self
            .call_with_timeout(ClientRequest::ConsumerResume { consumer_id }, timeout)
            .await?
        {
            ResponseBody::Resumed => Ok(()),
            _ => Err(SignalingError::UnexpectedAck("resumed")),
        }
    }

    /// Disconnect. All in-flight calls fail with `ChannelClosed`.
    pub async fn close(&self) {
        let _ = self.driver_tx.send(DriverMessage::Close).await;
    }
}

async fn drive(
    mut channel: Box<dyn SignalingChannel>,
    mut driver_rx: mpsc::Receiver<DriverMessage>,
    inner: Arc<ClientInner>,
    event_tx: mpsc::UnboundedSender<ServerEvent>,
) {
    loop {
        tokio::select! {
            outbound = driver_rx.recv() => match outbound {
                Some(DriverMessage::Frame(frame)) => {
                    if let Err(err) = channel.send(frame).await {
                        error!("signaling send failed: {err}");
                        break;
                    }
                }
                Some(DriverMessage::Close) | None => {
                    let _ = channel.close().await;
                    break;
                }
            },
            inbound = channel.recv() => match inbound {
                Some(Ok(ServerFrame::Ack { request_id, body })) => {
                    match inner.pending.remove(&request_id) {
                        Some((_, reply)) => {
                            let _ = reply.send(body);
                        }
                        None => warn!(%request_id, "ack for unknown or timed-out request"),
                    }
                }
                Some(Ok(ServerFrame::Event(event))) => {
                    let _ = event_tx.send(event);
                }
                Some(Err(err)) => {
                    error!("signaling recv failed: {err}");
                    break;
                }
                None => {
                    info!("signaling channel closed by server");
                    break;
                }
            },
        }
    }

    // Fail whatever is still waiting for an ack.
    let waiting = inner.pending.len();
    if waiting > 0 {
        debug!(waiting, "dropping in-flight signaling calls");
    }
    inner.pending.clear();
}
