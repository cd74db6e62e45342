use async_trait::async_trait;
use atelier_client::{ChannelFactory, SignalingChannel, SignalingError};
use atelier_core::{
    ClientFrame, ClientRequest, ConsumerId, ConsumerParams, DtlsFingerprint, DtlsParameters,
    DtlsRole, IceCandidate, IceParameters, MediaKind, ProducerId, RequestId, ResponseBody,
    RtpCapabilities, RtpCodecCapability, RtpParameters, ServerEvent, ServerFrame, TransportId,
    TransportParams,
};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

/// In-process stand-in for the media server's signaling side. Answers
/// the full request vocabulary, records call counts and lets tests
/// inject faults: paused consumers, dropped resume acks, delayed
/// consume acks or a fully silent server.
#[derive(Clone)]
pub struct MockWorkshopServer {
    inner: Arc<ServerInner>,
}

struct ServerInner {
    producers: Mutex<Vec<ProducerId>>,
    paused_consumers: AtomicBool,
    drop_resume_acks: AtomicBool,
    mute_all: AtomicBool,
    consume_delay: Mutex<Duration>,
    failing_producers: Mutex<Vec<ProducerId>>,
    connect_calls: AtomicUsize,
    produce_calls: AtomicUsize,
    consume_calls: AtomicUsize,
    resume_calls: AtomicUsize,
    resumed: Mutex<Vec<ConsumerId>>,
    clients: Mutex<Vec<mpsc::UnboundedSender<ServerFrame>>>,
}

impl MockWorkshopServer {
    pub fn new() -> Self {
        Self::with_producers(Vec::new())
    }

    /// A server whose room already holds the given producers.
    pub fn with_producers(producers: Vec<ProducerId>) -> Self {
        Self {
            inner: Arc::new(ServerInner {
                producers: Mutex::new(producers),
                paused_consumers: AtomicBool::new(false),
                drop_resume_acks: AtomicBool::new(false),
                mute_all: AtomicBool::new(false),
                consume_delay: Mutex::new(Duration::ZERO),
                failing_producers: Mutex::new(Vec::new()),
                connect_calls: AtomicUsize::new(0),
                produce_calls: AtomicUsize::new(0),
                consume_calls: AtomicUsize::new(0),
                resume_calls: AtomicUsize::new(0),
                resumed: Mutex::new(Vec::new()),
                clients: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Hand consumers out in the paused state, like a server that waits
    /// for the explicit resume.
    pub fn set_paused_consumers(&self, paused: bool) {
        self.inner.paused_consumers.store(paused, Ordering::SeqCst);
    }

    /// Swallow `consumer-resume` acks while still recording the call.
    pub fn set_drop_resume_acks(&self, drop: bool) {
        self.inner.drop_resume_acks.store(drop, Ordering::SeqCst);
    }

    /// Stop answering anything at all.
    pub fn set_mute_all(&self, mute: bool) {
        self.inner.mute_all.store(mute, Ordering::SeqCst);
    }

    /// Reject `transport-consume` for this producer with an error ack.
    pub fn fail_consume_for(&self, producer_id: ProducerId) {
        self.inner.failing_producers.lock().unwrap().push(producer_id);
    }

    pub fn clear_consume_failures(&self) {
        self.inner.failing_producers.lock().unwrap().clear();
    }

    /// Delay `transport-consume` acks to widen race windows.
    pub fn set_consume_delay(&self, delay: Duration) {
        *self.inner.consume_delay.lock().unwrap() = delay;
    }

    /// Push a `new-producer` announcement to every connected client.
    pub fn push_new_producer(&self, producer_id: ProducerId) {
        let clients = self.inner.clients.lock().unwrap();
        for tx in clients.iter() {
            let _ = tx.send(ServerFrame::Event(ServerEvent::NewProducer { producer_id }));
        }
    }

    pub fn connect_calls(&self) -> usize {
        self.inner.connect_calls.load(Ordering::SeqCst)
    }

    pub fn produce_calls(&self) -> usize {
        self.inner.produce_calls.load(Ordering::SeqCst)
    }

    pub fn consume_calls(&self) -> usize {
        self.inner.consume_calls.load(Ordering::SeqCst)
    }

    pub fn resume_calls(&self) -> usize {
        self.inner.resume_calls.load(Ordering::SeqCst)
    }

    pub fn resumed_consumers(&self) -> Vec<ConsumerId> {
        self.inner.resumed.lock().unwrap().clone()
    }

    pub fn channel(&self) -> MockChannel {
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner.clients.lock().unwrap().push(tx.clone());
        MockChannel {
            server: self.inner.clone(),
            tx,
            rx,
        }
    }
}

impl Default for MockWorkshopServer {
    fn default() -> Self {
        Self::new()
    }
}

/// Client end of one mock signaling connection.
pub struct MockChannel {
    server: Arc<ServerInner>,
    tx: mpsc::UnboundedSender<ServerFrame>,
    rx: mpsc::UnboundedReceiver<ServerFrame>,
}

#[async_trait]
impl SignalingChannel for MockChannel {
    async fn send(&mut self, frame: ClientFrame) -> Result<(), SignalingError> {
        handle_request(&self.server, frame, &self.tx);
        Ok(())
    }

    async fn recv(&mut self) -> Option<Result<ServerFrame, SignalingError>> {
        self.rx.recv().await.map(Ok)
    }

    async fn close(&mut self) -> Result<(), SignalingError> {
        self.rx.close();
        Ok(())
    }
}

fn handle_request(
    server: &Arc<ServerInner>,
    frame: ClientFrame,
    out: &mpsc::UnboundedSender<ServerFrame>,
) {
    if server.mute_all.load(Ordering::SeqCst) {
        return;
    }
    let ClientFrame {
        request_id,
        request,
    } = frame;
    let ack = |body: ResponseBody| {
        let _ = out.send(ServerFrame::Ack { request_id, body });
    };

    match request {
        ClientRequest::GetRouterRtpCapabilities => {
            ack(ResponseBody::RouterRtpCapabilities(router_capabilities()));
        }
        ClientRequest::CreateWebRtcTransport { .. } => {
            ack(ResponseBody::TransportCreated(transport_params()));
        }
        ClientRequest::TransportConnect { .. } => {
            server.connect_calls.fetch_add(1, Ordering::SeqCst);
            ack(ResponseBody::Connected);
        }
        ClientRequest::TransportProduce { .. } => {
            server.produce_calls.fetch_add(1, Ordering::SeqCst);
            let id = ProducerId::new();
            server.producers.lock().unwrap().push(id);
            ack(ResponseBody::Produced { id });
        }
        ClientRequest::GetProducers => {
            ack(ResponseBody::Producers(
                server.producers.lock().unwrap().clone(),
            ));
        }
        ClientRequest::TransportConsume { producer_id, .. } => {
            server.consume_calls.fetch_add(1, Ordering::SeqCst);
            if server
                .failing_producers
                .lock()
                .unwrap()
                .contains(&producer_id)
            {
                ack(ResponseBody::Error {
                    message: format!("cannot consume producer {producer_id}"),
                });
                return;
            }
            let params = ConsumerParams {
                id: ConsumerId::new(),
                producer_id,
                kind: MediaKind::Video,
                rtp_parameters: RtpParameters::default(),
                paused: server.paused_consumers.load(Ordering::SeqCst),
            };
            let delay = *server.consume_delay.lock().unwrap();
            if delay.is_zero() {
                ack(ResponseBody::ConsumerCreated(params));
            } else {
                let out = out.clone();
                tokio::spawn(delayed_ack(out, request_id, params, delay));
            }
        }
        ClientRequest::ConsumerResume { consumer_id } => {
            server.resume_calls.fetch_add(1, Ordering::SeqCst);
            server.resumed.lock().unwrap().push(consumer_id);
            if !server.drop_resume_acks.load(Ordering::SeqCst) {
                ack(ResponseBody::Resumed);
            }
        }
    }
}

async fn delayed_ack(
    out: mpsc::UnboundedSender<ServerFrame>,
    request_id: RequestId,
    params: ConsumerParams,
    delay: Duration,
) {
    tokio::time::sleep(delay).await;
    let _ = out.send(ServerFrame::Ack {
        request_id,
        body: ResponseBody::ConsumerCreated(params),
    });
}

pub fn router_capabilities() -> RtpCapabilities {
    RtpCapabilities {
        codecs: vec![
            RtpCodecCapability {
                kind: MediaKind::Video,
                mime_type: "video/VP8".into(),
                clock_rate: 90_000,
                channels: None,
            },
            RtpCodecCapability {
                kind: MediaKind::Audio,
                mime_type: "audio/opus".into(),
                clock_rate: 48_000,
                channels: Some(2),
            },
        ],
    }
}

fn transport_params() -> TransportParams {
    TransportParams {
        id: TransportId::new(),
        ice_parameters: IceParameters {
            username_fragment: "mockufrag".into(),
            password: "mockpassword".into(),
            ice_lite: true,
        },
        ice_candidates: vec![IceCandidate {
            foundation: "udpcandidate".into(),
            priority: 1_015,
            address: "127.0.0.1".into(),
            port: 44_444,
            protocol: "udp".into(),
        }],
        dtls_parameters: DtlsParameters {
            role: DtlsRole::Auto,
            fingerprints: vec![DtlsFingerprint {
                algorithm: "sha-256".into(),
                value: "0F:74:31:25:CB:A2:13:EC:28:6F:6D:2C:61:FF:46:3B".into(),
            }],
        },
    }
}

/// Opens channels against the mock server. Can be told to refuse the
/// first N attempts to exercise the reconnect backoff.
pub struct MockChannelFactory {
    server: MockWorkshopServer,
    fail_remaining: AtomicU32,
    attempts: AtomicU32,
}

impl MockChannelFactory {
    pub fn new(server: &MockWorkshopServer) -> Self {
        Self::failing_first(server, 0)
    }

    pub fn failing_first(server: &MockWorkshopServer, failures: u32) -> Self {
        Self {
            server: server.clone(),
            fail_remaining: AtomicU32::new(failures),
            attempts: AtomicU32::new(0),
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChannelFactory for MockChannelFactory {
    async fn open(&self) -> Result<Box<dyn SignalingChannel>, SignalingError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail_remaining.load(Ordering::SeqCst) > 0 {
            self.fail_remaining.fetch_sub(1, Ordering::SeqCst);
            return Err(SignalingError::Connect("connection refused".into()));
        }
        Ok(Box::new(self.server.channel()))
    }
}
