use crate::config::{MediaConstraints, SessionConfig};
use crate::device::Device;
use crate::error::{ConsumeError, MediaError, SessionError, SignalingError};
use crate::media::{MediaSource, MediaStream};
use crate::producer::Producer;
use crate::room::{PeerEntry, PeerRegistry, PeerState, SessionCommand};
use crate::signaling::{ChannelFactory, SignalingClient};
use crate::transport::WebRtcTransport;
use atelier_core::{ConsumerId, MediaKind, ProducerId, ServerEvent};
use dashmap::DashSet;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, error, info, warn};

/// Room lifecycle. `Joined` is entered at most once; a new room needs
/// a new session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomState {
    Initializing,
    Ready,
    Joined,
    Failed,
    Closed,
}

enum SessionEvent {
    Published {
        producer_id: ProducerId,
        stream: MediaStream,
    },
    PublishFailed,
}

/// Everything a spawned consume task needs. Kept apart from the
/// session so consumes overlap with command handling instead of
/// serializing behind it.
struct ConsumeCtx {
    signaling: SignalingClient,
    device: Arc<Device>,
    recv_transport: Arc<WebRtcTransport>,
    registry: PeerRegistry,
    own_producer: Arc<OnceLock<ProducerId>>,
    pending: DashSet<ProducerId>,
    resume_timeout: Duration,
}

struct PublishCtx {
    media: Arc<dyn MediaSource>,
    signaling: SignalingClient,
    device: Arc<Device>,
    send_transport: Arc<WebRtcTransport>,
    own_producer: Arc<OnceLock<ProducerId>>,
    constraints: MediaConstraints,
    internal_tx: mpsc::UnboundedSender<SessionEvent>,
}

/// One workshop-room session: owns the signaling connection, the
/// device and both transports, and runs the event loop that reacts to
/// producer announcements and user commands.
pub struct Session {
    config: SessionConfig,
    media: Arc<dyn MediaSource>,
    signaling: SignalingClient,
    events_rx: mpsc::UnboundedReceiver<ServerEvent>,
    send_transport: Arc<WebRtcTransport>,
    recv_transport: Arc<WebRtcTransport>,
    registry: PeerRegistry,
    consume_ctx: Arc<ConsumeCtx>,
    state_tx: watch::Sender<RoomState>,
    cmd_rx: mpsc::Receiver<SessionCommand>,
    internal_tx: mpsc::UnboundedSender<SessionEvent>,
    internal_rx: mpsc::UnboundedReceiver<SessionEvent>,
    producer: Option<Producer>,
    local_stream: Option<MediaStream>,
    publish_in_flight: bool,
    events_lost: bool,
}

impl Session {
    /// Connect and negotiate up to the `Ready` state: signaling channel
    /// (with backoff), router capabilities into the device, then the
    /// send and recv transport handshakes, strictly in that order.
    /// Errors here are session-fatal; retrying means a fresh call.
    pub async fn connect(
        factory: &dyn ChannelFactory,
        media: Arc<dyn MediaSource>,
        config: SessionConfig,
    ) -> Result<(SessionHandle, Session), SessionError> {
        let (signaling, events_rx) =
            SignalingClient::connect_with_backoff(factory, &config.reconnect, config.ack_timeout)
                .await?;

        let device = Arc::new(Device::new());
        let (send_transport, recv_transport) = match negotiate(&signaling, &device).await {
            Ok(transports) => transports,
            Err(err) => {
                signaling.close().await;
                return Err(err);
            }
        };

        let registry = PeerRegistry::new();
        let own_producer = Arc::new(OnceLock::new());
        let consume_ctx = Arc::new(ConsumeCtx {
            signaling: signaling.clone(),
            device: device.clone(),
            recv_transport: recv_transport.clone(),
            registry: registry.clone(),
            own_producer: own_producer.clone(),
            pending: DashSet::new(),
            resume_timeout: config.resume_timeout,
        });

        let (state_tx, state_rx) = watch::channel(RoomState::Initializing);
        let (cmd_tx, cmd_rx) = mpsc::channel(32);
        let (internal_tx, internal_rx) = mpsc::unbounded_channel();

        state_tx.send_replace(RoomState::Ready);
        info!("session ready, transports connected");

        let handle = SessionHandle {
            cmd_tx,
            registry: registry.clone(),
            state_rx,
            own_producer,
        };
        let session = Session {
            media,
            signaling,
            events_rx,
            send_transport,
            recv_transport,
            registry,
            consume_ctx,
            state_tx,
            cmd_rx,
            internal_tx,
            internal_rx,
            producer: None,
            local_stream: None,
            publish_in_flight: false,
            events_lost: false,
            config,
        };
        Ok((handle, session))
    }

    /// Session event loop. Fetches the producers already in the room,
    /// then reacts to announcements, commands and spawned-task results
    /// until shutdown.
    pub async fn run(mut self) {
        info!("session event loop started");

        match self.signaling.producers().await {
            Ok(ids) => {
                debug!(count = ids.len(), "existing producers fetched");
                for id in ids {
                    self.spawn_consume(id);
                }
            }
            Err(err) => warn!("failed to fetch existing producers: {err}"),
        }

        loop {
            tokio::select! {
                cmd = self.cmd_rx.recv() => match cmd {
                    Some(cmd) => {
                        if self.handle_command(cmd).await {
                            break;
                        }
                    }
                    None => {
                        self.teardown().await;
                        break;
                    }
                },
                event = self.events_rx.recv(), if !self.events_lost => match event {
                    Some(ServerEvent::NewProducer { producer_id }) => {
                        debug!(%producer_id, "new producer announced");
                        self.spawn_consume(producer_id);
                    }
                    None => {
                        warn!("signaling connection lost");
                        self.events_lost = true;
                        self.state_tx.send_replace(RoomState::Failed);
                    }
                },
                Some(event) = self.internal_rx.recv() => self.handle_internal(event),
            }
        }

        info!("session event loop finished");
    }

    async fn handle_command(&mut self, cmd: SessionCommand) -> bool {
        match cmd {
            SessionCommand::Publish { reply } => self.handle_publish(reply),
            SessionCommand::RemovePeer {
                producer_id,
                consumer_id,
            } => match self.registry.remove_matching(&producer_id, consumer_id) {
                Some(entry) => {
                    entry.consumer.close();
                    info!(%producer_id, "peer removed");
                }
                None => debug!(%producer_id, "stale peer removal ignored"),
            },
            SessionCommand::Shutdown { reply } => {
                self.teardown().await;
                let _ = reply.send(());
                return true;
            }
        }
        false
    }

    fn handle_publish(&mut self, reply: oneshot::Sender<Result<ProducerId, SessionError>>) {
        let state = *self.state_tx.borrow();
        if state == RoomState::Joined || self.publish_in_flight {
            let _ = reply.send(Err(SessionError::AlreadyPublished));
            return;
        }
        if state != RoomState::Ready {
            let _ = reply.send(Err(SessionError::NotReady));
            return;
        }

        self.publish_in_flight = true;
        let ctx = PublishCtx {
            media: self.media.clone(),
            signaling: self.signaling.clone(),
            device: self.consume_ctx.device.clone(),
            send_transport: self.send_transport.clone(),
            own_producer: self.consume_ctx.own_producer.clone(),
            constraints: self.config.constraints,
            internal_tx: self.internal_tx.clone(),
        };
        // The camera permission prompt can take however long the user
        // takes; it must not hold up producer announcements.
        tokio::spawn(publish_task(ctx, reply));
    }

    fn handle_internal(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Published {
                producer_id,
                stream,
            } => {
                self.publish_in_flight = false;
                if let Some(track) = stream.video_track() {
                    self.producer = Some(Producer::new(producer_id, MediaKind::Video, track.clone()));
                }
                self.local_stream = Some(stream);
                self.state_tx.send_replace(RoomState::Joined);
                info!(%producer_id, "local video published, room joined");
            }
            SessionEvent::PublishFailed => {
                // Still ready; the transport stays usable for a retry.
                self.publish_in_flight = false;
            }
        }
    }

    fn spawn_consume(&self, producer_id: ProducerId) {
        let ctx = self.consume_ctx.clone();
        if ctx.own_producer.get() == Some(&producer_id) {
            debug!(%producer_id, "skipping own producer");
            return;
        }
        if !ctx.pending.insert(producer_id) {
            debug!(%producer_id, "consume already in flight");
            return;
        }
        tokio::spawn(async move {
            let result = consume_producer(&ctx, producer_id).await;
            ctx.pending.remove(&producer_id);
            if let Err(err) = result {
                // One broken producer never aborts the others.
                warn!(%producer_id, "failed to consume producer: {err}");
            }
        });
    }

    async fn teardown(&mut self) {
        let peers = self.registry.drain();
        let count = peers.len();
        for entry in peers {
            entry.consumer.close();
        }
        if let Some(producer) = self.producer.take() {
            producer.close();
        }
        if let Some(stream) = self.local_stream.take() {
            stream.stop();
        }
        self.send_transport.close();
        self.recv_transport.close();
        self.signaling.close().await;
        self.state_tx.send_replace(RoomState::Closed);
        info!(peers = count, "session torn down");
    }
}

async fn negotiate(
    signaling: &SignalingClient,
    device: &Device,
) -> Result<(Arc<WebRtcTransport>, Arc<WebRtcTransport>), SessionError> {
    let capabilities = signaling.router_rtp_capabilities().await?;
    device.load(capabilities)?;

    let params = signaling.create_transport(true).await?;
    let send_transport = Arc::new(device.create_send_transport(params)?);
    send_transport
        .connect(signaling, device.dtls_parameters())
        .await?;

    let params = signaling.create_transport(false).await?;
    let recv_transport = Arc::new(device.create_recv_transport(params)?);
    recv_transport
        .connect(signaling, device.dtls_parameters())
        .await?;

    Ok((send_transport, recv_transport))
}

async fn consume_producer(
    ctx: &ConsumeCtx,
    producer_id: ProducerId,
) -> Result<(), ConsumeError> {
    let capabilities = ctx.device.rtp_capabilities()?;
    let params = ctx
        .signaling
        .transport_consume(producer_id, capabilities)
        .await?;
    let consumer = Arc::new(ctx.recv_transport.consume(params)?);

    // The two pause flags are independent; clear both regardless of
    // the initial state the server handed us.
    consumer.resume_local();
    let state = match ctx
        .signaling
        .consumer_resume(consumer.id(), ctx.resume_timeout)
        .await
    {
        Ok(()) => {
            consumer.mark_server_resumed();
            PeerState::Ready
        }
        Err(SignalingError::AckTimeout { .. }) => {
            warn!(%producer_id, "consumer-resume ack lost, peer stalled");
            PeerState::Stalled
        }
        Err(err) => {
            consumer.close();
            return Err(err.into());
        }
    };
    consumer.track().set_enabled(true);

    // The produce ack can land while this consume is in flight; our
    // own producer must still never reach the registry.
    if ctx.own_producer.get() == Some(&producer_id) {
        consumer.close();
        return Ok(());
    }

    let entry = PeerEntry {
        producer_id,
        track: consumer.track().clone(),
        consumer: consumer.clone(),
        state,
    };
    if let Some(previous) = ctx.registry.upsert(entry) {
        debug!(%producer_id, "peer entry replaced in place");
        previous.consumer.close();
    }
    Ok(())
}

async fn publish_task(
    ctx: PublishCtx,
    reply: oneshot::Sender<Result<ProducerId, SessionError>>,
) {
    match do_publish(&ctx).await {
        Ok((producer_id, stream)) => {
            let _ = ctx.internal_tx.send(SessionEvent::Published {
                producer_id,
                stream,
            });
            let _ = reply.send(Ok(producer_id));
        }
        Err(err) => {
            error!("publish failed: {err}");
            let _ = ctx.internal_tx.send(SessionEvent::PublishFailed);
            let _ = reply.send(Err(err));
        }
    }
}

async fn do_publish(ctx: &PublishCtx) -> Result<(ProducerId, MediaStream), SessionError> {
    let stream = ctx.media.capture(ctx.constraints).await?;
    if stream.video_track().is_none() {
        return Err(MediaError::MissingTrack(MediaKind::Video).into());
    }
    let rtp_parameters = ctx.device.send_rtp_parameters(MediaKind::Video)?;

    let producer_id = ctx
        .send_transport
        .produce(&ctx.signaling, MediaKind::Video, rtp_parameters)
        .await?;
    // Record the id before the server can announce it back to us.
    let _ = ctx.own_producer.set(producer_id);
    info!(%producer_id, "publishing local video");
    Ok((producer_id, stream))
}

/// Cloneable handle to a running session.
#[derive(Clone)]
pub struct SessionHandle {
    cmd_tx: mpsc::Sender<SessionCommand>,
    registry: PeerRegistry,
    state_rx: watch::Receiver<RoomState>,
    own_producer: Arc<OnceLock<ProducerId>>,
}

impl SessionHandle {
    /// Start the camera and publish. Resolves with the server-assigned
    /// producer id once the room is joined.
    pub async fn publish(&self) -> Result<ProducerId, SessionError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(SessionCommand::Publish { reply: tx })
            .await
            .map_err(|_| SessionError::Closed)?;
        rx.await.map_err(|_| SessionError::Closed)?
    }

    /// Remove a peer entry, but only while it still holds the given
    /// consumer. A removal that raced an in-place replacement is a
    /// no-op.
    pub async fn remove_peer(&self, producer_id: ProducerId, consumer_id: ConsumerId) {
        let _ = self
            .cmd_tx
            .send(SessionCommand::RemovePeer {
                producer_id,
                consumer_id,
            })
            .await;
    }

    pub async fn shutdown(&self) {
        let (tx, rx) = oneshot::channel();
        if self
            .cmd_tx
            .send(SessionCommand::Shutdown { reply: tx })
            .await
            .is_ok()
        {
            let _ = rx.await;
        }
    }

    pub fn peers(&self) -> PeerRegistry {
        self.registry.clone()
    }

    pub fn state(&self) -> RoomState {
        *self.state_rx.borrow()
    }

    /// Block until the room reaches the given state. Errors if the
    /// session actor is gone.
    pub async fn wait_for_state(&mut self, target: RoomState) -> Result<(), SessionError> {
        self.state_rx
            .wait_for(|state| *state == target)
            .await
            .map(|_| ())
            .map_err(|_| SessionError::Closed)
    }

    /// Our own producer id, once published. Used for self-filtering.
    pub fn producer_id(&self) -> Option<ProducerId> {
        self.own_producer.get().copied()
    }
}
