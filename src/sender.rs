use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio::select;
use tokio::sync::{broadcast, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, trace, warn};
use crate::config::NetfluxConfig;
use crate::packet::{Packet, PacketHeader};
use crate::payload::PayloadProvider;
use crate::send_socket::{SendSocket, SocketOwnership};
use crate::seq_nr::SeqNr;

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SenderError {
    #[error("Payload size mismatch: expected {expected} bytes, got {actual}")]
    PayloadSizeMismatch { expected: usize, actual: usize },
    #[error("Payload provider error: {0}")]
    Provider(String),
    #[error("Send error: {0}")]
    Send(String),
    #[error("Sender stopped")]
    Stopped,
}

#[derive(Clone, Debug)]
pub struct SenderSnapshot {
    /// sequence number of the most recent send attempt
    pub own_seq: SeqNr,
    /// the partner's sequence number as it is echoed in outgoing packets
    pub partner_seq_echo: SeqNr,
    pub packets_sent: u64,
    pub send_errors: u64,
    pub last_send_time: Option<Instant>,
    pub error: Option<SenderError>,
}
impl SenderSnapshot {
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn error_message(&self) -> String {
        self.error.as_ref()
            .map(|e| e.to_string())
            .unwrap_or_default()
    }
}

struct SenderInner {
    own_seq: SeqNr,
    partner_seq_echo: SeqNr,
    packets_sent: u64,
    send_errors: u64,
    last_send_time: Option<Instant>,
    error: Option<SenderError>,
}
impl SenderInner {
    fn snapshot(&self) -> SenderSnapshot {
        SenderSnapshot {
            own_seq: self.own_seq,
            partner_seq_echo: self.partner_seq_echo,
            packets_sent: self.packets_sent,
            send_errors: self.send_errors,
            last_send_time: self.last_send_time,
            error: self.error.clone(),
        }
    }

    /// The sequence number is incremented before each send attempt, so the first packet
    ///  carries 1 and 0 only appears on the wire after wrap-around
    fn next_header(&mut self) -> PacketHeader {
        self.own_seq = self.own_seq.next();
        PacketHeader {
            own_seq: self.own_seq,
            feedback_seq: self.partner_seq_echo,
        }
    }
}

/// The sending half of the protocol: a loop that sends one packet per send interval, each
///  packet echoing the partner's most recently observed sequence number.
pub struct Sender {
    inner: Arc<RwLock<SenderInner>>,
    ownership: Mutex<Option<SocketOwnership>>,
    cancel_sender: broadcast::Sender<()>,
    loop_handle: Mutex<Option<JoinHandle<()>>>,
}

impl Sender {
    /// Starts sending on `shared_socket` if it is provided, or on a newly bound socket that
    ///  the sender owns otherwise
    pub async fn start(config: Arc<NetfluxConfig>, provider: Arc<dyn PayloadProvider>, shared_socket: Option<Arc<UdpSocket>>) -> anyhow::Result<Sender> {
        config.validate()?;

        let ownership = match shared_socket {
            Some(socket) => SocketOwnership::Shared(socket),
            None => SocketOwnership::bind_for(config.remote_addr).await?,
        };
        info!("sending from {:?} to {:?} (owned socket: {})", ownership.socket().local_addr()?, config.remote_addr, ownership.is_owned());

        let send_socket: Arc<dyn SendSocket> = Arc::new(ownership.socket().clone());
        Ok(Self::start_with_send_socket(config, provider, send_socket, Some(ownership)))
    }

    fn start_with_send_socket(config: Arc<NetfluxConfig>, provider: Arc<dyn PayloadProvider>, send_socket: Arc<dyn SendSocket>, ownership: Option<SocketOwnership>) -> Sender {
        let inner = Arc::new(RwLock::new(SenderInner {
            own_seq: SeqNr::ZERO,
            partner_seq_echo: SeqNr::ZERO,
            packets_sent: 0,
            send_errors: 0,
            last_send_time: None,
            error: None,
        }));
        let (cancel_sender, cancel_receiver) = broadcast::channel(1);

        let loop_handle = tokio::spawn(Self::send_loop(
            config,
            inner.clone(),
            provider,
            send_socket,
            cancel_receiver,
        ));

        Sender {
            inner,
            ownership: Mutex::new(ownership),
            cancel_sender,
            loop_handle: Mutex::new(Some(loop_handle)),
        }
    }

    /// Stops the send loop and waits for it to terminate, releasing the socket. A socket
    ///  created by the sender is closed by this, a shared socket remains open for its owner.
    ///  Calling this more than once has no effect.
    pub async fn stop(&self) {
        let handle = match self.loop_handle.lock().await.take() {
            Some(handle) => handle,
            None => return,
        };

        debug!("stopping send loop");
        if self.cancel_sender.send(()).is_err() {
            debug!("send loop terminated before it was stopped");
        }
        if let Err(e) = handle.await {
            warn!("send loop terminated abnormally: {}", e);
        }

        if let Some(ownership) = self.ownership.lock().await.take() {
            if ownership.is_owned() {
                debug!("closing send socket");
            }
        }

        self.inner.write().await.error = Some(SenderError::Stopped);
        info!("sender stopped");
    }

    /// the partner's sequence number to echo in subsequent packets
    pub async fn set_partner_seq(&self, partner_seq: SeqNr) {
        self.inner.write().await.partner_seq_echo = partner_seq;
    }

    pub async fn own_seq(&self) -> SeqNr {
        self.inner.read().await.own_seq
    }

    pub async fn snapshot(&self) -> SenderSnapshot {
        self.inner.read().await.snapshot()
    }

    async fn send_loop(
        config: Arc<NetfluxConfig>,
        inner: Arc<RwLock<SenderInner>>,
        provider: Arc<dyn PayloadProvider>,
        send_socket: Arc<dyn SendSocket>,
        mut cancel_receiver: broadcast::Receiver<()>,
    ) {
        info!("starting send loop with interval {:?}", config.send_interval);

        // deadlines are absolute: a late tick does not shift subsequent ones
        let mut ticks = time::interval(config.send_interval);
        ticks.set_missed_tick_behavior(MissedTickBehavior::Burst);

        loop {
            select! {
                _ = cancel_receiver.recv() => break,
                _ = ticks.tick() => {}
            }

            Self::send_packet(&config, &inner, provider.as_ref(), send_socket.as_ref()).await;
        }

        info!("send loop terminated");
    }

    async fn send_packet(config: &NetfluxConfig, inner: &RwLock<SenderInner>, provider: &dyn PayloadProvider, send_socket: &dyn SendSocket) {
        let header = inner.write().await
            .next_header();

        let payload = match provider.next_payload().await {
            Ok(payload) => payload,
            Err(e) => {
                warn!("payload provider failed, skipping packet {}: {}", header.own_seq, e);
                inner.write().await.error = Some(SenderError::Provider(e.to_string()));
                return;
            }
        };

        if payload.len() != config.payload_size {
            warn!("payload has {} bytes instead of {}, skipping packet {}", payload.len(), config.payload_size, header.own_seq);
            inner.write().await.error = Some(SenderError::PayloadSizeMismatch {
                expected: config.payload_size,
                actual: payload.len(),
            });
            return;
        }

        let packet = Packet::build(&header, &payload);
        trace!("sending packet {} with feedback {}", header.own_seq, header.feedback_seq);

        let send_result = send_socket.send_packet(config.remote_addr, &packet).await;

        let mut inner = inner.write().await;
        match send_result {
            Ok(()) => {
                inner.packets_sent += 1;
                inner.last_send_time = Some(Instant::now());
                inner.error = None;
            }
            Err(e) => {
                debug!("error sending packet {}: {}", header.own_seq, e);
                inner.send_errors += 1;
                inner.error = Some(SenderError::Send(e.to_string()));
            }
        }
    }
}
