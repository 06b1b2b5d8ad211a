use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::select;
use tokio::sync::{broadcast, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use anyhow::bail;
use tracing::{debug, info, trace, warn};
use crate::config::{NetfluxConfig, MAX_DATAGRAM_SIZE};
use crate::packet::Packet;
use crate::payload::PayloadHandler;
use crate::seq_nr::SeqNr;

/// The receiver's error state. It is polled by the application, never raised.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ReceiverError {
    #[error("No valid packet received yet")]
    NoPacketYet,
    #[error("Watchdog timeout ({elapsed:?})")]
    WatchdogTimeout { elapsed: Duration },
    #[error("Receive error: {0}")]
    Receive(String),
    #[error("Receiver stopped")]
    Stopped,
}

/// Copy of the receiver's state at some point in time
#[derive(Clone, Debug)]
pub struct ReceiverSnapshot {
    /// the most recently observed sequence number on the wire, whether accepted or not
    pub partner_seq: SeqNr,
    /// the feedback byte of the most recently accepted packet, i.e. the partner's view of our
    ///  own sequence number
    pub feedback_seq: SeqNr,
    pub first_packet_received: bool,
    pub last_valid_packet_time: Option<Instant>,
    pub watchdog_timed_out: bool,
    pub packets_received: u64,
    /// sum of all rejections
    pub packets_rejected: u64,
    pub rejected_undersized: u64,
    pub rejected_duplicate: u64,
    pub rejected_stale: u64,
    pub error: Option<ReceiverError>,
}
impl ReceiverSnapshot {
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn error_message(&self) -> String {
        self.error.as_ref()
            .map(|e| e.to_string())
            .unwrap_or_default()
    }
}

#[derive(Debug, Eq, PartialEq)]
enum Rejection {
    Undersized,
    Duplicate,
    Stale,
}

struct ReceiverInner {
    config: Arc<NetfluxConfig>,

    partner_seq: SeqNr,
    /// NB: this is kept across watchdog resets, so a re-sent copy of the last accepted packet
    ///  is still recognized as a duplicate
    previous_accepted_seq: SeqNr,
    feedback_seq: SeqNr,
    /// feedback at the time of the previous watchdog check
    watchdog_feedback_seq: SeqNr,

    first_packet_received: bool,
    last_valid_packet_time: Option<Instant>,
    watchdog_timed_out: bool,

    packets_received: u64,
    rejected_undersized: u64,
    rejected_duplicate: u64,
    rejected_stale: u64,

    last_payload: Vec<u8>,
    error: Option<ReceiverError>,
}

impl ReceiverInner {
    fn new(config: Arc<NetfluxConfig>) -> ReceiverInner {
        let last_payload = vec![0; config.payload_size];
        ReceiverInner {
            config,
            partner_seq: SeqNr::ZERO,
            previous_accepted_seq: SeqNr::ZERO,
            feedback_seq: SeqNr::ZERO,
            watchdog_feedback_seq: SeqNr::ZERO,
            first_packet_received: false,
            last_valid_packet_time: None,
            watchdog_timed_out: false,
            packets_received: 0,
            rejected_undersized: 0,
            rejected_duplicate: 0,
            rejected_stale: 0,
            last_payload,
            error: Some(ReceiverError::NoPacketYet),
        }
    }

    fn snapshot(&self) -> ReceiverSnapshot {
        ReceiverSnapshot {
            partner_seq: self.partner_seq,
            feedback_seq: self.feedback_seq,
            first_packet_received: self.first_packet_received,
            last_valid_packet_time: self.last_valid_packet_time,
            watchdog_timed_out: self.watchdog_timed_out,
            packets_received: self.packets_received,
            packets_rejected: self.rejected_undersized + self.rejected_duplicate + self.rejected_stale,
            rejected_undersized: self.rejected_undersized,
            rejected_duplicate: self.rejected_duplicate,
            rejected_stale: self.rejected_stale,
            error: self.error.clone(),
        }
    }

    fn reject(&mut self, rejection: Rejection) {
        match rejection {
            Rejection::Undersized => self.rejected_undersized += 1,
            Rejection::Duplicate => self.rejected_duplicate += 1,
            Rejection::Stale => self.rejected_stale += 1,
        }
    }

    /// Processes a single datagram, returning a copy of the payload if the packet was accepted
    fn on_datagram(&mut self, datagram: &[u8], now: Instant) -> Option<Vec<u8>> {
        let packet = match Packet::parse(datagram, self.config.payload_size) {
            Ok(packet) => packet,
            Err(e) => {
                debug!("rejecting datagram: {}", e);
                self.reject(Rejection::Undersized);
                return None;
            }
        };

        let candidate = packet.header.own_seq;

        // the latest sequence number on the wire is visible to feedback and statistics even
        //  if the packet turns out to be stale
        self.partner_seq = candidate;

        if candidate == self.previous_accepted_seq {
            trace!("rejecting duplicate packet {}", candidate);
            self.reject(Rejection::Duplicate);
            return None;
        }

        let previous = if self.first_packet_received { Some(self.previous_accepted_seq) } else { None };
        if !SeqNr::is_fresh(candidate, previous) {
            debug!("rejecting stale packet {} (previously accepted: {})", candidate, self.previous_accepted_seq);
            self.reject(Rejection::Stale);
            return None;
        }

        trace!("accepting packet {} with feedback {}", candidate, packet.header.feedback_seq);

        if !self.first_packet_received {
            debug!("first valid packet received");
        }
        self.first_packet_received = true;
        self.last_valid_packet_time = Some(now);
        self.packets_received += 1;
        self.feedback_seq = packet.header.feedback_seq;
        self.previous_accepted_seq = candidate;
        self.last_payload.clear();
        self.last_payload.extend_from_slice(packet.payload);
        self.error = None;

        Some(self.last_payload.clone())
    }

    fn on_receive_error(&mut self, msg: String) {
        self.error = Some(ReceiverError::Receive(msg));
    }

    /// Checks the partner's liveness, returning the cleared payload if the watchdog fired and
    ///  the application needs to be notified
    fn check_watchdog(&mut self, now: Instant) -> Option<Vec<u8>> {
        if !self.first_packet_received {
            self.error = Some(ReceiverError::NoPacketYet);
            return None;
        }

        if self.feedback_seq != self.watchdog_feedback_seq {
            // the partner acknowledged something new since the last check, so it is alive
            self.watchdog_feedback_seq = self.feedback_seq;
            self.last_valid_packet_time = Some(now);
            if self.watchdog_timed_out {
                debug!("partner is alive again");
            }
            self.watchdog_timed_out = false;
            return None;
        }

        let elapsed = match self.last_valid_packet_time {
            Some(t) => now.saturating_duration_since(t),
            None => Duration::ZERO,
        };
        if elapsed <= self.config.watchdog_timeout {
            return None;
        }

        if !self.watchdog_timed_out {
            warn!("watchdog timeout: no sign of life from partner for {:?}", elapsed);
        }
        self.watchdog_timed_out = true;
        self.error = Some(ReceiverError::WatchdogTimeout { elapsed });

        if self.config.keep_last_on_timeout {
            return None;
        }

        debug!("clearing received payload after watchdog timeout");
        self.last_payload = vec![0; self.config.payload_size];
        self.first_packet_received = false;
        Some(self.last_payload.clone())
    }
}

/// The receiving half of the protocol: it owns the bound UDP socket and runs a loop that
///  validates incoming packets, keeps track of the partner's sequence numbers and watches
///  the partner's liveness.
pub struct Receiver {
    /// `None` once the receiver is stopped
    socket: RwLock<Option<Arc<UdpSocket>>>,
    inner: Arc<RwLock<ReceiverInner>>,
    cancel_sender: broadcast::Sender<()>,
    loop_handle: Mutex<Option<JoinHandle<()>>>,
}

impl Receiver {
    /// Binds the socket and spawns the receive loop. Failure to bind is fatal.
    pub async fn start(config: Arc<NetfluxConfig>, handler: Arc<dyn PayloadHandler>) -> anyhow::Result<Receiver> {
        config.validate()?;

        let socket = Arc::new(UdpSocket::bind(config.local_addr).await?);
        info!("bound receive socket to {:?}", socket.local_addr()?);

        let inner = Arc::new(RwLock::new(ReceiverInner::new(config.clone())));
        let (cancel_sender, cancel_receiver) = broadcast::channel(1);

        let loop_handle = tokio::spawn(Self::receive_loop(
            config,
            socket.clone(),
            inner.clone(),
            handler,
            cancel_receiver,
        ));

        Ok(Receiver {
            socket: RwLock::new(Some(socket)),
            inner,
            cancel_sender,
            loop_handle: Mutex::new(Some(loop_handle)),
        })
    }

    /// Stops the receive loop, waits for it to terminate and releases the socket. The socket
    ///  is closed as soon as a sender sharing it is stopped as well. Calling this more than
    ///  once has no effect.
    pub async fn stop(&self) {
        let handle = match self.loop_handle.lock().await.take() {
            Some(handle) => handle,
            None => return,
        };

        debug!("stopping receive loop");
        if self.cancel_sender.send(()).is_err() {
            debug!("receive loop terminated before it was stopped");
        }
        if let Err(e) = handle.await {
            warn!("receive loop terminated abnormally: {}", e);
        }

        if self.socket.write().await.take().is_some() {
            debug!("closing receive socket");
        }

        self.inner.write().await.error = Some(ReceiverError::Stopped);
        info!("receiver stopped");
    }

    /// the bound socket for sharing with a sender, `None` after the receiver was stopped
    pub async fn socket(&self) -> Option<Arc<UdpSocket>> {
        self.socket.read().await.clone()
    }

    pub async fn local_addr(&self) -> anyhow::Result<std::net::SocketAddr> {
        match self.socket.read().await.as_ref() {
            Some(socket) => Ok(socket.local_addr()?),
            None => bail!("receiver is stopped"),
        }
    }

    pub async fn snapshot(&self) -> ReceiverSnapshot {
        self.inner.read().await.snapshot()
    }

    pub async fn partner_seq(&self) -> SeqNr {
        self.inner.read().await.partner_seq
    }

    pub async fn feedback_seq(&self) -> SeqNr {
        self.inner.read().await.feedback_seq
    }

    /// the payload of the most recently accepted packet, or zeroes after a watchdog reset
    pub async fn last_payload(&self) -> Vec<u8> {
        self.inner.read().await.last_payload.clone()
    }

    async fn receive_loop(
        config: Arc<NetfluxConfig>,
        socket: Arc<UdpSocket>,
        inner: Arc<RwLock<ReceiverInner>>,
        handler: Arc<dyn PayloadHandler>,
        mut cancel_receiver: broadcast::Receiver<()>,
    ) {
        info!("starting receive loop");

        let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
        loop {
            let recv_result = select! {
                _ = cancel_receiver.recv() => break,
                r = time::timeout(config.receive_poll_interval, socket.recv_from(&mut buf)) => r,
            };

            let payload = match recv_result {
                Err(_) => {
                    inner.write().await
                        .check_watchdog(Instant::now())
                }
                Ok(Ok((len, from))) => {
                    trace!("received {} bytes from {:?}", len, from);
                    inner.write().await
                        .on_datagram(&buf[..len], Instant::now())
                }
                Ok(Err(e)) => {
                    warn!("error receiving UDP packet: {}", e);
                    inner.write().await
                        .on_receive_error(e.to_string());
                    None
                }
            };

            if let Some(payload) = payload {
                if let Err(e) = handler.on_payload(&payload).await {
                    warn!("error in payload handler: {}", e);
                }
            }
        }

        info!("receive loop terminated");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;
    use crate::payload::MockPayloadHandler;
    use crate::test_util::{eventually, loopback_config};
    use rstest::rstest;
    use tokio::time::advance;

    const PAYLOAD_SIZE: usize = 4;

    fn config(keep_last_on_timeout: bool) -> Arc<NetfluxConfig> {
        let config = NetfluxConfig::new(SocketAddr::from(([127, 0, 0, 1], 0)), SocketAddr::from(([127, 0, 0, 1], 9)), PAYLOAD_SIZE)
            .with_watchdog_timeout(Duration::from_millis(30))
            .with_keep_last_on_timeout(keep_last_on_timeout);
        Arc::new(config)
    }

    fn datagram(own_seq: u8, feedback_seq: u8, payload_byte: u8) -> Vec<u8> {
        vec![own_seq, feedback_seq, payload_byte, payload_byte, payload_byte, payload_byte]
    }

    #[tokio::test(start_paused = true)]
    async fn test_accept_first_packet() {
        let mut inner = ReceiverInner::new(config(false));
        assert_eq!(inner.snapshot().error, Some(ReceiverError::NoPacketYet));

        let payload = inner.on_datagram(&datagram(1, 7, 3), Instant::now());
        assert_eq!(payload, Some(vec![3, 3, 3, 3]));

        let snapshot = inner.snapshot();
        assert_eq!(snapshot.partner_seq, SeqNr::from_raw(1));
        assert_eq!(snapshot.feedback_seq, SeqNr::from_raw(7));
        assert!(snapshot.first_packet_received);
        assert_eq!(snapshot.last_valid_packet_time, Some(Instant::now()));
        assert_eq!(snapshot.packets_received, 1);
        assert_eq!(snapshot.packets_rejected, 0);
        assert!(!snapshot.is_error());
        assert_eq!(snapshot.error_message(), "");
    }

    #[rstest]
    #[case::in_order(vec![1, 2, 3, 4], 4, 0, 0)]
    #[case::duplicate(vec![1, 2, 2, 3], 3, 1, 0)]
    #[case::reordered(vec![1, 3, 2, 4], 3, 0, 1)]
    #[case::gap(vec![1, 5, 9], 3, 0, 0)]
    #[case::wrap_around(vec![254, 255, 0, 1], 4, 0, 0)]
    #[case::half_range_is_stale(vec![1, 129], 1, 0, 1)]
    fn test_freshness_filter(#[case] seqs: Vec<u8>, #[case] expected_received: u64, #[case] expected_duplicate: u64, #[case] expected_stale: u64) {
        let mut inner = ReceiverInner::new(config(false));
        for &seq in &seqs {
            inner.on_datagram(&datagram(seq, 0, seq), Instant::now());
        }

        let snapshot = inner.snapshot();
        assert_eq!(snapshot.packets_received, expected_received);
        assert_eq!(snapshot.rejected_duplicate, expected_duplicate);
        assert_eq!(snapshot.rejected_stale, expected_stale);
        assert_eq!(snapshot.packets_rejected, expected_duplicate + expected_stale);
        // the most recently observed sequence number, accepted or not
        assert_eq!(snapshot.partner_seq, SeqNr::from_raw(*seqs.last().unwrap()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_packet_does_not_change_payload_or_feedback() {
        let mut inner = ReceiverInner::new(config(false));
        inner.on_datagram(&datagram(10, 5, 1), Instant::now());
        assert_eq!(inner.on_datagram(&datagram(8, 9, 2), Instant::now()), None);

        let snapshot = inner.snapshot();
        assert_eq!(snapshot.partner_seq, SeqNr::from_raw(8));
        assert_eq!(snapshot.feedback_seq, SeqNr::from_raw(5));
        assert_eq!(inner.last_payload, vec![1, 1, 1, 1]);
        assert_eq!(inner.previous_accepted_seq, SeqNr::from_raw(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_undersized_datagram() {
        let mut inner = ReceiverInner::new(config(false));
        inner.on_datagram(&datagram(10, 5, 1), Instant::now());

        assert_eq!(inner.on_datagram(&[11], Instant::now()), None);
        assert_eq!(inner.on_datagram(&[11, 6, 1, 1, 1], Instant::now()), None);

        let snapshot = inner.snapshot();
        assert_eq!(snapshot.partner_seq, SeqNr::from_raw(10));
        assert_eq!(snapshot.rejected_undersized, 2);
        assert_eq!(snapshot.packets_rejected, 2);
        assert_eq!(snapshot.packets_received, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_header_only_packets() {
        let config = NetfluxConfig::new(SocketAddr::from(([127, 0, 0, 1], 0)), SocketAddr::from(([127, 0, 0, 1], 9)), 0);
        let mut inner = ReceiverInner::new(Arc::new(config));

        assert_eq!(inner.on_datagram(&[1, 4], Instant::now()), Some(vec![]));
        assert_eq!(inner.on_datagram(&[2, 5, 99], Instant::now()), Some(vec![]));
        assert_eq!(inner.on_datagram(&[3], Instant::now()), None);

        let snapshot = inner.snapshot();
        assert_eq!(snapshot.packets_received, 2);
        assert_eq!(snapshot.feedback_seq, SeqNr::from_raw(5));
        assert_eq!(snapshot.rejected_undersized, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_packet_with_sequence_zero_is_a_duplicate() {
        let mut inner = ReceiverInner::new(config(false));
        assert_eq!(inner.on_datagram(&datagram(0, 0, 1), Instant::now()), None);
        assert_eq!(inner.snapshot().rejected_duplicate, 1);
        assert!(!inner.snapshot().first_packet_received);
    }

    #[tokio::test(start_paused = true)]
    async fn test_watchdog_before_first_packet() {
        let mut inner = ReceiverInner::new(config(false));
        advance(Duration::from_secs(1)).await;
        assert_eq!(inner.check_watchdog(Instant::now()), None);
        assert_eq!(inner.snapshot().error, Some(ReceiverError::NoPacketYet));
        assert!(!inner.snapshot().watchdog_timed_out);
    }

    #[tokio::test(start_paused = true)]
    async fn test_watchdog_clears_payload() {
        let mut inner = ReceiverInner::new(config(false));
        inner.on_datagram(&datagram(1, 7, 3), Instant::now());

        // feedback changed since the previous check: proof of liveness
        advance(Duration::from_millis(20)).await;
        assert_eq!(inner.check_watchdog(Instant::now()), None);
        assert!(!inner.snapshot().watchdog_timed_out);

        advance(Duration::from_millis(30)).await;
        assert_eq!(inner.check_watchdog(Instant::now()), None);
        assert!(!inner.snapshot().watchdog_timed_out);

        advance(Duration::from_millis(1)).await;
        assert_eq!(inner.check_watchdog(Instant::now()), Some(vec![0, 0, 0, 0]));

        let snapshot = inner.snapshot();
        assert!(snapshot.watchdog_timed_out);
        assert!(!snapshot.first_packet_received);
        assert_eq!(snapshot.error, Some(ReceiverError::WatchdogTimeout { elapsed: Duration::from_millis(31) }));
        assert!(snapshot.error_message().starts_with("Watchdog timeout"));
        assert_eq!(inner.last_payload, vec![0, 0, 0, 0]);

        // the application is notified only once
        advance(Duration::from_millis(30)).await;
        assert_eq!(inner.check_watchdog(Instant::now()), None);
        assert_eq!(inner.snapshot().error, Some(ReceiverError::NoPacketYet));
        assert!(inner.snapshot().watchdog_timed_out);
    }

    #[tokio::test(start_paused = true)]
    async fn test_watchdog_keeps_payload() {
        let mut inner = ReceiverInner::new(config(true));
        inner.on_datagram(&datagram(1, 7, 3), Instant::now());
        assert_eq!(inner.check_watchdog(Instant::now()), None);

        advance(Duration::from_millis(31)).await;
        assert_eq!(inner.check_watchdog(Instant::now()), None);

        let snapshot = inner.snapshot();
        assert!(snapshot.watchdog_timed_out);
        assert!(snapshot.first_packet_received);
        assert!(matches!(snapshot.error, Some(ReceiverError::WatchdogTimeout { .. })));
        assert_eq!(inner.last_payload, vec![3, 3, 3, 3]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_watchdog_recovers_on_new_feedback() {
        let mut inner = ReceiverInner::new(config(true));
        inner.on_datagram(&datagram(1, 7, 3), Instant::now());
        inner.check_watchdog(Instant::now());
        advance(Duration::from_millis(50)).await;
        inner.check_watchdog(Instant::now());
        assert!(inner.snapshot().watchdog_timed_out);

        inner.on_datagram(&datagram(2, 8, 4), Instant::now());
        assert!(!inner.snapshot().is_error());
        inner.check_watchdog(Instant::now());
        assert!(!inner.snapshot().watchdog_timed_out);
    }

    #[tokio::test(start_paused = true)]
    async fn test_watchdog_measures_from_last_accepted_packet() {
        let mut inner = ReceiverInner::new(config(true));
        inner.on_datagram(&datagram(1, 7, 3), Instant::now());
        inner.check_watchdog(Instant::now());

        // the feedback does not change, but accepted packets keep the timer fresh
        for seq in 2..6 {
            advance(Duration::from_millis(10)).await;
            inner.on_datagram(&datagram(seq, 7, 3), Instant::now());
        }
        advance(Duration::from_millis(20)).await;
        inner.check_watchdog(Instant::now());
        assert!(!inner.snapshot().watchdog_timed_out);

        advance(Duration::from_millis(11)).await;
        inner.check_watchdog(Instant::now());
        assert!(inner.snapshot().watchdog_timed_out);
    }

    #[tokio::test]
    async fn test_receive_over_socket() {
        let config = Arc::new(loopback_config(PAYLOAD_SIZE));

        let received = Arc::new(std::sync::Mutex::new(Vec::new()));
        let received_clone = received.clone();
        let mut handler = MockPayloadHandler::new();
        handler.expect_on_payload()
            .returning(move |payload| {
                received_clone.lock().unwrap().push(payload.to_vec());
                Ok(())
            });

        let receiver = Receiver::start(config, Arc::new(handler)).await.unwrap();
        let receiver_addr = receiver.local_addr().await.unwrap();
        let r = &receiver;

        let peer = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        peer.send_to(&datagram(5, 2, 9), receiver_addr).await.unwrap();

        assert!(eventually(|| async move { r.snapshot().await.packets_received == 1 }).await);

        // a malformed datagram is rejected before any sequence number is extracted
        peer.send_to(&[6], receiver_addr).await.unwrap();
        assert!(eventually(|| async move { r.snapshot().await.packets_rejected == 1 }).await);

        let snapshot = receiver.snapshot().await;
        assert_eq!(snapshot.partner_seq, SeqNr::from_raw(5));
        assert_eq!(snapshot.feedback_seq, SeqNr::from_raw(2));
        assert_eq!(snapshot.rejected_undersized, 1);
        assert_eq!(receiver.partner_seq().await, SeqNr::from_raw(5));
        assert_eq!(receiver.feedback_seq().await, SeqNr::from_raw(2));
        assert_eq!(receiver.last_payload().await, vec![9, 9, 9, 9]);
        assert_eq!(received.lock().unwrap().as_slice(), &[vec![9, 9, 9, 9]]);

        receiver.stop().await;
        receiver.stop().await;
        assert_eq!(receiver.snapshot().await.error, Some(ReceiverError::Stopped));

        // the port is released by stopping
        assert!(receiver.socket().await.is_none());
        assert!(receiver.local_addr().await.is_err());
        assert!(UdpSocket::bind(receiver_addr).await.is_ok());
    }

    #[tokio::test]
    async fn test_handler_error_does_not_stop_loop() {
        let config = Arc::new(loopback_config(PAYLOAD_SIZE));

        let mut handler = MockPayloadHandler::new();
        handler.expect_on_payload()
            .returning(|_| Err(anyhow::anyhow!("decoding failed")));

        let receiver = Receiver::start(config, Arc::new(handler)).await.unwrap();
        let receiver_addr = receiver.local_addr().await.unwrap();
        let r = &receiver;

        let peer = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        peer.send_to(&datagram(1, 0, 1), receiver_addr).await.unwrap();
        peer.send_to(&datagram(2, 0, 2), receiver_addr).await.unwrap();

        assert!(eventually(|| async move { r.snapshot().await.packets_received == 2 }).await);
        receiver.stop().await;
    }

    #[tokio::test]
    async fn test_bind_failure_is_fatal() {
        let occupied = UdpSocket::bind("127.0.0.1:0").await.unwrap();

        let mut config = loopback_config(PAYLOAD_SIZE);
        config.local_addr = occupied.local_addr().unwrap();

        let result = Receiver::start(Arc::new(config), Arc::new(MockPayloadHandler::new())).await;
        assert!(result.is_err());
    }
}
