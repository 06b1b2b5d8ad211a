use std::net::SocketAddr;
use std::sync::Arc;
use tokio::select;
use tokio::sync::{broadcast, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use anyhow::bail;
use tracing::{debug, info, warn};
use crate::config::NetfluxConfig;
use crate::payload::{PayloadBuffer, PayloadHandler, PayloadProvider};
use crate::receiver::{Receiver, ReceiverSnapshot};
use crate::sender::{Sender, SenderSnapshot};
use crate::statistics::{Statistics, StatisticsTracker};

/// Combined view of a running engine
#[derive(Clone, Debug)]
pub struct EngineStatus {
    pub receiver: ReceiverSnapshot,
    pub sender: SenderSnapshot,
    pub statistics: Statistics,
}
impl EngineStatus {
    /// true if the partner is currently considered alive, i.e. a packet was received and the
    ///  watchdog is not firing
    pub fn is_connected(&self) -> bool {
        self.receiver.first_packet_received && !self.receiver.watchdog_timed_out
    }
}

/// One peer of a Netflux connection: a [Receiver] bound to the local address, a [Sender]
///  sharing its socket, and a loop that feeds the partner's sequence number back to the sender
///  and keeps the statistics up to date.
pub struct Engine {
    config: Arc<NetfluxConfig>,
    receiver: Arc<Receiver>,
    sender: Arc<Sender>,
    statistics: Arc<RwLock<StatisticsTracker>>,
    cancel_sender: broadcast::Sender<()>,
    statistics_handle: Mutex<Option<JoinHandle<()>>>,
}

impl Engine {
    pub async fn start(config: NetfluxConfig, handler: Arc<dyn PayloadHandler>, provider: Arc<dyn PayloadProvider>) -> anyhow::Result<Engine> {
        config.validate()?;
        let config = Arc::new(config);

        info!("starting Netflux engine: {:?} <-> {:?}, payload size {}", config.local_addr, config.remote_addr, config.payload_size);

        let receiver = Arc::new(Receiver::start(config.clone(), handler).await?);
        let shared_socket = match receiver.socket().await {
            Some(socket) => socket,
            None => bail!("receiver stopped during start-up"),
        };
        let sender = match Sender::start(config.clone(), provider, Some(shared_socket)).await {
            Ok(sender) => Arc::new(sender),
            Err(e) => {
                receiver.stop().await;
                return Err(e);
            }
        };

        let statistics = Arc::new(RwLock::new(StatisticsTracker::new(config.statistics_cycle_time_ms())));
        let (cancel_sender, cancel_receiver) = broadcast::channel(1);

        let statistics_handle = tokio::spawn(Self::statistics_loop(
            config.clone(),
            receiver.clone(),
            sender.clone(),
            statistics.clone(),
            cancel_receiver,
        ));

        Ok(Engine {
            config,
            receiver,
            sender,
            statistics,
            cancel_sender,
            statistics_handle: Mutex::new(Some(statistics_handle)),
        })
    }

    /// Starts an engine that exchanges data through a [PayloadBuffer], which is returned for
    ///  the application to read and write
    pub async fn start_buffered(config: NetfluxConfig) -> anyhow::Result<(Engine, Arc<PayloadBuffer>)> {
        let buffer = Arc::new(PayloadBuffer::new(config.payload_size));
        let engine = Self::start(config, buffer.clone(), buffer.clone()).await?;
        Ok((engine, buffer))
    }

    /// Stops statistics, sender and receiver (in this order), waiting for each of them to
    ///  terminate. Calling this more than once has no effect.
    pub async fn stop(&self) {
        if let Some(handle) = self.statistics_handle.lock().await.take() {
            debug!("stopping statistics loop");
            if self.cancel_sender.send(()).is_err() {
                debug!("statistics loop terminated before it was stopped");
            }
            if let Err(e) = handle.await {
                warn!("statistics loop terminated abnormally: {}", e);
            }
        }

        self.sender.stop().await;
        self.receiver.stop().await;
        info!("Netflux engine stopped");
    }

    pub fn config(&self) -> &NetfluxConfig {
        &self.config
    }

    pub fn receiver(&self) -> &Receiver {
        &self.receiver
    }

    pub fn sender(&self) -> &Sender {
        &self.sender
    }

    pub async fn statistics(&self) -> Statistics {
        self.statistics.read().await.snapshot()
    }

    pub async fn status(&self) -> EngineStatus {
        EngineStatus {
            receiver: self.receiver.snapshot().await,
            sender: self.sender.snapshot().await,
            statistics: self.statistics().await,
        }
    }

    /// the actual address the shared socket is bound to, which differs from the configured
    ///  address if that has port 0. This fails after the engine was stopped.
    pub async fn local_addr(&self) -> anyhow::Result<SocketAddr> {
        self.receiver.local_addr().await
    }

    async fn statistics_loop(
        config: Arc<NetfluxConfig>,
        receiver: Arc<Receiver>,
        sender: Arc<Sender>,
        statistics: Arc<RwLock<StatisticsTracker>>,
        mut cancel_receiver: broadcast::Receiver<()>,
    ) {
        info!("starting statistics loop with interval {:?}", config.statistics_interval);

        let mut ticks = time::interval(config.statistics_interval);
        ticks.set_missed_tick_behavior(MissedTickBehavior::Burst);

        loop {
            select! {
                _ = cancel_receiver.recv() => break,
                _ = ticks.tick() => {}
            }

            // both values must come from the same datagram
            let received = receiver.snapshot().await;
            let own_seq = sender.own_seq().await;

            statistics.write().await
                .update(received.partner_seq, own_seq, received.feedback_seq);

            sender.set_partner_seq(received.partner_seq).await;
        }

        info!("statistics loop terminated");
    }
}
