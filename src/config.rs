use std::cmp::min;
use std::net::SocketAddr;
use std::time::Duration;
use anyhow::bail;
use crate::packet::Packet;

/// Largest UDP payload that fits into a single IPv4 datagram
pub const MAX_DATAGRAM_SIZE: usize = 65507;

#[derive(Debug, Clone)]
pub struct NetfluxConfig {
    /// The local address the receiver binds to. Sender and receiver share the bound socket,
    ///  so this is also the source address of outgoing packets.
    pub local_addr: SocketAddr,
    pub remote_addr: SocketAddr,

    /// Fixed size of the application payload (excluding the two header bytes). Both peers
    ///  must agree on this value out of band. 0 means header-only keep-alive packets.
    pub payload_size: usize,

    pub send_interval: Duration,

    /// The watchdog fires if there was no evidence of a live peer for longer than this
    pub watchdog_timeout: Duration,
    /// if false, the last received payload is replaced by zeroes when the watchdog fires
    pub keep_last_on_timeout: bool,

    /// Maximum time the receive loop waits for a datagram before it re-checks the watchdog.
    ///  This bounds both watchdog latency and the time `stop()` takes.
    pub receive_poll_interval: Duration,

    /// Period of the statistics loop. This is also the 'cycle time' the interval estimation
    ///  compensates for.
    pub statistics_interval: Duration,
}

impl NetfluxConfig {
    pub const DEFAULT_SEND_INTERVAL: Duration = Duration::from_millis(5);
    pub const DEFAULT_WATCHDOG_TIMEOUT: Duration = Duration::from_millis(30);
    pub const MAX_RECEIVE_POLL_INTERVAL: Duration = Duration::from_millis(100);

    pub fn new(local_addr: SocketAddr, remote_addr: SocketAddr, payload_size: usize) -> NetfluxConfig {
        NetfluxConfig {
            local_addr,
            remote_addr,
            payload_size,
            send_interval: Self::DEFAULT_SEND_INTERVAL,
            watchdog_timeout: Self::DEFAULT_WATCHDOG_TIMEOUT,
            keep_last_on_timeout: false,
            receive_poll_interval: min(Self::MAX_RECEIVE_POLL_INTERVAL, Self::DEFAULT_WATCHDOG_TIMEOUT),
            statistics_interval: Self::DEFAULT_SEND_INTERVAL,
        }
    }

    /// Sets the send interval, keeping the statistics interval aligned with it
    pub fn with_send_interval(mut self, send_interval: Duration) -> NetfluxConfig {
        self.send_interval = send_interval;
        self.statistics_interval = send_interval;
        self
    }

    /// Sets the watchdog timeout, shortening the receive poll interval if necessary so the
    ///  watchdog is evaluated at least once per timeout period
    pub fn with_watchdog_timeout(mut self, watchdog_timeout: Duration) -> NetfluxConfig {
        self.watchdog_timeout = watchdog_timeout;
        self.receive_poll_interval = min(Self::MAX_RECEIVE_POLL_INTERVAL, watchdog_timeout);
        self
    }

    pub fn with_keep_last_on_timeout(mut self, keep_last_on_timeout: bool) -> NetfluxConfig {
        self.keep_last_on_timeout = keep_last_on_timeout;
        self
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if Packet::datagram_len(self.payload_size) > MAX_DATAGRAM_SIZE {
            bail!("payload size {} does not fit into a single UDP datagram", self.payload_size);
        }
        if self.send_interval.is_zero() {
            bail!("send interval must not be 0");
        }
        if self.watchdog_timeout.is_zero() {
            bail!("watchdog timeout must not be 0");
        }
        if self.receive_poll_interval.is_zero() {
            bail!("receive poll interval must not be 0");
        }
        if self.statistics_interval.is_zero() {
            bail!("statistics interval must not be 0");
        }
        Ok(())
    }

    /// cycle time in milliseconds as used by the statistics' interval bias correction
    pub fn statistics_cycle_time_ms(&self) -> f64 {
        self.statistics_interval.as_nanos() as f64 / 1_000_000.0
    }
}
