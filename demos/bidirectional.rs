use clap::Parser;
use clap_derive::Parser;
use netflux::config::NetfluxConfig;
use netflux::engine::Engine;
use netflux::payload::PayloadCodec;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::select;
use tokio::time;
use tracing::{info, warn, Level};

/// Run one peer of a Netflux connection. Start a second instance with the addresses swapped
///  to see them talk, e.g.
///
/// ```text
/// cargo run --example bidirectional -- 127.0.0.1:9000 127.0.0.1:9001
/// cargo run --example bidirectional -- 127.0.0.1:9001 127.0.0.1:9000
/// ```
#[derive(Parser)]
struct Args {
    local_address: String,
    remote_address: String,

    #[clap(long, default_value_t = 5)]
    send_interval_millis: u64,

    #[clap(long, default_value_t = 30)]
    watchdog_timeout_millis: u64,

    #[clap(long, default_value_t = false)]
    keep_last_on_timeout: bool,

    #[clap(short, long, default_value_t = false)]
    verbose: bool,

    #[clap(long, default_value_t = false)]
    very_verbose: bool,
}

#[derive(Debug, Default)]
struct SampleData {
    x: f32,
    y: f32,
    counter: u32,
    flags: u32,
    status: u32,
}

impl PayloadCodec for SampleData {
    const SIZE: usize = 20;

    fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(Self::SIZE);
        buf.extend_from_slice(&self.x.to_le_bytes());
        buf.extend_from_slice(&self.y.to_le_bytes());
        buf.extend_from_slice(&self.counter.to_le_bytes());
        buf.extend_from_slice(&self.flags.to_le_bytes());
        buf.extend_from_slice(&self.status.to_le_bytes());
        buf
    }

    fn decode_exact(buf: &[u8]) -> Self {
        let word = |offs: usize| [buf[offs], buf[offs+1], buf[offs+2], buf[offs+3]];
        SampleData {
            x: f32::from_le_bytes(word(0)),
            y: f32::from_le_bytes(word(4)),
            counter: u32::from_le_bytes(word(8)),
            flags: u32::from_le_bytes(word(12)),
            status: u32::from_le_bytes(word(16)),
        }
    }
}

#[tokio::main]
pub async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let level = match (args.verbose, args.very_verbose) {
        (_, true) => Level::TRACE,
        (true, _) => Level::DEBUG,
        (false, false) => Level::INFO,
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .try_init()
        .ok();

    let local_addr: SocketAddr = args.local_address.parse()?;
    let remote_addr: SocketAddr = args.remote_address.parse()?;

    let config = NetfluxConfig::new(local_addr, remote_addr, SampleData::SIZE)
        .with_send_interval(Duration::from_millis(args.send_interval_millis))
        .with_watchdog_timeout(Duration::from_millis(args.watchdog_timeout_millis))
        .with_keep_last_on_timeout(args.keep_last_on_timeout);

    let (engine, buffer) = Engine::start_buffered(config).await?;

    let mut update_ticks = time::interval(Duration::from_millis(100));
    let mut status_ticks = time::interval(Duration::from_secs(1));
    let mut data = SampleData::default();

    loop {
        select! {
            _ = update_ticks.tick() => {
                data.counter = data.counter.wrapping_add(1);
                data.x = (data.counter as f32 / 10.0).sin();
                data.y = (data.counter as f32 / 10.0).cos();
                buffer.set_send(&data).await;
            }
            _ = status_ticks.tick() => {
                let status = engine.status().await;
                let received: SampleData = buffer.received().await;

                if status.is_connected() {
                    info!("connected - received {:?}", received);
                }
                else {
                    warn!("not connected: {}", status.receiver.error_message());
                }
                info!("sent {} packets ({} errors), received {} ({} rejected)",
                    status.sender.packets_sent, status.sender.send_errors,
                    status.receiver.packets_received, status.receiver.packets_rejected);
                info!("avg interval own {:.2}ms / partner {:.2}ms, RTT {:.2}ms, lost {} / feedback lost {}",
                    status.statistics.avg_own_interval_ms, status.statistics.avg_partner_interval_ms,
                    status.statistics.last_rtt_ms,
                    status.statistics.partner_lost_packets, status.statistics.feedback_lost_packets);
            }
            _ = tokio::signal::ctrl_c() => {
                info!("shutting down");
                break;
            }
        }
    }

    engine.stop().await;
    Ok(())
}
