use std::future::Future;
use std::net::{SocketAddr, UdpSocket};
use std::time::Duration;
use crate::config::NetfluxConfig;

/// config for a peer on the loopback interface, with an OS assigned port and a remote address
///  that nobody listens on
pub fn loopback_config(payload_size: usize) -> NetfluxConfig {
    NetfluxConfig::new(
        SocketAddr::from(([127, 0, 0, 1], 0)),
        free_loopback_addr(),
        payload_size,
    )
}

/// Asks the OS for a currently unused port on the loopback interface. The port is released
///  before this function returns, so there is a (small) chance of someone else grabbing it.
pub fn free_loopback_addr() -> SocketAddr {
    UdpSocket::bind("127.0.0.1:0")
        .and_then(|s| s.local_addr())
        .expect("could not bind to the loopback interface")
}

/// polls a condition until it holds, giving up after a second
pub async fn eventually<F, Fut>(condition: F) -> bool
where
    F: Fn() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..100 {
        if condition().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}
