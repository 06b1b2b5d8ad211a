use async_trait::async_trait;
#[cfg(test)] use mockall::automock;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::UdpSocket;
use tracing::trace;

/// This is an abstraction for sending a buffer on a UDP socket, introduced to facilitate mocking
///  the I/O part away for testing
#[cfg_attr(test, automock)]
#[async_trait]
pub trait SendSocket: Send + Sync + 'static {
    async fn send_packet(&self, to: SocketAddr, packet_buf: &[u8]) -> anyhow::Result<()>;
}

#[async_trait]
impl SendSocket for Arc<UdpSocket> {
    async fn send_packet(&self, to: SocketAddr, packet_buf: &[u8]) -> anyhow::Result<()> {
        trace!("UDP socket: sending packet to {:?}", to);
        let num_sent = self.send_to(packet_buf, to).await?;
        if num_sent != packet_buf.len() {
            anyhow::bail!("sent {} of {} bytes", num_sent, packet_buf.len());
        }
        Ok(())
    }
}

/// A UDP socket can be shared between receiver and sender. The component that created the
///  socket owns it, the other one merely uses it and must not assume it is the only user.
pub enum SocketOwnership {
    Owned(Arc<UdpSocket>),
    Shared(Arc<UdpSocket>),
}
impl SocketOwnership {
    pub fn socket(&self) -> &Arc<UdpSocket> {
        match self {
            SocketOwnership::Owned(socket) => socket,
            SocketOwnership::Shared(socket) => socket,
        }
    }

    pub fn is_owned(&self) -> bool {
        matches!(self, SocketOwnership::Owned(_))
    }

    /// binds a new socket for sending to `remote_addr`, picking the address family to match
    pub async fn bind_for(remote_addr: SocketAddr) -> anyhow::Result<SocketOwnership> {
        let bind_addr = if remote_addr.is_ipv4() { "0.0.0.0:0" } else { "[::]:0" };
        let socket = UdpSocket::bind(bind_addr).await?;
        Ok(SocketOwnership::Owned(Arc::new(socket)))
    }
}
