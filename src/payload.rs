use async_trait::async_trait;
#[cfg(test)] use mockall::automock;
use tokio::sync::RwLock;
use tracing::trace;

/// Consumer of received payloads. This is called for every accepted packet, and with an
///  all-zero payload when the watchdog clears the received data.
///
/// NB: Errors are logged by the caller and otherwise ignored - they never stop the receive loop
#[cfg_attr(test, automock)]
#[async_trait]
pub trait PayloadHandler: Send + Sync + 'static {
    async fn on_payload(&self, payload: &[u8]) -> anyhow::Result<()>;
}

/// Source of the payload for each outgoing packet. The returned buffer must have exactly the
///  configured payload size, otherwise the packet is not sent.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait PayloadProvider: Send + Sync + 'static {
    async fn next_payload(&self) -> anyhow::Result<Vec<u8>>;
}

/// Fixed-size binary representation of an application data structure
pub trait PayloadCodec: Sized {
    const SIZE: usize;

    /// must return exactly [PayloadCodec::SIZE] bytes
    fn encode(&self) -> Vec<u8>;

    /// decodes from a buffer of [PayloadCodec::SIZE] bytes
    fn decode_exact(buf: &[u8]) -> Self;

    /// zero-pads or truncates to [PayloadCodec::SIZE] bytes before decoding
    fn decode(buf: &[u8]) -> Self {
        if buf.len() >= Self::SIZE {
            return Self::decode_exact(&buf[..Self::SIZE]);
        }

        let mut padded = buf.to_vec();
        padded.resize(Self::SIZE, 0);
        Self::decode_exact(&padded)
    }
}

/// Holds the payload to be sent next and the most recently received payload, decoupling the
///  application from the protocol loops. It is both the [PayloadProvider] and the
///  [PayloadHandler] for an engine.
pub struct PayloadBuffer {
    payload_size: usize,
    send: RwLock<Vec<u8>>,
    received: RwLock<ReceivedPayload>,
}

struct ReceivedPayload {
    data: Vec<u8>,
    num_updates: u64,
}

impl PayloadBuffer {
    pub fn new(payload_size: usize) -> PayloadBuffer {
        PayloadBuffer {
            payload_size,
            send: RwLock::new(vec![0; payload_size]),
            received: RwLock::new(ReceivedPayload {
                data: vec![0; payload_size],
                num_updates: 0,
            }),
        }
    }

    pub fn payload_size(&self) -> usize {
        self.payload_size
    }

    /// NB: The size is not checked here - a payload of the wrong size is rejected by the
    ///  sender, which records it in its error state
    pub async fn set_send_raw(&self, payload: Vec<u8>) {
        *self.send.write().await = payload;
    }

    pub async fn set_send<T: PayloadCodec>(&self, value: &T) {
        self.set_send_raw(value.encode()).await;
    }

    pub async fn received_raw(&self) -> Vec<u8> {
        self.received.read().await.data.clone()
    }

    pub async fn received<T: PayloadCodec>(&self) -> T {
        T::decode(&self.received.read().await.data)
    }

    /// number of times the received payload was replaced, including watchdog resets
    pub async fn num_received_updates(&self) -> u64 {
        self.received.read().await.num_updates
    }
}

#[async_trait]
impl PayloadProvider for PayloadBuffer {
    async fn next_payload(&self) -> anyhow::Result<Vec<u8>> {
        Ok(self.send.read().await.clone())
    }
}

#[async_trait]
impl PayloadHandler for PayloadBuffer {
    async fn on_payload(&self, payload: &[u8]) -> anyhow::Result<()> {
        trace!("storing received payload of {} bytes", payload.len());

        let mut received = self.received.write().await;
        received.data.clear();
        received.data.extend_from_slice(payload);
        received.num_updates += 1;
        Ok(())
    }
}
