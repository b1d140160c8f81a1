//! # Transport Abstraction
//!
//! A minimal, async interface for moving bytes between the controller and the
//! worker.
//!
//! ## Philosophy
//!
//! - **Byte-Oriented**: the transport knows nothing about frames, operations,
//!   or snapshots. It moves opaque buffers.
//! - **Ordered and reliable**: sends arrive in order or the transport errors;
//!   correlation above this layer handles everything else.

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::sync::mpsc;

/// Errors that occur at the channel/transport layer.
#[derive(Debug, Clone)]
pub enum Error {
    /// The peer is unreachable or the channel was dropped.
    ConnectionLost(String),
    /// Generic I/O error or internal transport failure.
    Io(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ConnectionLost(msg) => write!(f, "connection lost: {}", msg),
            Self::Io(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;

/// A mechanism to send byte buffers to a peer and receive theirs.
///
/// Object-safe (`Arc<dyn Transport>`). `recv` returning `Ok(None)` means the
/// peer closed the channel cleanly.
#[async_trait::async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn send(&self, payload: &[u8]) -> Result<()>;

    async fn recv(&self) -> Result<Option<Vec<u8>>>;
}

/// A duplex in-process channel built on tokio mpsc.
///
/// The stand-in for a postMessage-style channel: ordered, reliable, and
/// structurally opaque to both ends. Messages sent on one half appear on the
/// other half's `recv` and vice versa.
pub struct ChannelTransport {
    tx: mpsc::UnboundedSender<Vec<u8>>,
    rx: Arc<Mutex<mpsc::UnboundedReceiver<Vec<u8>>>>,
}

impl ChannelTransport {
    /// Creates a transport from separate tx and rx channels.
    pub fn new(tx: mpsc::UnboundedSender<Vec<u8>>, rx: mpsc::UnboundedReceiver<Vec<u8>>) -> Self {
        Self {
            tx,
            rx: Arc::new(Mutex::new(rx)),
        }
    }

    /// Creates a connected pair: one half for the controller, one for the
    /// worker.
    pub fn pair() -> (Self, Self) {
        let (tx_a, rx_a) = mpsc::unbounded_channel();
        let (tx_b, rx_b) = mpsc::unbounded_channel();

        let a = Self::new(tx_a, rx_b);
        let b = Self::new(tx_b, rx_a);

        (a, b)
    }
}

#[async_trait::async_trait]
impl Transport for ChannelTransport {
    async fn send(&self, payload: &[u8]) -> Result<()> {
        self.tx
            .send(payload.to_vec())
            .map_err(|_| Error::ConnectionLost("channel closed".into()))
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>> {
        let mut rx = self.rx.lock().await;
        Ok(rx.recv().await)
    }
}
