//! # Peer
//!
//! The controller-side correlation layer: sends requests tagged with fresh
//! message ids, parks each caller on a oneshot, and routes every incoming
//! response to the caller that owns its id.
//!
//! ## Philosophy
//!
//! - **Order-free**: any number of requests may be outstanding; responses
//!   resolve by id, never by arrival order.
//! - **Crash-proof pump**: a malformed or unknown-id response is logged and
//!   dropped. Nothing the worker sends can kill the correlation task.
//!
//! ## Invariants
//!
//! - Every pending entry is removed exactly once: by its response, by timeout,
//!   by send failure, or by channel shutdown.
//! - When the channel dies, all parked callers fail immediately rather than
//!   hanging forever.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use listwire::{MessageId, RemoteError, Request, Response};

use crate::transport::{self, Transport};

/// How long a caller waits on one request before giving up.
const CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors surfaced to a caller awaiting a response.
#[derive(Debug, Clone)]
pub enum Error {
    /// The transport failed while sending or pumping.
    Transport(transport::Error),
    /// A frame could not be encoded or decoded.
    Wire(String),
    /// The worker answered with a failure; the full cause chain is inside.
    Remote(RemoteError),
    /// No response arrived within [`CALL_TIMEOUT`].
    Timeout,
    /// The channel shut down while this request was outstanding.
    ChannelClosed,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transport(e) => write!(f, "transport error: {}", e),
            Self::Wire(msg) => write!(f, "wire error: {}", msg),
            Self::Remote(e) => write!(f, "remote error: {}", e),
            Self::Timeout => write!(f, "timed out waiting for response"),
            Self::ChannelClosed => write!(f, "channel closed while awaiting response"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Transport(e) => Some(e),
            Self::Remote(e) => Some(e),
            _ => None,
        }
    }
}

impl From<transport::Error> for Error {
    fn from(e: transport::Error) -> Self {
        Self::Transport(e)
    }
}

impl From<listwire::Error> for Error {
    fn from(e: listwire::Error) -> Self {
        Self::Wire(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

type Pending = DashMap<MessageId, oneshot::Sender<Result<serde_json::Value>>>;

/// One side of a request/response conversation.
///
/// Cheap to clone; all clones share the transport and the pending table, so a
/// single worker can serve many proxy objects concurrently.
#[derive(Clone)]
pub struct Peer {
    transport: Arc<dyn Transport>,
    pending: Arc<Pending>,
}

impl Peer {
    /// Wraps a transport and spawns the receive pump.
    ///
    /// The pump runs until the transport closes or errors, then fails every
    /// caller still parked.
    pub fn new(transport: Box<dyn Transport>) -> Self {
        let peer = Self {
            transport: Arc::from(transport),
            pending: Arc::new(DashMap::new()),
        };

        let pump = peer.clone();
        tokio::spawn(async move {
            pump.run().await;
        });

        peer
    }

    async fn run(&self) {
        loop {
            match self.transport.recv().await {
                Ok(Some(bytes)) => self.handle_frame(&bytes),
                Ok(None) => {
                    debug!("channel closed, peer pump stopping");
                    self.notify_all_pending(Error::ChannelClosed);
                    break;
                }
                Err(e) => {
                    warn!(error = %e, "transport failed, peer pump stopping");
                    self.notify_all_pending(Error::Transport(e));
                    break;
                }
            }
        }
    }

    /// Routes one incoming frame to its parked caller.
    fn handle_frame(&self, bytes: &[u8]) {
        let response = match Response::decode(bytes) {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "dropping undecodable response frame");
                return;
            }
        };

        let Some((_, tx)) = self.pending.remove(&response.id) else {
            warn!(id = %response.id, "dropping response with no pending request");
            return;
        };

        // The caller may have timed out and dropped its receiver; either way
        // the pending entry is already gone.
        let _ = tx.send(response.into_result().map_err(Error::Remote));
    }

    /// Fails every outstanding request with the given error.
    fn notify_all_pending(&self, error: Error) {
        let ids: Vec<MessageId> = self.pending.iter().map(|e| e.key().clone()).collect();
        for id in ids {
            if let Some((_, tx)) = self.pending.remove(&id) {
                let _ = tx.send(Err(error.clone()));
            }
        }
    }

    /// Sends one request and awaits its response payload.
    pub async fn call(&self, op: &str, params: impl Serialize) -> Result<serde_json::Value> {
        let request = Request::new(op, params)?;
        let bytes = request.encode()?;
        let id = request.id;

        let (tx, rx) = oneshot::channel();
        self.pending.insert(id.clone(), tx);

        if let Err(e) = self.transport.send(&bytes).await {
            self.pending.remove(&id);
            return Err(Error::Transport(e));
        }

        match tokio::time::timeout(CALL_TIMEOUT, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => {
                self.pending.remove(&id);
                Err(Error::ChannelClosed)
            }
            Err(_) => {
                self.pending.remove(&id);
                Err(Error::Timeout)
            }
        }
    }

    /// [`Peer::call`], decoding the payload into a typed result.
    pub async fn call_typed<T: DeserializeOwned>(
        &self,
        op: &str,
        params: impl Serialize,
    ) -> Result<T> {
        let payload = self.call(op, params).await?;
        serde_json::from_value(payload).map_err(|e| Error::Wire(e.to_string()))
    }

    /// The number of requests currently awaiting a response.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}
