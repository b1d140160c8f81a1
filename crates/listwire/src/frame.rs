//! # Protocol Frames
//!
//! Defines the envelope of the RPC protocol (Request vs Response) and the two
//! identifier types that cross the boundary.
//!
//! ## Invariants
//!
//! - Decoding never panics on unknown data; every path returns `Result`.
//! - A `Response` carries exactly one of `payload` / `error`, discriminated by
//!   `success`.
//! - The envelope decodes independently of the payload, so an unrecognized
//!   operation can still be answered with a failure for the right id.

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::chain::{ErrorChain, RemoteError};
use crate::error::{Error, Result};

/// Correlation id for one outstanding request.
///
/// Unique per request, meaningless once its response has arrived. Minted as a
/// UUID so that ids stay unique across controller restarts: a stale response
/// from a previous incarnation can never be mistaken for a live one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
    /// Mints a fresh id.
    pub fn mint() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque integer naming a worker-owned instance.
///
/// The controller holds only this number, never the instance. Handles are
/// allocated by the worker's handle table starting at 1 and are never reused,
/// so a stale handle always fails rather than aliasing a newer instance.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(transparent)]
pub struct Handle(u64);

impl Handle {
    pub fn value(self) -> u64 {
        self.0
    }
}

impl From<u64> for Handle {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for Handle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An operation request sent controller → worker.
///
/// `op` selects the operation (serialized as `type` on the wire); `payload` is
/// operation-specific structured data which may itself contain [`Handle`]s.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Request {
    pub id: MessageId,
    #[serde(rename = "type")]
    pub op: String,
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl Request {
    /// Builds a request with a freshly minted id.
    pub fn new(op: impl Into<String>, params: impl Serialize) -> Result<Self> {
        let payload = serde_json::to_value(params).map_err(|e| Error::Serialization(e.to_string()))?;
        Ok(Self {
            id: MessageId::mint(),
            op: op.into(),
            payload,
        })
    }

    /// Serializes this request for the transport.
    pub fn encode(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Decodes a request envelope from raw transport bytes.
    ///
    /// Only the envelope is validated here; the payload stays opaque until the
    /// operation is recognized and [`Request::params`] is called.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| Error::MalformedFrame(e.to_string()))
    }

    /// Decodes the payload against a known operation's parameter schema.
    pub fn params<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(self.payload.clone()).map_err(|e| Error::payload_mismatch(&self.op, e))
    }
}

/// An operation response sent worker → controller.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Response {
    pub id: MessageId,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorChain>,
}

impl Response {
    /// Builds a success response.
    pub fn ok(id: MessageId, payload: serde_json::Value) -> Self {
        Self {
            id,
            success: true,
            payload: Some(payload),
            error: None,
        }
    }

    /// Builds a failure response.
    pub fn fail(id: MessageId, error: ErrorChain) -> Self {
        Self {
            id,
            success: false,
            payload: None,
            error: Some(error),
        }
    }

    /// Serializes this response for the transport.
    pub fn encode(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Decodes a response from raw transport bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| Error::MalformedFrame(e.to_string()))
    }

    /// Splits the response into the value the caller awaited.
    ///
    /// A failure response missing its chain still yields a one-node error
    /// rather than panicking; a success response missing its payload yields
    /// `null`.
    pub fn into_result(self) -> std::result::Result<serde_json::Value, RemoteError> {
        if self.success {
            Ok(self.payload.unwrap_or(serde_json::Value::Null))
        } else {
            let chain = self
                .error
                .unwrap_or_else(|| ErrorChain::leaf("worker reported failure without an error chain"));
            Err(RemoteError::new(chain))
        }
    }
}
