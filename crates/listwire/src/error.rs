//! # Error Definitions
//!
//! Failures of the wire layer itself. These are distinct from [`crate::chain`]:
//! an `Error` here means a frame could not be built or understood, whereas an
//! `ErrorChain` carries a *remote* failure that was transmitted successfully.

/// Operational failures within the wire protocol itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A frame or payload could not be serialized.
    Serialization(String),
    /// The bytes on the wire did not decode into a frame.
    MalformedFrame(String),
    /// A known operation's payload did not match its schema.
    PayloadMismatch { op: String, details: String },
}

impl Error {
    /// Wraps a serde failure while decoding the payload of a known operation.
    pub fn payload_mismatch(op: impl Into<String>, err: serde_json::Error) -> Self {
        Self::PayloadMismatch {
            op: op.into(),
            details: err.to_string(),
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Serialization(msg) => write!(f, "serialization failed: {}", msg),
            Self::MalformedFrame(msg) => write!(f, "malformed frame: {}", msg),
            Self::PayloadMismatch { op, details } => {
                write!(f, "invalid payload for {}: {}", op, details)
            }
        }
    }
}

impl std::error::Error for Error {}

/// A specialized Result type for wire operations.
pub type Result<T> = std::result::Result<T, Error>;
