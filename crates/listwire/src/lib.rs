//! # Listwire
//!
//! The wire protocol spoken between a controller and the worker that owns its
//! todo-list store instances. The two sides share no memory; everything that
//! crosses the boundary is plain serializable data, opaque integer handles, or
//! an ordered chain of error messages.
//!
//! ## Architecture
//!
//! - [`frame`]: the request/response envelope and the correlation ids that
//!   pair them up.
//! - [`op`]: the registry of operation names and their typed payloads.
//! - [`snapshot`]: fully materialized copies of worker-owned list state.
//! - [`chain`]: the error codec that flattens nested failures into a
//!   transmissible cause chain and rebuilds them on the far side.
//!
//! This crate is pure data: no async, no transport, no handle bookkeeping.
//! The runtime lives in `listrun`.

pub mod chain;
pub mod error;
pub mod frame;
pub mod op;
pub mod snapshot;

pub use chain::{ErrorChain, ErrorNode, RemoteError};
pub use error::{Error, Result};
pub use frame::{Handle, MessageId, Request, Response};
pub use snapshot::{ItemSnapshot, ListSnapshot};

#[cfg(test)]
mod tests;
