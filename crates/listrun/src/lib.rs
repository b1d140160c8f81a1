//! # Listrun
//!
//! The runtime on both sides of the boundary: a worker task that owns live
//! store instances behind a handle table, and a controller peer that drives
//! it through typed proxy facades over an asynchronous message channel.
//!
//! ## Architecture
//!
//! ```text
//! proxy (Database/TodoList) → peer → transport → worker → handle table / store
//!                                  ←           ←        ← snapshot / error chain
//! ```
//!
//! The worker executes one request to completion at a time; the controller
//! may have arbitrarily many outstanding, each an independent future resolved
//! by message-id correlation rather than arrival order.

pub mod handle;
pub mod peer;
pub mod proxy;
pub mod snapshot;
pub mod transport;
pub mod worker;
