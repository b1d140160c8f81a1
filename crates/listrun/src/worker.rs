//! # Worker Dispatcher
//!
//! The isolated-side router: receives a request, resolves handles, invokes
//! the corresponding native operation, updates the handle table, and produces
//! a response carrying a fresh snapshot or an error chain.
//!
//! ## Invariants
//!
//! - One request runs to completion before the next is read; native
//!   operations never interleave worker-side.
//! - Every operation except `init` fails fast with `NotInitialized` until the
//!   store is connected, without reaching the handle table.
//! - Handle validity and operation validity are checked before any native
//!   call, so those two failure classes cause no partial mutation.
//! - Every failure is caught at the single top-level handler and converted to
//!   a failure response; the worker task never dies from an operation error.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use listwire::{ErrorChain, Request, Response, op};
use liststore::{Engine, List, Store};

use crate::handle::{self, HandleTable};
use crate::snapshot;
use crate::transport::Transport;

/// Failures raised while dispatching one request.
#[derive(Debug)]
pub enum DispatchError {
    /// An operation other than `init` arrived before initialization.
    NotInitialized,
    /// A second `init` arrived; initialization happens once per worker.
    AlreadyInitialized,
    /// The request `type` is not in the operation registry.
    UnknownOperation(String),
    /// A known operation's payload did not match its schema.
    InvalidPayload(String),
    /// The referenced handle is absent from the table.
    InvalidHandle(handle::Error),
    /// The native operation itself failed; the full cause chain is preserved.
    Native(anyhow::Error),
}

impl std::fmt::Display for DispatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotInitialized => {
                write!(f, "not initialized: call init before any other operation")
            }
            Self::AlreadyInitialized => {
                write!(f, "already initialized: init is accepted once per worker")
            }
            Self::UnknownOperation(op) => write!(f, "unknown operation: {}", op),
            Self::InvalidPayload(msg) => f.write_str(msg),
            Self::InvalidHandle(e) => write!(f, "{}", e),
            Self::Native(e) => write!(f, "{}", e),
        }
    }
}

impl From<handle::Error> for DispatchError {
    fn from(e: handle::Error) -> Self {
        Self::InvalidHandle(e)
    }
}

impl From<anyhow::Error> for DispatchError {
    fn from(e: anyhow::Error) -> Self {
        Self::Native(e)
    }
}

impl DispatchError {
    /// Flattens this failure for the wire. Native failures keep their whole
    /// cause chain; protocol failures are single-node leaves.
    fn into_chain(self) -> ErrorChain {
        match self {
            Self::Native(e) => ErrorChain::from_anyhow(&e),
            other => ErrorChain::leaf(other.to_string()),
        }
    }
}

type DispatchResult = std::result::Result<serde_json::Value, DispatchError>;

fn encode<T: Serialize>(value: T) -> DispatchResult {
    serde_json::to_value(value).map_err(|e| {
        DispatchError::Native(anyhow::Error::new(e).context("serializing response payload"))
    })
}

fn params<T: DeserializeOwned>(request: &Request) -> std::result::Result<T, DispatchError> {
    request
        .params()
        .map_err(|e| DispatchError::InvalidPayload(e.to_string()))
}

/// The worker-side state: the engine, the connected store (after `init`), and
/// the table of live list instances.
pub struct Worker {
    engine: Box<dyn Engine>,
    store: Option<Box<dyn Store>>,
    lists: HandleTable<Box<dyn List>>,
}

impl Worker {
    pub fn new(engine: Box<dyn Engine>) -> Self {
        Self {
            engine,
            store: None,
            lists: HandleTable::new(),
        }
    }

    /// Spawns the worker loop over a transport.
    ///
    /// The task runs until the channel closes. Requests already received run
    /// to completion and produce a response even if the controller has
    /// stopped listening; there is no cancellation message in the protocol.
    pub fn spawn(engine: Box<dyn Engine>, transport: Box<dyn Transport>) -> JoinHandle<()> {
        let mut worker = Self::new(engine);
        let transport: Arc<dyn Transport> = Arc::from(transport);
        tokio::spawn(async move {
            worker.run(transport).await;
        })
    }

    /// Processes requests one at a time until the channel closes.
    pub async fn run(&mut self, transport: Arc<dyn Transport>) {
        loop {
            let bytes = match transport.recv().await {
                Ok(Some(bytes)) => bytes,
                Ok(None) => {
                    debug!("channel closed, worker stopping");
                    break;
                }
                Err(e) => {
                    warn!(error = %e, "transport failed, worker stopping");
                    break;
                }
            };

            // A frame that decodes to no envelope has no id to answer with.
            let request = match Request::decode(&bytes) {
                Ok(request) => request,
                Err(e) => {
                    warn!(error = %e, "dropping undecodable request frame");
                    continue;
                }
            };

            let response = self.handle_request(request).await;
            let bytes = match response.encode() {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!(error = %e, "dropping unencodable response");
                    continue;
                }
            };
            if let Err(e) = transport.send(&bytes).await {
                warn!(error = %e, "failed to send response, worker stopping");
                break;
            }
        }
    }

    /// Dispatches one request and converts any failure into a failure
    /// response for the same id.
    pub async fn handle_request(&mut self, request: Request) -> Response {
        let id = request.id.clone();
        debug!(id = %id, op = %request.op, "dispatching request");

        match self.dispatch(&request).await {
            Ok(payload) => Response::ok(id, payload),
            Err(err) => {
                debug!(id = %id, error = %err, "request failed");
                Response::fail(id, err.into_chain())
            }
        }
    }

    fn store(&self) -> std::result::Result<&dyn Store, DispatchError> {
        self.store.as_deref().ok_or(DispatchError::NotInitialized)
    }

    async fn dispatch(&mut self, request: &Request) -> DispatchResult {
        // init gate: nothing reaches the handle table or the store before
        // initialization
        if self.store.is_none() && request.op != op::INIT {
            return Err(DispatchError::NotInitialized);
        }

        match request.op.as_str() {
            op::INIT => {
                if self.store.is_some() {
                    return Err(DispatchError::AlreadyInitialized);
                }
                let p: op::InitParams = params(request)?;
                let store = self.engine.connect(&p.name, p.passphrase.as_deref()).await?;
                self.store = Some(store);
                encode(serde_json::json!({}))
            }

            op::LIST_ALL => {
                let lists = self.store()?.list_all().await?;
                let lists: BTreeMap<u32, String> = lists.into_iter().collect();
                encode(op::AllLists { lists })
            }

            op::CREATE_LIST => {
                let p: op::CreateListParams = params(request)?;
                let list = self.store()?.create_list(p.title).await?;
                let snapshot = snapshot::capture(list.as_ref());
                let handle = self.lists.allocate(list);
                encode(op::ListOpened { handle, snapshot })
            }

            op::LOAD_LIST => {
                let p: op::LoadListParams = params(request)?;
                let list = self.store()?.load_list(p.list_id).await?;
                let snapshot = snapshot::capture(list.as_ref());
                let handle = self.lists.allocate(list);
                encode(op::ListOpened { handle, snapshot })
            }

            op::SAVE_LIST => {
                let p: op::HandleParams = params(request)?;
                let list = self.lists.resolve_mut(p.handle)?;
                list.save().await?;
                encode(op::ListState {
                    snapshot: snapshot::capture(list.as_ref()),
                })
            }

            op::DELETE_LIST => {
                let p: op::DeleteListParams = params(request)?;
                let deleted = self.store()?.delete_list(p.list_id).await?;
                encode(op::ListDeleted { deleted })
            }

            op::FREE_LIST => {
                let p: op::HandleParams = params(request)?;
                let freed = self.lists.release(p.handle);
                encode(op::ListFreed { freed })
            }

            op::SET_TITLE => {
                let p: op::SetTitleParams = params(request)?;
                let list = self.lists.resolve_mut(p.handle)?;
                list.set_title(p.title);
                encode(op::ListState {
                    snapshot: snapshot::capture(list.as_ref()),
                })
            }

            op::ADD_ITEM => {
                let p: op::AddItemParams = params(request)?;
                let list = self.lists.resolve_mut(p.handle)?;
                let item_id = list.add_item(p.description).await?;
                encode(op::ItemAdded {
                    item_id,
                    snapshot: snapshot::capture(list.as_ref()),
                })
            }

            op::REMOVE_ITEM => {
                let p: op::RemoveItemParams = params(request)?;
                let list = self.lists.resolve_mut(p.handle)?;
                let removed = list.remove_item(p.item_id).await?;
                encode(op::ItemRemoved {
                    removed,
                    snapshot: snapshot::capture(list.as_ref()),
                })
            }

            op::SET_ITEM_DESCRIPTION => {
                let p: op::SetItemDescriptionParams = params(request)?;
                let list = self.lists.resolve_mut(p.handle)?;
                list.set_item_description(p.item_id, p.description)?;
                encode(op::ListState {
                    snapshot: snapshot::capture(list.as_ref()),
                })
            }

            op::SET_ITEM_COMPLETED => {
                let p: op::SetItemCompletedParams = params(request)?;
                let list = self.lists.resolve_mut(p.handle)?;
                list.set_item_completed(p.item_id, p.is_completed)?;
                encode(op::ListState {
                    snapshot: snapshot::capture(list.as_ref()),
                })
            }

            op::EXPORT_DB => {
                let bytes = self.store()?.export().await?;
                encode(op::DbImage { bytes })
            }

            op::IS_ENCRYPTED => {
                let is_encrypted = self.store()?.is_encrypted().await?;
                encode(op::EncryptionStatus { is_encrypted })
            }

            op::SET_KEY => {
                let p: op::SetKeyParams = params(request)?;
                self.store()?.set_key(&p.passphrase).await?;
                encode(serde_json::json!({}))
            }

            other => Err(DispatchError::UnknownOperation(other.to_string())),
        }
    }
}
