//! # Proxy Facades
//!
//! Controller-side mirrors of the worker-owned objects. A [`Database`] is a
//! connected store; a [`TodoList`] is one live list instance, addressed by
//! handle and read through a locally cached snapshot.
//!
//! ## Philosophy
//!
//! - **Reads are free, writes are remote**: every accessor reads the cached
//!   snapshot synchronously; every mutator crosses the boundary, and replaces
//!   the whole snapshot from the response.
//! - **Failure leaves the cache alone**: a failed mutation keeps the previous
//!   snapshot, which still describes real worker state.
//!
//! ## Invariants
//!
//! - The snapshot is replaced wholesale, never patched field by field.
//! - Handle release is explicit: a [`TodoList`] dropped without [`TodoList::free`]
//!   leaks its worker-side instance for the life of the worker.

use std::collections::BTreeMap;

use listwire::{Handle, ItemSnapshot, ListSnapshot, op};

use crate::peer::{Peer, Result};

/// The connected store, as seen from the controller.
pub struct Database {
    peer: Peer,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").finish_non_exhaustive()
    }
}

impl Database {
    /// Connects to an unencrypted store, initializing the worker.
    pub async fn connect(peer: Peer, name: impl Into<String>) -> Result<Self> {
        Self::init(peer, name.into(), None).await
    }

    /// Connects with a passphrase: decrypts an encrypted store, or arms
    /// encryption on a fresh one.
    pub async fn connect_with_key(
        peer: Peer,
        name: impl Into<String>,
        passphrase: impl Into<String>,
    ) -> Result<Self> {
        Self::init(peer, name.into(), Some(passphrase.into())).await
    }

    async fn init(peer: Peer, name: String, passphrase: Option<String>) -> Result<Self> {
        peer.call(op::INIT, op::InitParams { name, passphrase })
            .await?;
        Ok(Self { peer })
    }

    /// Enumerates every stored list as `id → title`.
    pub async fn list_all(&self) -> Result<BTreeMap<u32, String>> {
        let result: op::AllLists = self.peer.call_typed(op::LIST_ALL, ()).await?;
        Ok(result.lists)
    }

    /// Creates and persists a new empty list, returning a live proxy for it.
    pub async fn create_list(&self, title: impl Into<String>) -> Result<TodoList> {
        let result: op::ListOpened = self
            .peer
            .call_typed(
                op::CREATE_LIST,
                op::CreateListParams {
                    title: title.into(),
                },
            )
            .await?;
        Ok(TodoList::attach(self.peer.clone(), result))
    }

    /// Loads a stored list into a fresh worker instance.
    ///
    /// Each call produces an independent handle, even for the same list id.
    pub async fn load_list(&self, list_id: u32) -> Result<TodoList> {
        let result: op::ListOpened = self
            .peer
            .call_typed(op::LOAD_LIST, op::LoadListParams { list_id })
            .await?;
        Ok(TodoList::attach(self.peer.clone(), result))
    }

    /// Deletes a list and its items from the store. Returns whether anything
    /// was deleted. Live handles onto the deleted list are not revoked; their
    /// next save fails instead.
    pub async fn delete_list(&self, list_id: u32) -> Result<bool> {
        let result: op::ListDeleted = self
            .peer
            .call_typed(op::DELETE_LIST, op::DeleteListParams { list_id })
            .await?;
        Ok(result.deleted)
    }

    /// The raw bytes of the whole backing store, for download or backup.
    pub async fn export(&self) -> Result<Vec<u8>> {
        let result: op::DbImage = self.peer.call_typed(op::EXPORT_DB, ()).await?;
        Ok(result.bytes)
    }

    /// Whether the backing store is currently encrypted at rest.
    pub async fn is_encrypted(&self) -> Result<bool> {
        let result: op::EncryptionStatus = self.peer.call_typed(op::IS_ENCRYPTED, ()).await?;
        Ok(result.is_encrypted)
    }

    /// Rekeys the store. An empty passphrase decrypts it.
    pub async fn set_key(&self, passphrase: impl Into<String>) -> Result<()> {
        self.peer
            .call(
                op::SET_KEY,
                op::SetKeyParams {
                    passphrase: passphrase.into(),
                },
            )
            .await?;
        Ok(())
    }

    /// The underlying peer, for driving further proxies over the same
    /// channel.
    pub fn peer(&self) -> &Peer {
        &self.peer
    }
}

/// One live list instance, mirrored locally.
pub struct TodoList {
    peer: Peer,
    handle: Handle,
    snapshot: ListSnapshot,
}

impl TodoList {
    fn attach(peer: Peer, opened: op::ListOpened) -> Self {
        Self {
            peer,
            handle: opened.handle,
            snapshot: opened.snapshot,
        }
    }

    // ===== SNAPSHOT READS (synchronous, no boundary crossing) =====

    pub fn id(&self) -> u32 {
        self.snapshot.id
    }

    pub fn title(&self) -> &str {
        &self.snapshot.title
    }

    pub fn created_at(&self) -> i64 {
        self.snapshot.created_at
    }

    /// Item ids in the worker's iteration order.
    pub fn item_ids(&self) -> &[u32] {
        &self.snapshot.item_ids
    }

    pub fn item(&self, item_id: u32) -> Option<&ItemSnapshot> {
        self.snapshot.item(item_id)
    }

    pub fn snapshot(&self) -> &ListSnapshot {
        &self.snapshot
    }

    pub fn handle(&self) -> Handle {
        self.handle
    }

    // ===== MUTATIONS (cross the boundary, refresh the snapshot) =====

    /// Renames the list on the worker instance; persisted on the next save.
    pub async fn set_title(&mut self, title: impl Into<String>) -> Result<()> {
        let result: op::ListState = self
            .peer
            .call_typed(
                op::SET_TITLE,
                op::SetTitleParams {
                    handle: self.handle,
                    title: title.into(),
                },
            )
            .await?;
        self.snapshot = result.snapshot;
        Ok(())
    }

    /// Adds and immediately persists a new item, returning its id.
    pub async fn add_item(&mut self, description: impl Into<String>) -> Result<u32> {
        let result: op::ItemAdded = self
            .peer
            .call_typed(
                op::ADD_ITEM,
                op::AddItemParams {
                    handle: self.handle,
                    description: description.into(),
                },
            )
            .await?;
        self.snapshot = result.snapshot;
        Ok(result.item_id)
    }

    /// Removes an item from the list and the store. Returns whether the item
    /// belonged to this list.
    pub async fn remove_item(&mut self, item_id: u32) -> Result<bool> {
        let result: op::ItemRemoved = self
            .peer
            .call_typed(
                op::REMOVE_ITEM,
                op::RemoveItemParams {
                    handle: self.handle,
                    item_id,
                },
            )
            .await?;
        self.snapshot = result.snapshot;
        Ok(result.removed)
    }

    /// Edits an item's text on the worker instance; persisted on the next
    /// save.
    pub async fn set_item_description(
        &mut self,
        item_id: u32,
        description: impl Into<String>,
    ) -> Result<()> {
        let result: op::ListState = self
            .peer
            .call_typed(
                op::SET_ITEM_DESCRIPTION,
                op::SetItemDescriptionParams {
                    handle: self.handle,
                    item_id,
                    description: description.into(),
                },
            )
            .await?;
        self.snapshot = result.snapshot;
        Ok(())
    }

    /// Toggles an item's completion on the worker instance; persisted on the
    /// next save.
    pub async fn set_item_completed(&mut self, item_id: u32, is_completed: bool) -> Result<()> {
        let result: op::ListState = self
            .peer
            .call_typed(
                op::SET_ITEM_COMPLETED,
                op::SetItemCompletedParams {
                    handle: self.handle,
                    item_id,
                    is_completed,
                },
            )
            .await?;
        self.snapshot = result.snapshot;
        Ok(())
    }

    /// Persists every unsaved edit on this instance.
    pub async fn save(&mut self) -> Result<()> {
        let result: op::ListState = self
            .peer
            .call_typed(
                op::SAVE_LIST,
                op::HandleParams {
                    handle: self.handle,
                },
            )
            .await?;
        self.snapshot = result.snapshot;
        Ok(())
    }

    /// Releases the worker-side instance. Unsaved edits are discarded.
    ///
    /// Consumes the proxy; the handle is dead afterwards whatever the worker
    /// answers. Returns whether the handle was still live.
    pub async fn free(self) -> Result<bool> {
        let result: op::ListFreed = self
            .peer
            .call_typed(
                op::FREE_LIST,
                op::HandleParams {
                    handle: self.handle,
                },
            )
            .await?;
        Ok(result.freed)
    }
}
