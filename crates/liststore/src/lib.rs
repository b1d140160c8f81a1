//! # Liststore
//!
//! The native-module contract: the fixed set of operations a backing store
//! exposes to the worker dispatcher, expressed as object-safe async traits.
//! The dispatcher treats implementations as opaque capabilities and never
//! reaches around them into storage.
//!
//! ## Philosophy
//!
//! - **Plain data at the seam**: every argument and return value is plain
//!   serializable data or an owned instance; nothing borrows store internals.
//! - **Failures carry their causes**: operations fail with `anyhow` errors
//!   whose context chains survive conversion into a wire error chain.
//!
//! The [`memory`] module provides the in-memory reference engine used by
//! tests and demos.

pub mod memory;

pub use memory::MemoryEngine;

use async_trait::async_trait;

/// Store operations fail with full context chains.
pub type Result<T> = anyhow::Result<T>;

/// Opens stores by name. The entry point of the native module.
#[async_trait]
pub trait Engine: Send + Sync {
    /// Connects to the named store, creating it if absent.
    ///
    /// Opening an encrypted store requires its passphrase; opening an
    /// unencrypted store with a passphrase is an error, as is a wrong
    /// passphrase. A passphrase supplied for a brand-new store encrypts it.
    async fn connect(&self, name: &str, passphrase: Option<&str>) -> Result<Box<dyn Store>>;
}

/// A connected backing store holding todo lists.
#[async_trait]
pub trait Store: Send + Sync {
    /// Ids and titles of every list in the store.
    async fn list_all(&self) -> Result<Vec<(u32, String)>>;

    /// Creates a list and returns the live instance.
    async fn create_list(&self, title: String) -> Result<Box<dyn List>>;

    /// Loads an existing list with all of its items.
    async fn load_list(&self, list_id: u32) -> Result<Box<dyn List>>;

    /// Deletes a list and its items. Returns whether it existed.
    async fn delete_list(&self, list_id: u32) -> Result<bool>;

    /// The raw bytes of the entire backing store, consistent with the last
    /// completed write.
    async fn export(&self) -> Result<Vec<u8>>;

    async fn is_encrypted(&self) -> Result<bool>;

    /// Sets, changes, or (with an empty passphrase) removes the store key.
    async fn set_key(&self, passphrase: &str) -> Result<()>;
}

impl std::fmt::Debug for dyn Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("dyn Store")
    }
}

impl std::fmt::Debug for dyn List {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("dyn List")
    }
}

/// A live todo-list instance owned by the worker.
///
/// Scalar accessors and item reads are synchronous; anything that touches the
/// backing store is async. Edits to title, item description, and completion
/// are held on the instance until [`List::save`].
#[async_trait]
pub trait List: Send + Sync {
    fn id(&self) -> u32;
    fn title(&self) -> &str;
    /// Unix timestamp, seconds.
    fn created_at(&self) -> i64;

    fn set_title(&mut self, title: String);

    /// Item ids in the list's own order.
    fn item_ids(&self) -> Vec<u32>;

    /// A transient read-only view of one item.
    ///
    /// The view borrows the instance; callers copy what they need and drop it
    /// immediately.
    fn item(&self, item_id: u32) -> Option<Box<dyn ItemView + '_>>;

    /// Inserts a new, uncompleted item into the store. Returns its id.
    async fn add_item(&mut self, description: String) -> Result<u32>;

    /// Removes an item from the list and the store. Returns whether it
    /// existed.
    async fn remove_item(&mut self, item_id: u32) -> Result<bool>;

    fn set_item_description(&mut self, item_id: u32, description: String) -> Result<()>;

    fn set_item_completed(&mut self, item_id: u32, is_completed: bool) -> Result<()>;

    /// Persists this list and any dirty items, skipping clean writes.
    async fn save(&mut self) -> Result<()>;
}

/// Read-only view of one item, valid only while borrowed from its list.
pub trait ItemView {
    fn id(&self) -> u32;
    fn list_id(&self) -> u32;
    fn description(&self) -> &str;
    fn is_completed(&self) -> bool;
    /// Unix timestamp, seconds.
    fn created_at(&self) -> i64;
}
