//! # Operation Registry
//!
//! The fixed set of operation names plus the typed parameter and result
//! payloads for each. The worker dispatcher and the controller facade both
//! speak through this module; an operation name outside [`ALL`] is a protocol
//! error, never forwarded to the native store.
//!
//! The registry mirrors the native module surface: connect, enumerate, create
//! and load lists, mutate items, persist, free instances, manage encryption,
//! and export the raw backing store.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::frame::Handle;
use crate::snapshot::ListSnapshot;

/// Distinguished initialization operation; must be sent first, exactly once.
pub const INIT: &str = "init";
pub const LIST_ALL: &str = "list_all";
pub const CREATE_LIST: &str = "create_list";
pub const LOAD_LIST: &str = "load_list";
pub const SAVE_LIST: &str = "save_list";
pub const DELETE_LIST: &str = "delete_list";
pub const FREE_LIST: &str = "free_list";
pub const SET_TITLE: &str = "set_title";
pub const ADD_ITEM: &str = "add_item";
pub const REMOVE_ITEM: &str = "remove_item";
pub const SET_ITEM_DESCRIPTION: &str = "set_item_description";
pub const SET_ITEM_COMPLETED: &str = "set_item_completed";
pub const EXPORT_DB: &str = "export_db";
pub const IS_ENCRYPTED: &str = "is_encrypted";
pub const SET_KEY: &str = "set_key";

/// Every operation the worker understands.
pub const ALL: &[&str] = &[
    INIT,
    LIST_ALL,
    CREATE_LIST,
    LOAD_LIST,
    SAVE_LIST,
    DELETE_LIST,
    FREE_LIST,
    SET_TITLE,
    ADD_ITEM,
    REMOVE_ITEM,
    SET_ITEM_DESCRIPTION,
    SET_ITEM_COMPLETED,
    EXPORT_DB,
    IS_ENCRYPTED,
    SET_KEY,
];

pub fn is_known(op: &str) -> bool {
    ALL.contains(&op)
}

// ============================================================================
//  PARAMETERS
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitParams {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passphrase: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateListParams {
    pub title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadListParams {
    pub list_id: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteListParams {
    pub list_id: u32,
}

/// Parameters for operations addressing a live instance: `save_list`,
/// `free_list`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HandleParams {
    pub handle: Handle,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetTitleParams {
    pub handle: Handle,
    pub title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddItemParams {
    pub handle: Handle,
    pub description: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RemoveItemParams {
    pub handle: Handle,
    pub item_id: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetItemDescriptionParams {
    pub handle: Handle,
    pub item_id: u32,
    pub description: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SetItemCompletedParams {
    pub handle: Handle,
    pub item_id: u32,
    pub is_completed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetKeyParams {
    pub passphrase: String,
}

// ============================================================================
//  RESULTS
// ============================================================================

/// Result of `create_list` / `load_list`: the only operations that hand a
/// fresh handle to the controller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListOpened {
    pub handle: Handle,
    pub snapshot: ListSnapshot,
}

/// Result of every state-affecting operation on an existing handle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListState {
    pub snapshot: ListSnapshot,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllLists {
    pub lists: BTreeMap<u32, String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ListDeleted {
    pub deleted: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ListFreed {
    pub freed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemAdded {
    pub item_id: u32,
    pub snapshot: ListSnapshot,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemRemoved {
    pub removed: bool,
    pub snapshot: ListSnapshot,
}

/// Raw bytes of the entire backing store, atomic as of the last completed
/// write. Used by the controller to offer a file download.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DbImage {
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EncryptionStatus {
    pub is_encrypted: bool,
}
