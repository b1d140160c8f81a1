//! # In-Memory Engine
//!
//! Reference implementation of the store contract. State lives in a shared
//! map per store name, so reconnecting to the same name sees earlier writes.
//!
//! List instances hold local working copies with dirty flags: title and item
//! edits stay on the instance until `save`, while item insertion and removal
//! write through immediately. Encryption is modeled at the gate only: a
//! passphrase controls access and the export header, not the byte layout;
//! real at-rest encryption belongs to a real backing store.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context as _, anyhow, bail};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

use crate::{Engine, ItemView, List, Result, Store};

/// Header of an unencrypted store image, same width as SQLite's magic.
pub const MAGIC: &[u8; 16] = b"listdb format 1\0";
/// Header of an encrypted store image.
const ENCRYPTED_MAGIC: &[u8; 16] = b"listdb encrypt \0";

fn now_unix() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ListRow {
    id: u32,
    title: String,
    created_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ItemRow {
    id: u32,
    list_id: u32,
    description: String,
    is_completed: bool,
    created_at: i64,
}

/// The serialized form of the whole store, behind the image header.
#[derive(Debug, Serialize, Deserialize)]
struct StoreImage {
    lists: BTreeMap<u32, ListRow>,
    items: BTreeMap<u32, ItemRow>,
}

struct StoreState {
    passphrase: Option<String>,
    /// True until the first successful connect; a passphrase given to a
    /// fresh store sets its key instead of failing.
    fresh: bool,
    next_list_id: u32,
    next_item_id: u32,
    lists: BTreeMap<u32, ListRow>,
    items: BTreeMap<u32, ItemRow>,
}

impl StoreState {
    fn new() -> Self {
        Self {
            passphrase: None,
            fresh: true,
            next_list_id: 1,
            next_item_id: 1,
            lists: BTreeMap::new(),
            items: BTreeMap::new(),
        }
    }

    fn image_bytes(&self) -> Result<Vec<u8>> {
        let image = StoreImage {
            lists: self.lists.clone(),
            items: self.items.clone(),
        };
        let header = if self.passphrase.is_some() {
            ENCRYPTED_MAGIC
        } else {
            MAGIC
        };
        let mut bytes = header.to_vec();
        let body = serde_json::to_vec(&image).context("serializing store image")?;
        bytes.extend_from_slice(&body);
        Ok(bytes)
    }
}

type Shared = Arc<Mutex<StoreState>>;

/// Opens in-memory stores by name.
#[derive(Default)]
pub struct MemoryEngine {
    stores: Mutex<HashMap<String, Shared>>,
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Engine for MemoryEngine {
    async fn connect(&self, name: &str, passphrase: Option<&str>) -> Result<Box<dyn Store>> {
        let shared = {
            let mut stores = self.stores.lock().await;
            stores
                .entry(name.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(StoreState::new())))
                .clone()
        };

        {
            let mut state = shared.lock().await;
            match (&state.passphrase, passphrase) {
                (Some(_), None) => {
                    bail!("store is encrypted but no key was provided when connecting")
                }
                (Some(stored), Some(given)) if stored != given => {
                    return Err(anyhow!("probe query failed; check the encryption key")
                        .context("decrypting store during connect"));
                }
                (Some(_), Some(_)) | (None, None) => {}
                (None, Some(given)) => {
                    if state.fresh {
                        // setting the key on a brand-new store
                        state.passphrase = Some(given.to_string());
                    } else {
                        bail!("store is not encrypted but a key was provided when connecting");
                    }
                }
            }
            state.fresh = false;
        }

        debug!(store = name, "connected to in-memory store");
        Ok(Box::new(MemoryStore { shared }))
    }
}

struct MemoryStore {
    shared: Shared,
}

#[async_trait]
impl Store for MemoryStore {
    async fn list_all(&self) -> Result<Vec<(u32, String)>> {
        let state = self.shared.lock().await;
        let out: Vec<(u32, String)> = state
            .lists
            .values()
            .map(|row| (row.id, row.title.clone()))
            .collect();
        debug!(count = out.len(), "enumerated todo lists");
        Ok(out)
    }

    async fn create_list(&self, title: String) -> Result<Box<dyn List>> {
        let mut state = self.shared.lock().await;
        let id = state.next_list_id;
        state.next_list_id += 1;
        let created_at = now_unix();
        state.lists.insert(
            id,
            ListRow {
                id,
                title: title.clone(),
                created_at,
            },
        );

        debug!(list_id = id, "created todo list");
        Ok(Box::new(MemoryList {
            shared: self.shared.clone(),
            id,
            title,
            created_at,
            items: BTreeMap::new(),
            dirty: false,
        }))
    }

    async fn load_list(&self, list_id: u32) -> Result<Box<dyn List>> {
        let state = self.shared.lock().await;
        let row = state
            .lists
            .get(&list_id)
            .cloned()
            .ok_or_else(|| anyhow!("no such list: {}", list_id))
            .context("loading todo list")?;

        let items: BTreeMap<u32, LocalItem> = state
            .items
            .values()
            .filter(|item| item.list_id == list_id)
            .map(|item| {
                (
                    item.id,
                    LocalItem {
                        row: item.clone(),
                        dirty: false,
                    },
                )
            })
            .collect();

        debug!(list_id, count = items.len(), "loaded todo list");
        Ok(Box::new(MemoryList {
            shared: self.shared.clone(),
            id: row.id,
            title: row.title,
            created_at: row.created_at,
            items,
            dirty: false,
        }))
    }

    async fn delete_list(&self, list_id: u32) -> Result<bool> {
        let mut state = self.shared.lock().await;
        let was_present = state.lists.remove(&list_id).is_some();
        // cascade, matching ON DELETE CASCADE in a relational schema
        state.items.retain(|_, item| item.list_id != list_id);
        debug!(list_id, was_present, "deleted todo list");
        Ok(was_present)
    }

    async fn export(&self) -> Result<Vec<u8>> {
        let state = self.shared.lock().await;
        state.image_bytes().context("exporting store image")
    }

    async fn is_encrypted(&self) -> Result<bool> {
        let state = self.shared.lock().await;
        let bytes = state.image_bytes().context("exporting image to check header")?;
        Ok(!bytes.starts_with(MAGIC))
    }

    async fn set_key(&self, passphrase: &str) -> Result<()> {
        let mut state = self.shared.lock().await;
        state.passphrase = if passphrase.is_empty() {
            None
        } else {
            Some(passphrase.to_string())
        };
        debug!(encrypted = state.passphrase.is_some(), "rekeyed store");
        Ok(())
    }
}

struct LocalItem {
    row: ItemRow,
    dirty: bool,
}

struct MemoryList {
    shared: Shared,
    id: u32,
    title: String,
    created_at: i64,
    items: BTreeMap<u32, LocalItem>,
    dirty: bool,
}

struct RowView<'a>(&'a ItemRow);

impl ItemView for RowView<'_> {
    fn id(&self) -> u32 {
        self.0.id
    }

    fn list_id(&self) -> u32 {
        self.0.list_id
    }

    fn description(&self) -> &str {
        &self.0.description
    }

    fn is_completed(&self) -> bool {
        self.0.is_completed
    }

    fn created_at(&self) -> i64 {
        self.0.created_at
    }
}

#[async_trait]
impl List for MemoryList {
    fn id(&self) -> u32 {
        self.id
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn created_at(&self) -> i64 {
        self.created_at
    }

    fn set_title(&mut self, title: String) {
        self.dirty |= title != self.title;
        self.title = title;
    }

    fn item_ids(&self) -> Vec<u32> {
        self.items.keys().copied().collect()
    }

    fn item(&self, item_id: u32) -> Option<Box<dyn ItemView + '_>> {
        self.items
            .get(&item_id)
            .map(|item| Box::new(RowView(&item.row)) as Box<dyn ItemView + '_>)
    }

    async fn add_item(&mut self, description: String) -> Result<u32> {
        let mut state = self.shared.lock().await;
        let item_id = state.next_item_id;
        state.next_item_id += 1;
        let row = ItemRow {
            id: item_id,
            list_id: self.id,
            description,
            is_completed: false,
            created_at: now_unix(),
        };
        state.items.insert(item_id, row.clone());

        let ejected = self.items.insert(item_id, LocalItem { row, dirty: false });
        debug_assert!(ejected.is_none(), "a fresh item id must not collide");

        debug!(item_id, list_id = self.id, "added item to list");
        Ok(item_id)
    }

    async fn remove_item(&mut self, item_id: u32) -> Result<bool> {
        let mut state = self.shared.lock().await;
        let in_store = matches!(state.items.get(&item_id), Some(row) if row.list_id == self.id);
        if in_store {
            state.items.remove(&item_id);
        }
        let in_memory = self.items.remove(&item_id).is_some();
        debug_assert_eq!(in_store, in_memory, "store and instance must agree");

        debug!(item_id, list_id = self.id, was_present = in_store, "removed item from list");
        Ok(in_store)
    }

    fn set_item_description(&mut self, item_id: u32, description: String) -> Result<()> {
        let item = self
            .items
            .get_mut(&item_id)
            .ok_or_else(|| anyhow!("no such item: {}", item_id))
            .context("setting item description")?;
        item.dirty |= description != item.row.description;
        item.row.description = description;
        Ok(())
    }

    fn set_item_completed(&mut self, item_id: u32, is_completed: bool) -> Result<()> {
        let item = self
            .items
            .get_mut(&item_id)
            .ok_or_else(|| anyhow!("no such item: {}", item_id))
            .context("setting item completion")?;
        item.dirty |= is_completed != item.row.is_completed;
        item.row.is_completed = is_completed;
        Ok(())
    }

    async fn save(&mut self) -> Result<()> {
        let mut state = self.shared.lock().await;

        if self.dirty {
            match state.lists.get_mut(&self.id) {
                Some(row) => row.title = self.title.clone(),
                None => bail!("list {} vanished from the store during save", self.id),
            }
            self.dirty = false;
            debug!(list_id = self.id, "saved list title");
        }

        for item in self.items.values_mut() {
            if !item.dirty {
                continue;
            }
            match state.items.get_mut(&item.row.id) {
                Some(row) => *row = item.row.clone(),
                None => bail!("item {} vanished from the store during save", item.row.id),
            }
            item.dirty = false;
            debug!(item_id = item.row.id, list_id = self.id, "saved item");
        }

        Ok(())
    }
}
