//! # Snapshot Values
//!
//! Fully materialized, serializable copies of worker-owned state at one point
//! in time. A snapshot contains no references back into worker memory: scalar
//! fields, an explicit ordered list of child ids, and a fully copied record
//! per child. Immutable once produced: a mutation returns a *new* snapshot
//! that replaces the old one wholesale, never a partial update.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One todo item, frozen at capture time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemSnapshot {
    pub id: u32,
    pub list_id: u32,
    pub description: String,
    pub is_completed: bool,
    /// Unix timestamp, seconds.
    pub created_at: i64,
}

/// A todo list and all of its items, frozen at capture time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListSnapshot {
    pub id: u32,
    pub title: String,
    /// Unix timestamp, seconds.
    pub created_at: i64,
    /// Item ids in the list's own order.
    pub item_ids: Vec<u32>,
    pub items: BTreeMap<u32, ItemSnapshot>,
}

impl ListSnapshot {
    /// Looks up an item by id.
    pub fn item(&self, item_id: u32) -> Option<&ItemSnapshot> {
        self.items.get(&item_id)
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }
}
