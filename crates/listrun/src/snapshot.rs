//! # Snapshot Codec
//!
//! Walks the full live object graph reachable from a list instance and
//! freezes it into plain data: the scalar fields, the ordered child id list,
//! and a fully copied record per child.
//!
//! ## Invariants
//!
//! - The output holds no references back into worker memory.
//! - Each transient child view is dropped immediately after its fields are
//!   copied, before the next child is read.

use std::collections::BTreeMap;

use listwire::{ItemSnapshot, ListSnapshot};
use liststore::List;

/// Freezes one instance's observable state.
///
/// The walk is synchronous and runs between native operations, so the result
/// reflects a single store state, never a torn read.
pub fn capture(list: &dyn List) -> ListSnapshot {
    let item_ids = list.item_ids();
    let mut items = BTreeMap::new();

    for &item_id in &item_ids {
        let Some(view) = list.item(item_id) else {
            continue;
        };
        items.insert(
            item_id,
            ItemSnapshot {
                id: view.id(),
                list_id: view.list_id(),
                description: view.description().to_owned(),
                is_completed: view.is_completed(),
                created_at: view.created_at(),
            },
        );
        // view dropped here: transient reads never outlive the walk
    }

    ListSnapshot {
        id: list.id(),
        title: list.title().to_owned(),
        created_at: list.created_at(),
        item_ids,
        items,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;
    use std::sync::atomic::{AtomicIsize, Ordering};

    use async_trait::async_trait;
    use liststore::ItemView;

    /// Stub list that counts live transient views.
    struct StubList {
        items: Vec<(u32, String, bool)>,
        live_views: Arc<AtomicIsize>,
    }

    struct CountingView {
        id: u32,
        description: String,
        is_completed: bool,
        live_views: Arc<AtomicIsize>,
    }

    impl Drop for CountingView {
        fn drop(&mut self) {
            self.live_views.fetch_sub(1, Ordering::SeqCst);
        }
    }

    impl ItemView for CountingView {
        fn id(&self) -> u32 {
            self.id
        }

        fn list_id(&self) -> u32 {
            3
        }

        fn description(&self) -> &str {
            &self.description
        }

        fn is_completed(&self) -> bool {
            self.is_completed
        }

        fn created_at(&self) -> i64 {
            1_700_000_000 + self.id as i64
        }
    }

    #[async_trait]
    impl List for StubList {
        fn id(&self) -> u32 {
            3
        }

        fn title(&self) -> &str {
            "chores"
        }

        fn created_at(&self) -> i64 {
            1_700_000_000
        }

        fn set_title(&mut self, _title: String) {}

        fn item_ids(&self) -> Vec<u32> {
            self.items.iter().map(|(id, _, _)| *id).collect()
        }

        fn item(&self, item_id: u32) -> Option<Box<dyn ItemView + '_>> {
            let (id, description, is_completed) =
                self.items.iter().find(|(id, _, _)| *id == item_id)?;
            self.live_views.fetch_add(1, Ordering::SeqCst);
            Some(Box::new(CountingView {
                id: *id,
                description: description.clone(),
                is_completed: *is_completed,
                live_views: self.live_views.clone(),
            }))
        }

        async fn add_item(&mut self, _description: String) -> liststore::Result<u32> {
            unimplemented!("stub")
        }

        async fn remove_item(&mut self, _item_id: u32) -> liststore::Result<bool> {
            unimplemented!("stub")
        }

        fn set_item_description(
            &mut self,
            _item_id: u32,
            _description: String,
        ) -> liststore::Result<()> {
            unimplemented!("stub")
        }

        fn set_item_completed(
            &mut self,
            _item_id: u32,
            _is_completed: bool,
        ) -> liststore::Result<()> {
            unimplemented!("stub")
        }

        async fn save(&mut self) -> liststore::Result<()> {
            unimplemented!("stub")
        }
    }

    fn stub() -> (StubList, Arc<AtomicIsize>) {
        let live_views = Arc::new(AtomicIsize::new(0));
        let list = StubList {
            items: vec![
                (7, "buy milk".into(), false),
                (9, "walk dog".into(), true),
            ],
            live_views: live_views.clone(),
        };
        (list, live_views)
    }

    #[test]
    fn test_capture_copies_every_field_in_order() {
        let (list, _) = stub();
        let snapshot = capture(&list);

        assert_eq!(snapshot.id, 3);
        assert_eq!(snapshot.title, "chores");
        assert_eq!(snapshot.created_at, 1_700_000_000);
        assert_eq!(snapshot.item_ids, vec![7, 9]);

        let item = snapshot.item(7).unwrap();
        assert_eq!(item.description, "buy milk");
        assert_eq!(item.list_id, 3);
        assert!(!item.is_completed);
        assert_eq!(item.created_at, 1_700_000_007);

        assert!(snapshot.item(9).unwrap().is_completed);
    }

    #[test]
    fn test_capture_releases_every_transient_view() {
        let (list, live_views) = stub();
        let _snapshot = capture(&list);
        assert_eq!(live_views.load(Ordering::SeqCst), 0);
    }
}
