// List Store: the authoritative client-side snapshot of every list and its
// member items.
//
// The snapshot is replaced wholesale by each resync. The only in-place edit
// is the optimistic display-order rewrite applied while a reorder request is
// in flight.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::model::{ItemId, ItemOrder, ListId, ListItem, PlayerListDetail};

/// Handle shared between the event loop and spawned network tasks.
pub type SharedStore = Arc<RwLock<ListStore>>;

#[derive(Debug, Clone, Default)]
pub struct ListStore {
    lists: Vec<PlayerListDetail>,
    /// When the last full refresh landed. `None` until the first one.
    refreshed_at: Option<DateTime<Utc>>,
    /// Incremented on every replacement, so readers can tell snapshots apart.
    revision: u64,
}

impl ListStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedStore {
        Arc::new(RwLock::new(Self::new()))
    }

    /// Replace the whole snapshot. Items within each list are kept sorted by
    /// `display_order` (ties broken by `item_id`) so downstream consumers can
    /// rely on positional indices.
    pub fn replace(&mut self, mut lists: Vec<PlayerListDetail>) {
        for detail in &mut lists {
            detail
                .items
                .sort_by_key(|item| (item.display_order, item.item_id));
        }
        self.lists = lists;
        self.refreshed_at = Some(Utc::now());
        self.revision += 1;
    }

    pub fn lists(&self) -> &[PlayerListDetail] {
        &self.lists
    }

    pub fn list(&self, list_id: ListId) -> Option<&PlayerListDetail> {
        self.lists.iter().find(|l| l.id() == list_id)
    }

    /// Find an item anywhere in the snapshot.
    pub fn item(&self, item_id: ItemId) -> Option<&ListItem> {
        self.lists
            .iter()
            .flat_map(|l| l.items.iter())
            .find(|item| item.item_id == item_id)
    }

    pub fn item_count(&self) -> usize {
        self.lists.iter().map(|l| l.items.len()).sum()
    }

    pub fn is_loaded(&self) -> bool {
        self.refreshed_at.is_some()
    }

    pub fn refreshed_at(&self) -> Option<DateTime<Utc>> {
        self.refreshed_at
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Apply a locally computed ordering to one list. Items missing from
    /// `orders` keep their current position after the ordered ones.
    ///
    /// Returns `false` if the list is not in the snapshot.
    pub fn apply_order(&mut self, list_id: ListId, orders: &[ItemOrder]) -> bool {
        let Some(detail) = self.lists.iter_mut().find(|l| l.list.id == list_id) else {
            return false;
        };

        for item in &mut detail.items {
            match orders.iter().find(|o| o.item_id == item.item_id) {
                Some(order) => item.display_order = order.display_order,
                None => item.display_order = u32::MAX,
            }
        }
        detail
            .items
            .sort_by_key(|item| (item.display_order, item.item_id));
        true
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn replace_sorts_items_by_display_order() {
        let mut store = ListStore::new();
        store.replace(vec![detail(
            1,
            "Shortlist",
            vec![item(3, 1, 2, "Stage 1"), item(1, 1, 0, "Stage 1"), item(2, 1, 1, "Stage 1")],
        )]);

        let ids: Vec<_> = store.list(1).unwrap().items.iter().map(|i| i.item_id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert!(store.is_loaded());
        assert_eq!(store.revision(), 1);
    }

    #[test]
    fn replace_discards_previous_snapshot() {
        let mut store = ListStore::new();
        store.replace(vec![detail(1, "A", vec![item(1, 1, 0, "Stage 1")])]);
        store.replace(vec![detail(2, "B", vec![])]);

        assert!(store.list(1).is_none());
        assert!(store.item(1).is_none());
        assert_eq!(store.lists().len(), 1);
        assert_eq!(store.revision(), 2);
    }

    #[test]
    fn apply_order_rewrites_positions() {
        let mut store = ListStore::new();
        store.replace(vec![detail(
            1,
            "A",
            vec![item(10, 1, 0, "Stage 1"), item(11, 1, 1, "Stage 1"), item(12, 1, 2, "Stage 1")],
        )]);

        let orders = vec![
            ItemOrder { item_id: 12, display_order: 0 },
            ItemOrder { item_id: 10, display_order: 1 },
            ItemOrder { item_id: 11, display_order: 2 },
        ];
        assert!(store.apply_order(1, &orders));

        let ids: Vec<_> = store.list(1).unwrap().items.iter().map(|i| i.item_id).collect();
        assert_eq!(ids, vec![12, 10, 11]);
        assert!(!store.apply_order(99, &orders));
    }

    #[test]
    fn item_lookup_spans_lists() {
        let mut store = ListStore::new();
        store.replace(vec![
            detail(1, "A", vec![item(1, 1, 0, "Stage 1")]),
            detail(2, "B", vec![item(2, 2, 0, "Stage 1"), item(3, 2, 1, "Stage 1")]),
        ]);
        assert_eq!(store.item(3).map(|i| i.list_id), Some(2));
        assert_eq!(store.item_count(), 3);
    }
}
