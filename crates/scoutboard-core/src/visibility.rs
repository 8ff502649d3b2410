// Client-side list visibility filter.
//
// Purely local state: it never reaches the server and never touches the List
// Store, it only narrows which lists feed the stage projection.

use std::collections::BTreeSet;

use crate::model::{ListId, PlayerListDetail};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisibleLists {
    visible: BTreeSet<ListId>,
    /// Every list id seen so far. Lists seen for the first time start
    /// visible; lists the user hid stay hidden across refreshes.
    known: BTreeSet<ListId>,
}

impl VisibleLists {
    pub fn new() -> Self {
        Self::default()
    }

    /// A filter with exactly the given lists visible.
    pub fn with_visible(ids: impl IntoIterator<Item = ListId>) -> Self {
        let visible: BTreeSet<ListId> = ids.into_iter().collect();
        VisibleLists {
            known: visible.clone(),
            visible,
        }
    }

    /// Bring the filter in line with a fresh snapshot: new lists become
    /// visible, deleted lists are forgotten.
    pub fn reconcile(&mut self, lists: &[PlayerListDetail]) {
        let present: BTreeSet<ListId> = lists.iter().map(|l| l.id()).collect();

        for id in &present {
            if self.known.insert(*id) {
                self.visible.insert(*id);
            }
        }
        self.known.retain(|id| present.contains(id));
        self.visible.retain(|id| present.contains(id));
    }

    /// Flip one list's visibility. Returns the new state, or `None` if the
    /// list is unknown.
    pub fn toggle(&mut self, list_id: ListId) -> Option<bool> {
        if !self.known.contains(&list_id) {
            return None;
        }
        if self.visible.remove(&list_id) {
            Some(false)
        } else {
            self.visible.insert(list_id);
            Some(true)
        }
    }

    pub fn show_all(&mut self) {
        self.visible = self.known.clone();
    }

    pub fn is_visible(&self, list_id: ListId) -> bool {
        self.visible.contains(&list_id)
    }

    pub fn ids(&self) -> &BTreeSet<ListId> {
        &self.visible
    }
}
