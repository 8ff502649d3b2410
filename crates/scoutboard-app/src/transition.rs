// Transition Controller: every mutation the board can issue.
//
// A stage move or list edit sends its request and then forces a full resync,
// whether the request succeeded or not, so the store converges to what the
// server holds. A reorder is applied to the store optimistically and only
// resynced if the server rejects it.

use std::sync::Arc;

use tracing::{debug, info, warn};

use scoutboard_core::api::PipelineApi;
use scoutboard_core::error::PipelineError;
use scoutboard_core::identity::PlayerIdentity;
use scoutboard_core::model::{
    AddPlayerRequest, ItemId, ItemOrder, ListId, ListItem, ListUpdate, NewList, PlayerList,
    PlayerListDetail, ReorderRequest, Stage,
};
use scoutboard_core::projection::{locate, project};
use scoutboard_core::store::{ListStore, SharedStore};
use scoutboard_core::visibility::VisibleLists;

use crate::sync;

pub struct TransitionController {
    api: Arc<dyn PipelineApi>,
    store: SharedStore,
}

impl TransitionController {
    pub fn new(api: Arc<dyn PipelineApi>, store: SharedStore) -> Self {
        TransitionController { api, store }
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    pub fn api(&self) -> &Arc<dyn PipelineApi> {
        &self.api
    }

    /// Full resync of the List Store.
    pub async fn refresh(&self) -> Result<(), PipelineError> {
        sync::resync(self.api.as_ref(), &self.store).await
    }

    /// Move an item from one stage column to another.
    ///
    /// The owning list is recovered from the item's entry in the `from`
    /// column of the board as currently projected with `visible`. Moving to
    /// the stage the item is already in is a no-op.
    pub async fn move_item(
        &self,
        visible: &VisibleLists,
        item_id: ItemId,
        from: Stage,
        to: Stage,
    ) -> Result<(), PipelineError> {
        let list_id = {
            let guard = self.store.read().await;
            let board = project(guard.lists(), visible);
            locate(&board, item_id, from).map(|entry| entry.list_id)
        };

        if from == to && list_id.is_some() {
            return Ok(());
        }

        let result = match list_id {
            Some(list_id) => {
                info!(list_id, item_id, %from, %to, "moving item");
                self.api.update_stage(list_id, item_id, to).await
            }
            None => Err(PipelineError::ItemNotInStage {
                item_id,
                stage: from,
            }),
        };

        self.resync_after(result.map_err(reject_move)).await
    }

    /// Move the item at `old_index` to `new_index` within one list and submit
    /// the complete renumbered order.
    ///
    /// Returns the order that was submitted.
    pub async fn reorder_item(
        &self,
        list_id: ListId,
        old_index: usize,
        new_index: usize,
    ) -> Result<Vec<ItemOrder>, PipelineError> {
        match self.stage_reorder(list_id, old_index, new_index).await {
            Ok(orders) => self.submit_reorder(list_id, orders).await,
            Err(e) => self.resync_after(Err(e)).await,
        }
    }

    /// Compute the new order for a reorder and apply it to the store without
    /// contacting the server.
    pub async fn stage_reorder(
        &self,
        list_id: ListId,
        old_index: usize,
        new_index: usize,
    ) -> Result<Vec<ItemOrder>, PipelineError> {
        let mut guard = self.store.write().await;
        let orders = plan_reorder(&guard, list_id, old_index, new_index)?;
        guard.apply_order(list_id, &orders);
        debug!(list_id, old_index, new_index, "applied reorder locally");
        Ok(orders)
    }

    /// Reorder within a stage column: move `item_id` to the column slot
    /// `position` (0-based) of the board as currently projected with
    /// `visible`, then submit the whole list's renumbered order.
    pub async fn reorder_in_column(
        &self,
        visible: &VisibleLists,
        item_id: ItemId,
        position: usize,
    ) -> Result<Vec<ItemOrder>, PipelineError> {
        match self.stage_column_reorder(visible, item_id, position).await {
            Ok((list_id, orders)) => self.submit_reorder(list_id, orders).await,
            Err(e) => self.resync_after(Err(e)).await,
        }
    }

    /// Column-relative counterpart of `stage_reorder`. Returns the list the
    /// order belongs to along with the order.
    pub async fn stage_column_reorder(
        &self,
        visible: &VisibleLists,
        item_id: ItemId,
        position: usize,
    ) -> Result<(ListId, Vec<ItemOrder>), PipelineError> {
        let mut guard = self.store.write().await;
        let (list_id, old_index, new_index) =
            column_to_list_indices(guard.lists(), visible, item_id, position)?;
        let orders = plan_reorder(&guard, list_id, old_index, new_index)?;
        guard.apply_order(list_id, &orders);
        debug!(list_id, item_id, position, old_index, new_index, "applied column reorder locally");
        Ok((list_id, orders))
    }

    /// Send an order previously applied by `stage_reorder`. The store is only
    /// resynced if the server rejects it.
    pub async fn submit_reorder(
        &self,
        list_id: ListId,
        orders: Vec<ItemOrder>,
    ) -> Result<Vec<ItemOrder>, PipelineError> {
        info!(list_id, items = orders.len(), "submitting reorder");
        let request = ReorderRequest {
            item_orders: orders,
        };
        match self.api.reorder(list_id, &request).await {
            Ok(()) => Ok(request.item_orders),
            Err(e) => self.resync_after(Err(e)).await,
        }
    }

    /// Add a player to a list. A duplicate membership comes back as
    /// `PipelineError::Duplicate`.
    pub async fn add_player(
        &self,
        list_id: ListId,
        identity: PlayerIdentity,
    ) -> Result<ListItem, PipelineError> {
        info!(list_id, %identity, "adding player to list");
        let request = AddPlayerRequest::for_identity(identity);
        let result = self.api.add_player(list_id, &request).await;
        self.resync_after(result).await
    }

    pub async fn remove_player(&self, list_id: ListId, item_id: ItemId) -> Result<(), PipelineError> {
        info!(list_id, item_id, "removing player from list");
        let result = self.api.remove_player(list_id, item_id).await;
        self.resync_after(result).await
    }

    pub async fn create_list(
        &self,
        name: &str,
        description: Option<String>,
    ) -> Result<PlayerList, PipelineError> {
        info!(name, "creating list");
        let body = NewList {
            name: name.to_string(),
            description,
        };
        let result = self.api.create_list(&body).await;
        self.resync_after(result).await
    }

    pub async fn update_list(
        &self,
        list_id: ListId,
        update: ListUpdate,
    ) -> Result<PlayerList, PipelineError> {
        info!(list_id, "updating list");
        let result = self.api.update_list(list_id, &update).await;
        self.resync_after(result).await
    }

    pub async fn delete_list(&self, list_id: ListId) -> Result<(), PipelineError> {
        info!(list_id, "deleting list");
        let result = self.api.delete_list(list_id).await;
        self.resync_after(result).await
    }

    /// Resync, then report the mutation's own failure first, or the resync's
    /// failure if the mutation went through.
    pub async fn resync_after<T>(
        &self,
        result: Result<T, PipelineError>,
    ) -> Result<T, PipelineError> {
        let refreshed = self.refresh().await;
        match (result, refreshed) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(resync_err)) => Err(resync_err),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(resync_err)) => {
                warn!(error = %resync_err, "resync after failed mutation also failed");
                Err(e)
            }
        }
    }
}

/// Stage moves surface one generic failure; auth failures pass through for
/// the auth layer.
fn reject_move(err: PipelineError) -> PipelineError {
    match err {
        PipelineError::Unauthorized { .. } => err,
        other => PipelineError::MoveRejected {
            source: Box::new(other),
        },
    }
}

/// Compute the complete renumbered order for moving one item of `list_id`.
pub fn plan_reorder(
    store: &ListStore,
    list_id: ListId,
    old_index: usize,
    new_index: usize,
) -> Result<Vec<ItemOrder>, PipelineError> {
    let detail = store
        .list(list_id)
        .ok_or_else(|| PipelineError::StaleState(format!("list {list_id} is not loaded")))?;

    let len = detail.items.len();
    for index in [old_index, new_index] {
        if index >= len {
            return Err(PipelineError::InvalidIndex {
                list_id,
                index,
                len,
            });
        }
    }

    let mut ids: Vec<ItemId> = detail.items.iter().map(|item| item.item_id).collect();
    move_element(&mut ids, old_index, new_index);
    Ok(renumber(&ids))
}

/// Translate a move to column slot `position` into list indices.
///
/// The card currently in that slot must belong to the same list; the moved
/// item takes its place in the list, so it lands directly before it when
/// moving up and directly after it when moving down. Other lists and other
/// stages keep their relative order.
pub fn column_to_list_indices(
    lists: &[PlayerListDetail],
    visible: &VisibleLists,
    item_id: ItemId,
    position: usize,
) -> Result<(ListId, usize, usize), PipelineError> {
    let board = project(lists, visible);
    let located = board
        .iter()
        .find_map(|column| column.find(item_id).map(|entry| (column, entry.list_id)));
    let Some((column, list_id)) = located else {
        return Err(PipelineError::StaleState(format!(
            "item {item_id} is not on the board"
        )));
    };

    let Some(target) = column.entries.get(position) else {
        return Err(PipelineError::InvalidIndex {
            list_id,
            index: position,
            len: column.len(),
        });
    };
    if target.list_id != list_id {
        return Err(PipelineError::ReorderAcrossLists {
            item_id,
            target_id: target.item_id(),
        });
    }

    let index_of = |id: ItemId| {
        lists
            .iter()
            .find(|detail| detail.id() == list_id)
            .and_then(|detail| detail.items.iter().position(|item| item.item_id == id))
    };
    match (index_of(item_id), index_of(target.item_id())) {
        (Some(old_index), Some(new_index)) => Ok((list_id, old_index, new_index)),
        _ => Err(PipelineError::StaleState(format!(
            "list {list_id} changed while reordering"
        ))),
    }
}

/// Remove the element at `old_index` and reinsert it at `new_index`.
pub fn move_element<T>(items: &mut Vec<T>, old_index: usize, new_index: usize) {
    let moved = items.remove(old_index);
    items.insert(new_index, moved);
}

/// Dense `0..n` display order over the whole sequence.
pub fn renumber(ids: &[ItemId]) -> Vec<ItemOrder> {
    ids.iter()
        .zip(0u32..)
        .map(|(&item_id, display_order)| ItemOrder {
            item_id,
            display_order,
        })
        .collect()
}
