// The player-lists HTTP contract as a trait, so the orchestration layer can
// run against the real server or the in-memory backend.

use async_trait::async_trait;

use crate::error::PipelineError;
use crate::model::{
    AddPlayerRequest, ItemId, ListId, ListItem, ListUpdate, NewList, PlayerList,
    PlayerListDetail, PlayerSearchResult, ReorderRequest, Stage,
};

#[async_trait]
pub trait PipelineApi: Send + Sync {
    /// `GET /player-lists`
    async fn list_lists(&self) -> Result<Vec<PlayerList>, PipelineError>;

    /// `GET /player-lists/{id}`
    async fn get_list(&self, list_id: ListId) -> Result<PlayerListDetail, PipelineError>;

    /// `POST /player-lists`
    async fn create_list(&self, list: &NewList) -> Result<PlayerList, PipelineError>;

    /// `PUT /player-lists/{id}`
    async fn update_list(
        &self,
        list_id: ListId,
        update: &ListUpdate,
    ) -> Result<PlayerList, PipelineError>;

    /// `DELETE /player-lists/{id}`. Removes the list's items with it.
    async fn delete_list(&self, list_id: ListId) -> Result<(), PipelineError>;

    /// `POST /player-lists/{id}/players`
    async fn add_player(
        &self,
        list_id: ListId,
        request: &AddPlayerRequest,
    ) -> Result<ListItem, PipelineError>;

    /// `DELETE /player-lists/{id}/players/{item_id}`
    async fn remove_player(&self, list_id: ListId, item_id: ItemId) -> Result<(), PipelineError>;

    /// `PUT /player-lists/{id}/players/{item_id}/stage`
    async fn update_stage(
        &self,
        list_id: ListId,
        item_id: ItemId,
        stage: Stage,
    ) -> Result<(), PipelineError>;

    /// `PUT /player-lists/{id}/reorder`
    async fn reorder(&self, list_id: ListId, request: &ReorderRequest)
        -> Result<(), PipelineError>;

    /// `GET /players/search?query=...`
    async fn search_players(&self, query: &str) -> Result<Vec<PlayerSearchResult>, PipelineError>;
}
