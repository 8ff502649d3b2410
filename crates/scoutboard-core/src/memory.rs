// In-memory implementation of the player-lists API.
//
// Mirrors the server's observable rules (duplicate membership rejection,
// cascade on list delete, stale ids reported as not-found) so the
// orchestration layer can be exercised without a network. Backs the offline
// mode of the binary and the test suites, which also use its call log,
// injected failures and injected latency.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;

use crate::api::PipelineApi;
use crate::error::PipelineError;
use crate::identity::PlayerIdentity;
use crate::model::{
    AddPlayerRequest, ItemId, ListId, ListItem, ListUpdate, NewList, PlayerList,
    PlayerListDetail, PlayerProfile, PlayerSearchResult, ReorderRequest, Stage,
};

/// One API call, as recorded in the call log and as a key for injected
/// failures and delays.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ApiOp {
    ListLists,
    GetList(ListId),
    CreateList,
    UpdateList(ListId),
    DeleteList(ListId),
    AddPlayer(ListId),
    RemovePlayer(ListId, ItemId),
    UpdateStage(ListId, ItemId),
    Reorder(ListId),
    Search(String),
}

#[derive(Debug, Default)]
struct MemoryState {
    lists: Vec<PlayerList>,
    items: Vec<ListItem>,
    catalog: Vec<PlayerSearchResult>,
    next_list_id: ListId,
    next_item_id: ItemId,
}

#[derive(Debug, Default)]
pub struct MemoryApi {
    owner: String,
    state: Mutex<MemoryState>,
    calls: Mutex<Vec<ApiOp>>,
    failures: Mutex<HashMap<ApiOp, VecDeque<PipelineError>>>,
    delays: Mutex<HashMap<ApiOp, Duration>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MemoryApi {
    pub fn new(owner: impl Into<String>) -> Self {
        MemoryApi {
            owner: owner.into(),
            state: Mutex::new(MemoryState {
                next_list_id: 1,
                next_item_id: 1,
                ..MemoryState::default()
            }),
            ..MemoryApi::default()
        }
    }

    /// A backend seeded with two lists and a small search catalog.
    pub fn with_demo_data() -> Self {
        let api = MemoryApi::new("demo@scoutboard.local");
        let catalog = [
            (PlayerIdentity::External(501), "Roy Keane", "CM", "Cobh Ramblers", 19),
            (PlayerIdentity::External(502), "Denis Irwin", "LB", "Cork City", 20),
            (PlayerIdentity::External(503), "Niall Quinn", "ST", "Arsenal Reserves", 18),
            (PlayerIdentity::Internal(12), "Liam Kearney", "GK", "Trial Match XI", 17),
            (PlayerIdentity::Internal(13), "Kevin Moran", "CB", "Pegasus", 21),
        ];
        for (identity, name, position, squad, age) in catalog {
            api.add_to_catalog(PlayerSearchResult {
                identity,
                profile: PlayerProfile {
                    player_name: name.to_string(),
                    position: Some(position.to_string()),
                    squad_name: Some(squad.to_string()),
                    age: Some(age),
                },
            });
        }

        let shortlist = api.seed_list("Shortlist");
        let loans = api.seed_list("Loan Targets");
        api.seed_item(shortlist, PlayerIdentity::External(501), Stage::One, Some(7.4));
        api.seed_item(shortlist, PlayerIdentity::External(502), Stage::Two, Some(6.8));
        api.seed_item(shortlist, PlayerIdentity::Internal(12), Stage::One, None);
        api.seed_item(loans, PlayerIdentity::External(503), Stage::Three, Some(7.9));
        api
    }

    pub fn add_to_catalog(&self, result: PlayerSearchResult) {
        lock(&self.state).catalog.push(result);
    }

    /// Create a list directly, bypassing the call log.
    pub fn seed_list(&self, name: &str) -> ListId {
        let mut state = lock(&self.state);
        let list = new_list(&mut state, &self.owner, name, None);
        list.id
    }

    /// Add a membership directly, bypassing the call log and duplicate check.
    pub fn seed_item(
        &self,
        list_id: ListId,
        identity: PlayerIdentity,
        stage: Stage,
        score: Option<f64>,
    ) -> ItemId {
        let mut state = lock(&self.state);
        let mut item = new_item(&mut state, list_id, identity);
        item.stage = stage.as_str().to_string();
        item.avg_performance_score = score;
        let id = item.item_id;
        state.items.push(item);
        id
    }

    /// Overwrite an item's raw stage value, e.g. with a value the board does
    /// not recognize.
    pub fn set_raw_stage(&self, item_id: ItemId, raw: &str) {
        if let Some(item) = lock(&self.state).items.iter_mut().find(|i| i.item_id == item_id) {
            item.stage = raw.to_string();
        }
    }

    /// Make the next call matching `op` fail with `err`. Several failures for
    /// the same op are returned in order.
    pub fn fail_next(&self, op: ApiOp, err: PipelineError) {
        lock(&self.failures).entry(op).or_default().push_back(err);
    }

    /// Delay every call matching `op` by `delay` before it is answered.
    pub fn delay(&self, op: ApiOp, delay: Duration) {
        lock(&self.delays).insert(op, delay);
    }

    pub fn calls(&self) -> Vec<ApiOp> {
        lock(&self.calls).clone()
    }

    pub fn call_count(&self, matches: impl Fn(&ApiOp) -> bool) -> usize {
        lock(&self.calls).iter().filter(|op| matches(op)).count()
    }

    pub fn clear_calls(&self) {
        lock(&self.calls).clear();
    }

    /// Memberships currently stored for a list, in display order.
    pub fn items_in(&self, list_id: ListId) -> Vec<ListItem> {
        let state = lock(&self.state);
        list_items(&state, list_id)
    }

    /// Log the call, then apply any injected latency and failure.
    async fn begin(&self, op: ApiOp) -> Result<(), PipelineError> {
        debug!(?op, "memory api call");
        lock(&self.calls).push(op.clone());
        let delay = lock(&self.delays).get(&op).copied();
        let failure = lock(&self.failures)
            .get_mut(&op)
            .and_then(VecDeque::pop_front);

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

fn new_list(
    state: &mut MemoryState,
    owner: &str,
    name: &str,
    description: Option<String>,
) -> PlayerList {
    let now = Utc::now();
    let list = PlayerList {
        id: state.next_list_id,
        name: name.to_string(),
        description,
        owner: owner.to_string(),
        created_at: now,
        updated_at: now,
    };
    state.next_list_id += 1;
    state.lists.push(list.clone());
    list
}

fn new_item(state: &mut MemoryState, list_id: ListId, identity: PlayerIdentity) -> ListItem {
    let profile = state
        .catalog
        .iter()
        .find(|c| c.identity == identity)
        .map(|c| c.profile.clone())
        .unwrap_or_else(|| PlayerProfile {
            player_name: identity.to_string(),
            ..PlayerProfile::default()
        });
    let next_order = state
        .items
        .iter()
        .filter(|i| i.list_id == list_id)
        .map(|i| i.display_order + 1)
        .max()
        .unwrap_or(0);

    let item = ListItem::new(state.next_item_id, list_id, identity, profile, next_order);
    state.next_item_id += 1;
    item
}

fn list_items(state: &MemoryState, list_id: ListId) -> Vec<ListItem> {
    let mut items: Vec<ListItem> = state
        .items
        .iter()
        .filter(|i| i.list_id == list_id)
        .cloned()
        .collect();
    items.sort_by_key(|i| (i.display_order, i.item_id));
    items
}

fn list_not_found(list_id: ListId) -> PipelineError {
    PipelineError::StaleState(format!("player list {list_id} not found"))
}

fn item_not_found(list_id: ListId, item_id: ItemId) -> PipelineError {
    PipelineError::StaleState(format!("item {item_id} not found in list {list_id}"))
}

#[async_trait]
impl PipelineApi for MemoryApi {
    async fn list_lists(&self) -> Result<Vec<PlayerList>, PipelineError> {
        self.begin(ApiOp::ListLists).await?;
        Ok(lock(&self.state).lists.clone())
    }

    async fn get_list(&self, list_id: ListId) -> Result<PlayerListDetail, PipelineError> {
        self.begin(ApiOp::GetList(list_id)).await?;
        let state = lock(&self.state);
        let list = state
            .lists
            .iter()
            .find(|l| l.id == list_id)
            .cloned()
            .ok_or_else(|| list_not_found(list_id))?;
        Ok(PlayerListDetail {
            list,
            items: list_items(&state, list_id),
        })
    }

    async fn create_list(&self, list: &NewList) -> Result<PlayerList, PipelineError> {
        self.begin(ApiOp::CreateList).await?;
        if list.name.trim().is_empty() {
            return Err(PipelineError::Validation {
                status: 400,
                message: "list name must not be empty".into(),
            });
        }
        let mut state = lock(&self.state);
        Ok(new_list(&mut state, &self.owner, list.name.trim(), list.description.clone()))
    }

    async fn update_list(
        &self,
        list_id: ListId,
        update: &ListUpdate,
    ) -> Result<PlayerList, PipelineError> {
        self.begin(ApiOp::UpdateList(list_id)).await?;
        let mut state = lock(&self.state);
        let list = state
            .lists
            .iter_mut()
            .find(|l| l.id == list_id)
            .ok_or_else(|| list_not_found(list_id))?;
        if let Some(name) = &update.name {
            list.name = name.clone();
        }
        if let Some(description) = &update.description {
            list.description = Some(description.clone());
        }
        list.updated_at = Utc::now();
        Ok(list.clone())
    }

    async fn delete_list(&self, list_id: ListId) -> Result<(), PipelineError> {
        self.begin(ApiOp::DeleteList(list_id)).await?;
        let mut state = lock(&self.state);
        let before = state.lists.len();
        state.lists.retain(|l| l.id != list_id);
        if state.lists.len() == before {
            return Err(list_not_found(list_id));
        }
        state.items.retain(|i| i.list_id != list_id);
        Ok(())
    }

    async fn add_player(
        &self,
        list_id: ListId,
        request: &AddPlayerRequest,
    ) -> Result<ListItem, PipelineError> {
        self.begin(ApiOp::AddPlayer(list_id)).await?;
        let identity = request.identity().ok_or_else(|| PipelineError::Validation {
            status: 400,
            message: "exactly one of player_id or internal_player_id is required".into(),
        })?;

        let mut state = lock(&self.state);
        if !state.lists.iter().any(|l| l.id == list_id) {
            return Err(list_not_found(list_id));
        }
        if state
            .items
            .iter()
            .any(|i| i.list_id == list_id && i.player_identity == identity)
        {
            return Err(PipelineError::Duplicate(format!(
                "player {identity} is already in list {list_id}"
            )));
        }

        let mut item = new_item(&mut state, list_id, identity);
        item.notes = request.notes.clone();
        item.added_by = Some(self.owner.clone());
        state.items.push(item.clone());
        Ok(item)
    }

    async fn remove_player(&self, list_id: ListId, item_id: ItemId) -> Result<(), PipelineError> {
        self.begin(ApiOp::RemovePlayer(list_id, item_id)).await?;
        let mut state = lock(&self.state);
        let before = state.items.len();
        state
            .items
            .retain(|i| !(i.list_id == list_id && i.item_id == item_id));
        if state.items.len() == before {
            return Err(item_not_found(list_id, item_id));
        }
        Ok(())
    }

    async fn update_stage(
        &self,
        list_id: ListId,
        item_id: ItemId,
        stage: Stage,
    ) -> Result<(), PipelineError> {
        self.begin(ApiOp::UpdateStage(list_id, item_id)).await?;
        let mut state = lock(&self.state);
        let item = state
            .items
            .iter_mut()
            .find(|i| i.list_id == list_id && i.item_id == item_id)
            .ok_or_else(|| item_not_found(list_id, item_id))?;
        item.stage = stage.as_str().to_string();
        Ok(())
    }

    async fn reorder(
        &self,
        list_id: ListId,
        request: &ReorderRequest,
    ) -> Result<(), PipelineError> {
        self.begin(ApiOp::Reorder(list_id)).await?;
        let mut state = lock(&self.state);
        for order in &request.item_orders {
            if !state
                .items
                .iter()
                .any(|i| i.list_id == list_id && i.item_id == order.item_id)
            {
                return Err(item_not_found(list_id, order.item_id));
            }
        }
        for order in &request.item_orders {
            if let Some(item) = state
                .items
                .iter_mut()
                .find(|i| i.list_id == list_id && i.item_id == order.item_id)
            {
                item.display_order = order.display_order;
            }
        }
        Ok(())
    }

    async fn search_players(&self, query: &str) -> Result<Vec<PlayerSearchResult>, PipelineError> {
        self.begin(ApiOp::Search(query.to_string())).await?;
        let needle = query.trim().to_lowercase();
        let state = lock(&self.state);
        Ok(state
            .catalog
            .iter()
            .filter(|c| c.profile.player_name.to_lowercase().contains(&needle))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn add_player_rejects_duplicate_membership() {
        let api = MemoryApi::with_demo_data();
        let request = AddPlayerRequest::for_identity(PlayerIdentity::External(501));

        let err = api.add_player(1, &request).await.unwrap_err();
        assert!(err.is_duplicate());
        assert_eq!(api.items_in(1).len(), 3);
    }

    #[tokio::test]
    async fn same_player_may_join_different_lists() {
        let api = MemoryApi::with_demo_data();
        let request = AddPlayerRequest::for_identity(PlayerIdentity::External(501));

        let item = api.add_player(2, &request).await.unwrap();
        assert_eq!(item.list_id, 2);
        assert_eq!(item.stage(), Some(Stage::One));
        assert_eq!(item.player_name(), "Roy Keane");
    }

    #[tokio::test]
    async fn internal_and_external_ids_do_not_collide() {
        let api = MemoryApi::new("owner");
        let list = api.seed_list("A");
        api.seed_item(list, PlayerIdentity::External(12), Stage::One, None);

        let request = AddPlayerRequest::for_identity(PlayerIdentity::Internal(12));
        assert!(api.add_player(list, &request).await.is_ok());
    }

    #[tokio::test]
    async fn delete_list_cascades_items() {
        let api = MemoryApi::with_demo_data();
        api.delete_list(1).await.unwrap();

        assert!(api.items_in(1).is_empty());
        assert!(matches!(
            api.get_list(1).await,
            Err(PipelineError::StaleState(_))
        ));
    }

    #[tokio::test]
    async fn injected_failure_is_returned_once() {
        let api = MemoryApi::with_demo_data();
        api.fail_next(ApiOp::ListLists, PipelineError::Transport("boom".into()));

        assert!(api.list_lists().await.is_err());
        assert!(api.list_lists().await.is_ok());
        assert_eq!(api.call_count(|op| *op == ApiOp::ListLists), 2);
    }

    #[tokio::test]
    async fn search_is_case_insensitive_substring() {
        let api = MemoryApi::with_demo_data();
        let results = api.search_players("KEA").await.unwrap();
        let names: Vec<_> = results.iter().map(|r| r.profile.player_name.as_str()).collect();
        assert_eq!(names, vec!["Roy Keane", "Liam Kearney"]);
    }

    #[tokio::test]
    async fn update_stage_on_missing_item_is_stale() {
        let api = MemoryApi::with_demo_data();
        let err = api.update_stage(1, 999, Stage::Two).await.unwrap_err();
        assert!(matches!(err, PipelineError::StaleState(_)));
    }
}
