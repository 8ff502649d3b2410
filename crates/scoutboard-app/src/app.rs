// Application state and orchestration logic.
//
// The central event loop: takes user commands from the renderer, runs every
// network call on a spawned task that reports back as an `AppEvent`, fires
// debounced searches, and pushes `UiUpdate`s to the renderer.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use scoutboard_core::api::PipelineApi;
use scoutboard_core::config::SearchConfig;
use scoutboard_core::error::PipelineError;
use scoutboard_core::projection::{project, unclassified};
use scoutboard_core::store::{ListStore, SharedStore};
use scoutboard_core::visibility::VisibleLists;

use crate::protocol::{AppEvent, BoardSnapshot, ListSummary, UiUpdate, UserCommand};
use crate::search::{run_search, SearchDispatch, SearchSession};
use crate::transition::TransitionController;

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

pub struct AppState {
    pub controller: Arc<TransitionController>,
    pub visibility: VisibleLists,
    pub search: SearchSession,
    /// Set after the first successful resync. Until then a failed refresh is a
    /// page-level `LoadFailed` rather than an inline notice.
    pub loaded: bool,
    event_tx: mpsc::Sender<AppEvent>,
}

impl AppState {
    pub fn new(
        api: Arc<dyn PipelineApi>,
        search: &SearchConfig,
        event_tx: mpsc::Sender<AppEvent>,
    ) -> Self {
        let controller = TransitionController::new(api, ListStore::shared());
        AppState {
            controller: Arc::new(controller),
            visibility: VisibleLists::new(),
            search: SearchSession::new(
                Duration::from_millis(search.debounce_ms),
                search.cache_capacity,
            ),
            loaded: false,
            event_tx,
        }
    }

    pub fn store(&self) -> &SharedStore {
        self.controller.store()
    }

    /// Project the current store through the visibility filter.
    pub async fn build_snapshot(&self) -> BoardSnapshot {
        let guard = self.store().read().await;
        let columns = project(guard.lists(), &self.visibility);

        let dropped = unclassified(guard.lists(), &self.visibility).count();
        if dropped > 0 {
            debug!(dropped, "items with unrecognized stages left off the board");
        }

        let lists = guard
            .lists()
            .iter()
            .map(|detail| ListSummary {
                id: detail.id(),
                name: detail.name().to_string(),
                item_count: detail.items.len(),
                visible: self.visibility.is_visible(detail.id()),
            })
            .collect();

        BoardSnapshot {
            columns,
            lists,
            revision: guard.revision(),
        }
    }

    fn spawn_refresh(&self) {
        let controller = Arc::clone(&self.controller);
        let tx = self.event_tx.clone();
        tokio::spawn(async move {
            let result = controller.refresh().await;
            let _ = tx.send(AppEvent::Refreshed(result)).await;
        });
    }

    /// Run a mutation in the background and report its outcome.
    fn spawn_mutation<F, Fut>(&self, action: String, op: F)
    where
        F: FnOnce(Arc<TransitionController>) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), PipelineError>> + Send + 'static,
    {
        let controller = Arc::clone(&self.controller);
        let tx = self.event_tx.clone();
        tokio::spawn(async move {
            let result = op(controller).await;
            let _ = tx.send(AppEvent::MutationFinished { action, result }).await;
        });
    }

    fn spawn_search(&self, query: String, generation: u64) {
        let api = Arc::clone(self.controller.api());
        let tx = self.event_tx.clone();
        tokio::spawn(async move {
            let outcome = run_search(api.as_ref(), &query).await;
            let _ = tx
                .send(AppEvent::SearchFinished {
                    query,
                    generation,
                    outcome,
                })
                .await;
        });
    }
}

// ---------------------------------------------------------------------------
// Event loop
// ---------------------------------------------------------------------------

/// Main application event loop.
///
/// Listens using `tokio::select!` on:
/// 1. User commands from the renderer
/// 2. Results from spawned network tasks
/// 3. The search debounce deadline, while a query is pending
///
/// An initial resync is started before the first iteration.
pub async fn run(
    mut cmd_rx: mpsc::Receiver<UserCommand>,
    mut event_rx: mpsc::Receiver<AppEvent>,
    ui_tx: mpsc::Sender<UiUpdate>,
    mut state: AppState,
) -> anyhow::Result<()> {
    info!("Application event loop started");
    state.spawn_refresh();

    loop {
        let deadline = state.search.deadline();

        tokio::select! {
            // --- User commands ---
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(UserCommand::Quit) => {
                        info!("Quit command received, shutting down");
                        break;
                    }
                    Some(cmd) => {
                        handle_user_command(&mut state, cmd, &ui_tx).await;
                    }
                    None => {
                        info!("Command channel closed, shutting down");
                        break;
                    }
                }
            }

            // --- Network task results ---
            // `state` holds a sender, so this channel never closes first.
            Some(event) = event_rx.recv() => {
                handle_app_event(&mut state, event, &ui_tx).await;
            }

            // --- Search debounce ---
            _ = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                if let Some((query, dispatch)) = state.search.poll(Instant::now()) {
                    debug!(query = %query, "search debounce fired");
                    handle_search_dispatch(&state, query, dispatch, &ui_tx).await;
                }
            }
        }
    }

    state.search.cancel();
    info!("Application event loop exiting");
    Ok(())
}

async fn send_board(state: &AppState, ui_tx: &mpsc::Sender<UiUpdate>) {
    let snapshot = state.build_snapshot().await;
    let _ = ui_tx.send(UiUpdate::Board(Box::new(snapshot))).await;
}

async fn handle_user_command(
    state: &mut AppState,
    cmd: UserCommand,
    ui_tx: &mpsc::Sender<UiUpdate>,
) {
    match cmd {
        UserCommand::Refresh => {
            info!("Refresh requested");
            state.spawn_refresh();
        }
        UserCommand::ToggleList(list_id) => match state.visibility.toggle(list_id) {
            Some(visible) => {
                info!(list_id, visible, "Toggled list visibility");
                send_board(state, ui_tx).await;
            }
            None => {
                let _ = ui_tx
                    .send(UiUpdate::Notice(format!("No list with id {list_id}")))
                    .await;
            }
        },
        UserCommand::MoveItem { item_id, from, to } => {
            let visible = state.visibility.clone();
            state.spawn_mutation(format!("move item {item_id} to {to}"), move |c| async move {
                c.move_item(&visible, item_id, from, to).await
            });
        }
        UserCommand::ReorderItem {
            list_id,
            old_index,
            new_index,
        } => {
            let action = format!("reorder list {list_id}");
            match state
                .controller
                .stage_reorder(list_id, old_index, new_index)
                .await
            {
                Ok(orders) => {
                    send_board(state, ui_tx).await;
                    state.spawn_mutation(action, move |c| async move {
                        c.submit_reorder(list_id, orders).await.map(|_| ())
                    });
                }
                Err(e) => {
                    state.spawn_mutation(action, move |c| async move {
                        c.resync_after(Err(e)).await
                    });
                }
            }
        }
        UserCommand::ReorderInColumn { item_id, position } => {
            let action = format!("reorder item {item_id}");
            match state
                .controller
                .stage_column_reorder(&state.visibility, item_id, position)
                .await
            {
                Ok((list_id, orders)) => {
                    send_board(state, ui_tx).await;
                    state.spawn_mutation(action, move |c| async move {
                        c.submit_reorder(list_id, orders).await.map(|_| ())
                    });
                }
                Err(e) => {
                    state.spawn_mutation(action, move |c| async move {
                        c.resync_after(Err(e)).await
                    });
                }
            }
        }
        UserCommand::SearchInput(query) => {
            let generation = state.search.input(&query);
            debug!(query = %query, generation, "search input");
        }
        UserCommand::CloseSearch => {
            state.search.cancel();
        }
        UserCommand::SelectResult { list_id, identity } => {
            state.spawn_mutation(format!("add {identity} to list {list_id}"), move |c| async move {
                c.add_player(list_id, identity).await.map(|_| ())
            });
        }
        UserCommand::CreateList { name, description } => {
            state.spawn_mutation(format!("create list {name:?}"), move |c| async move {
                c.create_list(&name, description).await.map(|_| ())
            });
        }
        UserCommand::UpdateList { list_id, update } => {
            state.spawn_mutation(format!("update list {list_id}"), move |c| async move {
                c.update_list(list_id, update).await.map(|_| ())
            });
        }
        UserCommand::DeleteList(list_id) => {
            state.spawn_mutation(format!("delete list {list_id}"), move |c| async move {
                c.delete_list(list_id).await
            });
        }
        UserCommand::RemovePlayer { list_id, item_id } => {
            state.spawn_mutation(
                format!("remove item {item_id} from list {list_id}"),
                move |c| async move { c.remove_player(list_id, item_id).await },
            );
        }
        UserCommand::Quit => {
            // Handled in the main loop
        }
    }
}

async fn handle_app_event(state: &mut AppState, event: AppEvent, ui_tx: &mpsc::Sender<UiUpdate>) {
    match event {
        AppEvent::Refreshed(Ok(())) => {
            state.loaded = true;
            reconcile_and_send(state, ui_tx).await;
        }
        AppEvent::Refreshed(Err(e)) => {
            warn!(error = %e, "Refresh failed");
            let update = if state.loaded {
                UiUpdate::Notice(e.user_message())
            } else {
                UiUpdate::LoadFailed(e.user_message())
            };
            let _ = ui_tx.send(update).await;
        }
        AppEvent::MutationFinished { action, result } => {
            match &result {
                Ok(()) => info!(action = %action, "Mutation completed"),
                Err(e) => warn!(action = %action, error = %e, kind = ?e.kind(), "Mutation failed"),
            }
            // The controller has resynced either way.
            if state.store().read().await.is_loaded() {
                state.loaded = true;
            }
            reconcile_and_send(state, ui_tx).await;
            if let Err(e) = result {
                let _ = ui_tx.send(UiUpdate::Notice(e.user_message())).await;
            }
        }
        AppEvent::SearchFinished {
            query,
            generation,
            outcome,
        } => match state.search.complete(&query, generation, outcome) {
            Some(Ok(results)) => {
                let _ = ui_tx.send(UiUpdate::SearchResults { query, results }).await;
            }
            Some(Err(e)) => {
                warn!(query = %query, error = %e, "Search failed");
                let _ = ui_tx.send(UiUpdate::Notice(e.user_message())).await;
            }
            None => {}
        },
    }
}

async fn reconcile_and_send(state: &mut AppState, ui_tx: &mpsc::Sender<UiUpdate>) {
    {
        let guard = state.controller.store().read().await;
        state.visibility.reconcile(guard.lists());
    }
    send_board(state, ui_tx).await;
}

async fn handle_search_dispatch(
    state: &AppState,
    query: String,
    dispatch: SearchDispatch,
    ui_tx: &mpsc::Sender<UiUpdate>,
) {
    match dispatch {
        SearchDispatch::Cleared => {
            let _ = ui_tx
                .send(UiUpdate::SearchResults {
                    query,
                    results: Vec::new(),
                })
                .await;
        }
        SearchDispatch::Cached(results) => {
            let _ = ui_tx.send(UiUpdate::SearchResults { query, results }).await;
        }
        SearchDispatch::Fetch { query, generation } => {
            let _ = ui_tx
                .send(UiUpdate::SearchLoading {
                    query: query.clone(),
                })
                .await;
            state.spawn_search(query, generation);
        }
    }
}
