// Message types exchanged between the event loop, its spawned network tasks,
// and the renderer.

use scoutboard_core::error::PipelineError;
use scoutboard_core::identity::PlayerIdentity;
use scoutboard_core::model::{ItemId, ListId, ListUpdate, PlayerSearchResult, Stage};
use scoutboard_core::projection::Board;

// ---------------------------------------------------------------------------
// Renderer -> event loop
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum UserCommand {
    /// Full resync; also the retry after a failed initial load.
    Refresh,
    ToggleList(ListId),
    MoveItem {
        item_id: ItemId,
        from: Stage,
        to: Stage,
    },
    ReorderItem {
        list_id: ListId,
        old_index: usize,
        new_index: usize,
    },
    /// Move an item to slot `position` (0-based) of the stage column it is
    /// shown in.
    ReorderInColumn {
        item_id: ItemId,
        position: usize,
    },
    SearchInput(String),
    /// The search panel was closed; pending and in-flight searches are dropped.
    CloseSearch,
    /// Add a search result to a list.
    SelectResult {
        list_id: ListId,
        identity: PlayerIdentity,
    },
    CreateList {
        name: String,
        description: Option<String>,
    },
    UpdateList {
        list_id: ListId,
        update: ListUpdate,
    },
    DeleteList(ListId),
    RemovePlayer {
        list_id: ListId,
        item_id: ItemId,
    },
    Quit,
}

// ---------------------------------------------------------------------------
// Event loop -> renderer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum UiUpdate {
    Board(Box<BoardSnapshot>),
    SearchLoading {
        query: String,
    },
    SearchResults {
        query: String,
        results: Vec<PlayerSearchResult>,
    },
    /// Dismissible inline message.
    Notice(String),
    /// The board could not be loaded at all; `UserCommand::Refresh` retries.
    LoadFailed(String),
}

/// Everything the renderer needs to draw the board.
#[derive(Debug, Clone, PartialEq)]
pub struct BoardSnapshot {
    pub columns: Board,
    pub lists: Vec<ListSummary>,
    pub revision: u64,
}

impl BoardSnapshot {
    pub fn list(&self, list_id: ListId) -> Option<&ListSummary> {
        self.lists.iter().find(|l| l.id == list_id)
    }
}

/// One entry in the list toggle bar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListSummary {
    pub id: ListId,
    pub name: String,
    pub item_count: usize,
    pub visible: bool,
}

// ---------------------------------------------------------------------------
// Spawned tasks -> event loop
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum AppEvent {
    Refreshed(Result<(), PipelineError>),
    MutationFinished {
        action: String,
        result: Result<(), PipelineError>,
    },
    SearchFinished {
        query: String,
        generation: u64,
        outcome: Result<Vec<PlayerSearchResult>, PipelineError>,
    },
}
