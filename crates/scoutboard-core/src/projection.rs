// Stage Projection Engine: derives the four board columns from a List Store
// snapshot and the visible-list filter.
//
// `project` is a pure function of its inputs. Items whose stage value is not
// one of the four board stages are left out of every column.

use crate::model::{ItemId, ListId, ListItem, PlayerListDetail, Stage};
use crate::visibility::VisibleLists;

/// An item placed on the board, carrying the list it came from so the
/// renderer can show provenance.
#[derive(Debug, Clone, PartialEq)]
pub struct BoardEntry {
    pub list_id: ListId,
    pub list_name: String,
    pub item: ListItem,
}

impl BoardEntry {
    pub fn item_id(&self) -> ItemId {
        self.item.item_id
    }
}

/// One stage column.
#[derive(Debug, Clone, PartialEq)]
pub struct StageColumn {
    pub stage: Stage,
    pub entries: Vec<BoardEntry>,
    /// Mean `avg_performance_score` over scored entries; `None` when no entry
    /// has a score.
    pub average_score: Option<f64>,
}

impl StageColumn {
    fn empty(stage: Stage) -> Self {
        StageColumn {
            stage,
            entries: Vec::new(),
            average_score: None,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn find(&self, item_id: ItemId) -> Option<&BoardEntry> {
        self.entries.iter().find(|e| e.item_id() == item_id)
    }

    pub fn contains(&self, item_id: ItemId) -> bool {
        self.find(item_id).is_some()
    }
}

pub type Board = [StageColumn; 4];

/// Bucket every item of every visible list by stage.
///
/// Lists are walked in snapshot order and items in display order, so entries
/// within a column are grouped by list.
pub fn project(lists: &[PlayerListDetail], visible: &VisibleLists) -> Board {
    let mut board: Board = Stage::ALL.map(StageColumn::empty);

    for detail in lists.iter().filter(|l| visible.is_visible(l.id())) {
        for item in &detail.items {
            let Some(stage) = item.stage() else {
                continue;
            };
            board[stage.index()].entries.push(BoardEntry {
                list_id: detail.id(),
                list_name: detail.name().to_string(),
                item: item.clone(),
            });
        }
    }

    for column in &mut board {
        column.average_score = average_score(&column.entries);
    }
    board
}

/// Locate an item in the column for `stage`.
pub fn locate(board: &Board, item_id: ItemId, stage: Stage) -> Option<&BoardEntry> {
    board[stage.index()].find(item_id)
}

/// Items in visible lists whose stage value the board does not recognize.
pub fn unclassified<'a>(
    lists: &'a [PlayerListDetail],
    visible: &'a VisibleLists,
) -> impl Iterator<Item = &'a ListItem> + 'a {
    lists
        .iter()
        .filter(|l| visible.is_visible(l.id()))
        .flat_map(|l| l.items.iter())
        .filter(|item| item.stage().is_none())
}

fn average_score(entries: &[BoardEntry]) -> Option<f64> {
    let scores: Vec<f64> = entries
        .iter()
        .filter_map(|e| e.item.avg_performance_score)
        .collect();
    if scores.is_empty() {
        return None;
    }
    Some(scores.iter().sum::<f64>() / scores.len() as f64)
}
