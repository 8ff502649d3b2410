// Lists, list memberships, pipeline stages, and the request/response shapes
// exchanged with the player-lists API.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::PlayerIdentity;

pub type ListId = i64;
pub type ItemId = i64;

// ---------------------------------------------------------------------------
// Pipeline stages
// ---------------------------------------------------------------------------

/// One of the four fixed pipeline stages a membership can sit in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Stage {
    #[serde(rename = "Stage 1")]
    One,
    #[serde(rename = "Stage 2")]
    Two,
    #[serde(rename = "Stage 3")]
    Three,
    #[serde(rename = "Stage 4")]
    Four,
}

impl Stage {
    /// All stages in board order.
    pub const ALL: [Stage; 4] = [Stage::One, Stage::Two, Stage::Three, Stage::Four];

    /// The wire/display name, e.g. "Stage 2".
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::One => "Stage 1",
            Stage::Two => "Stage 2",
            Stage::Three => "Stage 3",
            Stage::Four => "Stage 4",
        }
    }

    /// Column index on the board (0..4).
    pub fn index(&self) -> usize {
        match self {
            Stage::One => 0,
            Stage::Two => 1,
            Stage::Three => 2,
            Stage::Four => 3,
        }
    }

    /// Recognize a raw stage value. Anything other than the four stage names
    /// (archived, legacy labels, typos) yields `None`.
    pub fn parse(raw: &str) -> Option<Stage> {
        Stage::ALL.into_iter().find(|s| s.as_str() == raw)
    }

    /// Stage from its 1-based number.
    pub fn from_number(n: u8) -> Option<Stage> {
        match n {
            1 => Some(Stage::One),
            2 => Some(Stage::Two),
            3 => Some(Stage::Three),
            4 => Some(Stage::Four),
            _ => None,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Lists and memberships
// ---------------------------------------------------------------------------

/// A named, user-owned collection of player memberships.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerList {
    pub id: ListId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub owner: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Display fields of a player. Never used to decide identity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerProfile {
    pub player_name: String,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub squad_name: Option<String>,
    #[serde(default)]
    pub age: Option<u32>,
}

/// A player's membership in one list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListItem {
    pub item_id: ItemId,
    pub list_id: ListId,
    #[serde(rename = "universal_id")]
    pub player_identity: PlayerIdentity,
    pub display_order: u32,
    /// Raw stage value as stored upstream. See [`ListItem::stage`].
    pub stage: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub added_by: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub profile: PlayerProfile,
    #[serde(default)]
    pub avg_performance_score: Option<f64>,
    #[serde(default)]
    pub report_count: u32,
}

impl ListItem {
    /// A fresh membership sitting in Stage 1.
    pub fn new(
        item_id: ItemId,
        list_id: ListId,
        player_identity: PlayerIdentity,
        profile: PlayerProfile,
        display_order: u32,
    ) -> Self {
        ListItem {
            item_id,
            list_id,
            player_identity,
            display_order,
            stage: Stage::One.as_str().to_string(),
            notes: None,
            added_by: None,
            created_at: Utc::now(),
            profile,
            avg_performance_score: None,
            report_count: 0,
        }
    }

    /// The recognized pipeline stage, or `None` for values outside the four
    /// board stages.
    pub fn stage(&self) -> Option<Stage> {
        Stage::parse(&self.stage)
    }

    pub fn player_name(&self) -> &str {
        &self.profile.player_name
    }
}

/// A list together with its member items, as returned by the detail endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerListDetail {
    #[serde(flatten)]
    pub list: PlayerList,
    #[serde(default)]
    pub items: Vec<ListItem>,
}

impl PlayerListDetail {
    pub fn id(&self) -> ListId {
        self.list.id
    }

    pub fn name(&self) -> &str {
        &self.list.name
    }
}

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewList {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Body of `POST /player-lists/{id}/players`.
///
/// Exactly one of the two id fields is populated; which one is decided by the
/// identity space of the player being added.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddPlayerRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub internal_player_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl AddPlayerRequest {
    pub fn for_identity(identity: PlayerIdentity) -> Self {
        let (player_id, internal_player_id) = match identity {
            PlayerIdentity::External(id) => (Some(id), None),
            PlayerIdentity::Internal(id) => (None, Some(id)),
        };
        AddPlayerRequest {
            player_id,
            internal_player_id,
            notes: None,
        }
    }

    /// Recover the identity carried by the request, if exactly one id field
    /// is set.
    pub fn identity(&self) -> Option<PlayerIdentity> {
        match (self.player_id, self.internal_player_id) {
            (Some(id), None) => Some(PlayerIdentity::External(id)),
            (None, Some(id)) => Some(PlayerIdentity::Internal(id)),
            _ => None,
        }
    }
}

/// Body of `PUT /player-lists/{id}/players/{item_id}/stage`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageUpdate {
    pub stage: Stage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemOrder {
    pub item_id: ItemId,
    pub display_order: u32,
}

/// Body of `PUT /player-lists/{id}/reorder`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReorderRequest {
    pub item_orders: Vec<ItemOrder>,
}

/// One candidate returned by `GET /players/search`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSearchResult {
    #[serde(rename = "universal_id")]
    pub identity: PlayerIdentity,
    #[serde(flatten)]
    pub profile: PlayerProfile,
}
