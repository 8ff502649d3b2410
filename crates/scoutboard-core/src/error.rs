// Error taxonomy for pipeline operations.
//
// Every failure a board operation can hit is folded into `PipelineError`.
// The event loop never lets one escape into the renderer: it is converted
// into a dismissible notice through `user_message()`.

use thiserror::Error;

use crate::model::{ItemId, ListId, Stage};

/// Coarse classification used for logging and for deciding how a failure is
/// presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Transport failure or unreadable response.
    Network,
    /// The server rejected the request (duplicate membership, bad input).
    Validation,
    /// The request referenced state that no longer matches the server.
    Stale,
    /// Rejected credentials. Handled by the auth layer, not here.
    Auth,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PipelineError {
    #[error("network error: {0}")]
    Transport(String),

    #[error("authentication failed (HTTP {status})")]
    Unauthorized { status: u16 },

    #[error("duplicate membership: {0}")]
    Duplicate(String),

    #[error("request rejected (HTTP {status}): {message}")]
    Validation { status: u16, message: String },

    #[error("stale state: {0}")]
    StaleState(String),

    #[error("item {item_id} is not in {stage}")]
    ItemNotInStage { item_id: ItemId, stage: Stage },

    #[error("index {index} out of range for list {list_id} with {len} items")]
    InvalidIndex {
        list_id: ListId,
        index: usize,
        len: usize,
    },

    #[error("item {item_id} and item {target_id} belong to different lists")]
    ReorderAcrossLists { item_id: ItemId, target_id: ItemId },

    #[error("failed to decode response: {0}")]
    Decode(String),

    #[error("failed to move player: {source}")]
    MoveRejected {
        #[source]
        source: Box<PipelineError>,
    },
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::Transport(_) | PipelineError::Decode(_) => ErrorKind::Network,
            PipelineError::Unauthorized { .. } => ErrorKind::Auth,
            PipelineError::Duplicate(_)
            | PipelineError::Validation { .. }
            | PipelineError::ReorderAcrossLists { .. } => ErrorKind::Validation,
            PipelineError::StaleState(_)
            | PipelineError::ItemNotInStage { .. }
            | PipelineError::InvalidIndex { .. } => ErrorKind::Stale,
            PipelineError::MoveRejected { source } => source.kind(),
        }
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, PipelineError::Duplicate(_))
    }

    /// Text shown to the user in a dismissible notice.
    pub fn user_message(&self) -> String {
        match self {
            PipelineError::Duplicate(_) => {
                "Could not add player - they may already be in this list".to_string()
            }
            PipelineError::MoveRejected { .. } => {
                "Failed to move player - they may already be in the destination stage".to_string()
            }
            PipelineError::Unauthorized { .. } => {
                "Your session has expired - please sign in again".to_string()
            }
            PipelineError::Transport(_) | PipelineError::Decode(_) => {
                "Could not reach the server - please try again".to_string()
            }
            PipelineError::StaleState(_)
            | PipelineError::ItemNotInStage { .. }
            | PipelineError::InvalidIndex { .. } => {
                "The board was out of date and has been refreshed".to_string()
            }
            PipelineError::Validation { message, .. } => format!("Request rejected: {message}"),
            PipelineError::ReorderAcrossLists { .. } => {
                "Players can only be reordered among players of the same list".to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_message_is_distinct_from_generic_failures() {
        let dup = PipelineError::Duplicate("already a member".into());
        let generic = PipelineError::Validation {
            status: 400,
            message: "bad".into(),
        };
        assert!(dup.user_message().contains("already be in this list"));
        assert_ne!(dup.user_message(), generic.user_message());
    }

    #[test]
    fn move_rejection_hides_cause_but_keeps_kind() {
        let err = PipelineError::MoveRejected {
            source: Box::new(PipelineError::StaleState("gone".into())),
        };
        assert_eq!(err.kind(), ErrorKind::Stale);
        assert!(err.user_message().starts_with("Failed to move player"));
    }

    #[test]
    fn kinds() {
        assert_eq!(PipelineError::Transport("x".into()).kind(), ErrorKind::Network);
        assert_eq!(PipelineError::Unauthorized { status: 401 }.kind(), ErrorKind::Auth);
        assert_eq!(
            PipelineError::InvalidIndex { list_id: 1, index: 9, len: 2 }.kind(),
            ErrorKind::Stale
        );
    }

    #[test]
    fn cross_list_reorder_is_a_validation_error() {
        let err = PipelineError::ReorderAcrossLists { item_id: 1, target_id: 4 };
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.to_string().contains("different lists"));
        assert!(err.user_message().contains("same list"));
    }
}
