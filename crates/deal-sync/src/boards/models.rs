//! Trello entities and the fixed layout of a project board.

use serde::{Deserialize, Serialize};

/// Lists created on every new project board, in creation order.
pub const PROJECT_LISTS: [&str; 3] = ["To_Do", "In_Progress", "Done"];

/// The list that receives the starter cards.
pub const STARTER_LIST: &str = "To_Do";

/// Cards seeded into [`STARTER_LIST`].
pub const STARTER_CARDS: [&str; 3] = [
    "Kickoff Meeting Scheduled",
    "Requirements Gathering",
    "System Setup",
];

/// Trello board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// Trello list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardList {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub id_board: Option<String>,
}

/// A list created on a new board, with the number of cards seeded into it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedList {
    pub list: BoardList,
    pub cards_created: usize,
}

/// Result of asking for a project board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisionOutcome {
    /// A board with that name already existed; nothing was created.
    AlreadyExists { board_id: String },
    /// A new board was created and seeded.
    Created {
        board: Board,
        lists_created: usize,
        cards_created: usize,
    },
}

impl ProvisionOutcome {
    /// Id of the board the outcome refers to.
    #[must_use]
    pub fn board_id(&self) -> &str {
        match self {
            Self::AlreadyExists { board_id } => board_id,
            Self::Created { board, .. } => &board.id,
        }
    }

    /// Whether a board was created by this call.
    #[must_use]
    pub fn is_created(&self) -> bool {
        matches!(self, Self::Created { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_board_id() {
        let existing = ProvisionOutcome::AlreadyExists {
            board_id: "b1".to_string(),
        };
        assert_eq!(existing.board_id(), "b1");
        assert!(!existing.is_created());

        let created = ProvisionOutcome::Created {
            board: Board {
                id: "b2".to_string(),
                name: "Acme Board".to_string(),
            },
            lists_created: 3,
            cards_created: 3,
        };
        assert_eq!(created.board_id(), "b2");
        assert!(created.is_created());
    }

    #[test]
    fn test_list_deserializes_trello_shape() {
        let list: BoardList = serde_json::from_str(
            r#"{"id":"l1","name":"To_Do","idBoard":"b1","closed":false,"pos":16384}"#,
        )
        .unwrap();
        assert_eq!(list.id_board.as_deref(), Some("b1"));
    }

    #[test]
    fn test_starter_list_is_a_project_list() {
        assert!(PROJECT_LISTS.contains(&STARTER_LIST));
    }
}
