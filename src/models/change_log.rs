use serde::{Deserialize, Serialize};

/// One executed move, recorded in application order. Knowing only the
/// previous and new parents is sufficient to invert it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRecord {
    pub file_id: String,
    pub previous_parents: Vec<String>,
    pub new_parent: String,
}

/// The reversible record produced when a proposal is applied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeLogEntry {
    pub id: String,
    pub user_id: String,
    pub proposal_id: String,
    pub moves: Vec<MoveRecord>,
    pub applied_at: String,
    pub reverted: bool,
    pub reverted_at: Option<String>,
    /// Number of moves already reverted, counted from the tail of `moves`.
    pub reverted_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct UndoResult {
    pub change_log_id: String,
    pub reverted_moves: usize,
    pub reverted_at: String,
}
