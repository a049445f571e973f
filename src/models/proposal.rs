use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalStatus {
    Draft,
    Applying,
    Applied,
    PartiallyApplied,
    Reverted,
}

impl std::fmt::Display for ProposalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Draft => write!(f, "draft"),
            Self::Applying => write!(f, "applying"),
            Self::Applied => write!(f, "applied"),
            Self::PartiallyApplied => write!(f, "partially_applied"),
            Self::Reverted => write!(f, "reverted"),
        }
    }
}

impl std::str::FromStr for ProposalStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(Self::Draft),
            "applying" => Ok(Self::Applying),
            "applied" => Ok(Self::Applied),
            "partially_applied" => Ok(Self::PartiallyApplied),
            "reverted" => Ok(Self::Reverted),
            _ => Err(format!("unknown proposal status: {s}")),
        }
    }
}

/// One file-move intent inside a proposal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileMove {
    pub file_id: String,
    pub file_name: String,
    pub current_parent: Option<String>,
    pub proposed_folder: String,
}

/// Classifier output tied to one scan, persisted immutably as a draft.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Proposal {
    pub id: String,
    pub user_id: String,
    pub scan_id: String,
    pub status: ProposalStatus,
    /// Proposed folder name -> description.
    pub folders: BTreeMap<String, String>,
    pub moves: Vec<FileMove>,
    pub reasoning: Option<String>,
    pub created_at: String,
}
