use serde::{Deserialize, Serialize};

pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

/// One entry from a Drive listing, as stored in a scan snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriveFile {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub size_bytes: Option<i64>,
    #[serde(default)]
    pub parents: Vec<String>,
    #[serde(default)]
    pub created_time: Option<String>,
    #[serde(default)]
    pub modified_time: Option<String>,
}

impl DriveFile {
    pub fn is_folder(&self) -> bool {
        self.mime_type == FOLDER_MIME_TYPE
    }
}

/// Filters for a gateway listing call.
#[derive(Debug, Clone, Default)]
pub struct ListFilters {
    /// Restrict the listing to a single MIME type (e.g. folders only).
    pub mime_type: Option<String>,
    /// Upper bound on the number of entries fetched across pages.
    pub max_results: Option<usize>,
}

impl ListFilters {
    pub fn folders_only() -> Self {
        Self {
            mime_type: Some(FOLDER_MIME_TYPE.to_string()),
            max_results: None,
        }
    }
}
