use serde::{Deserialize, Serialize};

/// Owner-scoped filter settings consumed when building a proposal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default)]
    pub ignore_mime: Vec<String>,
    #[serde(default)]
    pub ignore_large: bool,
    #[serde(default = "default_max_file_size_mb")]
    pub max_file_size_mb: i64,
}

fn default_max_file_size_mb() -> i64 {
    100
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            ignore_mime: Vec::new(),
            ignore_large: false,
            max_file_size_mb: default_max_file_size_mb(),
        }
    }
}
