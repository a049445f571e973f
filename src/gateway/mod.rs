pub mod drive;

use async_trait::async_trait;

use crate::error::AppError;
use crate::models::drive_item::{DriveFile, ListFilters};

/// Boundary to the user's Drive. Pagination and per-call retry live behind
/// this trait; callers see either a result or an `ExternalService` error.
#[async_trait]
pub trait DriveGateway: Send + Sync {
    /// Full listing matching the filters, paged internally.
    async fn list_files(&self, filters: &ListFilters) -> Result<Vec<DriveFile>, AppError>;

    /// Current parent set of a file. Read before any move: this is the
    /// undo anchor.
    async fn get_parents(&self, file_id: &str) -> Result<Vec<String>, AppError>;

    /// Reparent a file: remove it from `remove_parents`, add it to
    /// `add_parents`.
    async fn move_file(
        &self,
        file_id: &str,
        remove_parents: &[String],
        add_parents: &[String],
    ) -> Result<(), AppError>;

    /// Create a folder, optionally under a parent. Returns the new folder id.
    async fn create_folder(&self, name: &str, parent: Option<&str>) -> Result<String, AppError>;
}

#[cfg(test)]
pub(crate) mod fake {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;
    use crate::models::drive_item::FOLDER_MIME_TYPE;

    #[derive(Default)]
    struct FakeDriveState {
        files: HashMap<String, DriveFile>,
        created_folders: Vec<String>,
        fail_move_for: Option<String>,
        folder_seq: usize,
    }

    /// In-memory Drive for service tests. Moves mutate parent sets in
    /// place; a single file id can be marked to fail its move.
    #[derive(Default)]
    pub struct FakeDrive {
        state: Mutex<FakeDriveState>,
    }

    impl FakeDrive {
        pub fn with_files(files: Vec<DriveFile>) -> Self {
            let drive = Self::default();
            {
                let mut state = drive.state.lock().unwrap();
                for file in files {
                    state.files.insert(file.id.clone(), file);
                }
            }
            drive
        }

        pub fn fail_move_for(&self, file_id: &str) {
            self.state.lock().unwrap().fail_move_for = Some(file_id.to_string());
        }

        pub fn clear_failures(&self) {
            self.state.lock().unwrap().fail_move_for = None;
        }

        pub fn created_folders(&self) -> Vec<String> {
            self.state.lock().unwrap().created_folders.clone()
        }

        pub fn parents_of(&self, file_id: &str) -> Vec<String> {
            self.state
                .lock()
                .unwrap()
                .files
                .get(file_id)
                .map(|f| f.parents.clone())
                .unwrap_or_default()
        }

        pub fn folder_id(&self, name: &str) -> Option<String> {
            self.state
                .lock()
                .unwrap()
                .files
                .values()
                .find(|f| f.is_folder() && f.name == name)
                .map(|f| f.id.clone())
        }
    }

    #[async_trait]
    impl DriveGateway for FakeDrive {
        async fn list_files(&self, filters: &ListFilters) -> Result<Vec<DriveFile>, AppError> {
            let state = self.state.lock().unwrap();
            let mut files: Vec<DriveFile> = state
                .files
                .values()
                .filter(|f| {
                    filters
                        .mime_type
                        .as_deref()
                        .map_or(true, |mime| f.mime_type == mime)
                })
                .cloned()
                .collect();
            files.sort_by(|a, b| a.id.cmp(&b.id));
            if let Some(max) = filters.max_results {
                files.truncate(max);
            }
            Ok(files)
        }

        async fn get_parents(&self, file_id: &str) -> Result<Vec<String>, AppError> {
            self.state
                .lock()
                .unwrap()
                .files
                .get(file_id)
                .map(|f| f.parents.clone())
                .ok_or_else(|| {
                    AppError::external("drive", Some(404), format!("file {file_id} not found"))
                })
        }

        async fn move_file(
            &self,
            file_id: &str,
            remove_parents: &[String],
            add_parents: &[String],
        ) -> Result<(), AppError> {
            let mut state = self.state.lock().unwrap();
            if state.fail_move_for.as_deref() == Some(file_id) {
                return Err(AppError::external(
                    "drive",
                    Some(500),
                    format!("injected move failure for {file_id}"),
                ));
            }
            let file = state.files.get_mut(file_id).ok_or_else(|| {
                AppError::external("drive", Some(404), format!("file {file_id} not found"))
            })?;
            file.parents.retain(|p| !remove_parents.contains(p));
            for parent in add_parents {
                if !file.parents.contains(parent) {
                    file.parents.push(parent.clone());
                }
            }
            Ok(())
        }

        async fn create_folder(
            &self,
            name: &str,
            parent: Option<&str>,
        ) -> Result<String, AppError> {
            let mut state = self.state.lock().unwrap();
            state.folder_seq += 1;
            let id = format!("folder-{}", state.folder_seq);
            state.created_folders.push(name.to_string());
            state.files.insert(
                id.clone(),
                DriveFile {
                    id: id.clone(),
                    name: name.to_string(),
                    mime_type: FOLDER_MIME_TYPE.to_string(),
                    size_bytes: None,
                    parents: parent.map(|p| vec![p.to_string()]).unwrap_or_default(),
                    created_time: None,
                    modified_time: None,
                },
            );
            Ok(id)
        }
    }
}
