use std::sync::Arc;

use crate::data::repository;
use crate::error::AppError;
use crate::models::drive_item::{DriveFile, ListFilters};
use crate::models::scan::{Scan, ScanStatus};
use crate::state::AppState;

/// Record a pending scan and kick off the listing in the background.
/// Returns immediately; callers poll the scan id for completion.
pub async fn start_scan(state: Arc<AppState>, user_id: &str) -> Result<Scan, AppError> {
    let scan = Scan {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        status: ScanStatus::Pending,
        file_count: 0,
        folder_count: 0,
        error_message: None,
        created_at: chrono::Utc::now().to_rfc3339(),
        completed_at: None,
    };

    {
        let conn = state.db();
        repository::insert_scan(&conn, &scan)?;
    }

    let scan_id = scan.id.clone();
    tokio::spawn(async move {
        if let Err(err) = run_scan(&state, &scan_id).await {
            tracing::error!(scan_id = %scan_id, error = %err, "scan failed");
            let conn = state.db();
            if let Err(db_err) = repository::fail_scan(&conn, &scan_id, &err.to_string()) {
                tracing::error!(scan_id = %scan_id, error = %db_err, "failed to record scan error");
            }
        }
    });

    Ok(scan)
}

async fn run_scan(state: &AppState, scan_id: &str) -> Result<(), AppError> {
    {
        let conn = state.db();
        repository::set_scan_status(&conn, scan_id, ScanStatus::Processing)?;
    }

    let files = state.drive.list_files(&ListFilters::default()).await?;
    let folder_count = files.iter().filter(|f| f.is_folder()).count() as i64;
    let file_count = files.len() as i64 - folder_count;

    let conn = state.db();
    repository::insert_snapshot_files(&conn, scan_id, &files)?;
    repository::complete_scan(
        &conn,
        scan_id,
        file_count,
        folder_count,
        &chrono::Utc::now().to_rfc3339(),
    )?;

    tracing::info!(scan_id, file_count, folder_count, "scan completed");
    Ok(())
}

/// Live browse listing straight from the gateway, everything the user can
/// see, folders included.
pub async fn list_drive_files(
    state: &AppState,
    max_results: Option<usize>,
) -> Result<Vec<DriveFile>, AppError> {
    let filters = ListFilters {
        mime_type: None,
        max_results,
    };
    state.drive.list_files(&filters).await
}

pub async fn list_drive_folders(
    state: &AppState,
    max_results: Option<usize>,
) -> Result<Vec<DriveFile>, AppError> {
    let mut filters = ListFilters::folders_only();
    filters.max_results = max_results;
    state.drive.list_files(&filters).await
}

pub fn get_scan(state: &AppState, user_id: &str, scan_id: &str) -> Result<Scan, AppError> {
    let conn = state.db();
    repository::get_scan(&conn, scan_id, user_id)?
        .ok_or_else(|| AppError::NotFound(format!("scan {scan_id}")))
}
