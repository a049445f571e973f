pub mod preferences;
pub mod proposals;
pub mod scans;
pub mod undo;

use std::sync::Arc;

use axum::http::HeaderMap;
use axum::routing::{get, post, put};
use axum::Router;

use crate::error::AppError;
use crate::state::AppState;

/// Caller identity, established by the auth layer in front of this
/// service and forwarded as a header.
const USER_ID_HEADER: &str = "x-user-id";

pub(crate) fn actor(headers: &HeaderMap) -> Result<String, AppError> {
    headers
        .get(USER_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .ok_or(AppError::Unauthorized)
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/drive/scan", post(scans::start_scan))
        .route("/api/drive/scan/status/:scan_id", get(scans::get_scan))
        .route("/api/drive/files", get(scans::list_files))
        .route("/api/drive/folders", get(scans::list_folders))
        .route("/propose", post(proposals::create_proposal))
        .route("/proposals", get(proposals::list_proposals))
        .route("/proposals/:proposal_id", get(proposals::get_proposal))
        .route("/proposals/:proposal_id/apply", post(proposals::apply_proposal))
        .route("/undo/:change_log_id", post(undo::undo_change))
        .route("/preferences", get(preferences::get_preferences))
        .route("/preferences", put(preferences::update_preferences))
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}
