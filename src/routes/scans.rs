use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;

use crate::error::AppError;
use crate::models::drive_item::DriveFile;
use crate::models::scan::Scan;
use crate::routes::actor;
use crate::services::scan_service;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub max_results: Option<usize>,
}

pub async fn start_scan(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Scan>, AppError> {
    let user_id = actor(&headers)?;
    let scan = scan_service::start_scan(state, &user_id).await?;
    Ok(Json(scan))
}

pub async fn get_scan(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(scan_id): Path<String>,
) -> Result<Json<Scan>, AppError> {
    let user_id = actor(&headers)?;
    let scan = scan_service::get_scan(&state, &user_id, &scan_id)?;
    Ok(Json(scan))
}

pub async fn list_files(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<DriveFile>>, AppError> {
    actor(&headers)?;
    let files = scan_service::list_drive_files(&state, query.max_results).await?;
    Ok(Json(files))
}

pub async fn list_folders(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<DriveFile>>, AppError> {
    actor(&headers)?;
    let folders = scan_service::list_drive_folders(&state, query.max_results).await?;
    Ok(Json(folders))
}
