use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;

use crate::error::AppError;
use crate::models::change_log::UndoResult;
use crate::routes::actor;
use crate::services::undo_service;
use crate::state::AppState;

pub async fn undo_change(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(change_log_id): Path<String>,
) -> Result<Json<UndoResult>, AppError> {
    let user_id = actor(&headers)?;
    let result = undo_service::undo_change(&state, &user_id, &change_log_id).await?;
    Ok(Json(result))
}
