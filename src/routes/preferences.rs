use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;

use crate::error::AppError;
use crate::models::preferences::Preferences;
use crate::routes::actor;
use crate::services::proposal_service;
use crate::state::AppState;

pub async fn get_preferences(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Preferences>, AppError> {
    let user_id = actor(&headers)?;
    let prefs = proposal_service::get_preferences(&state, &user_id)?;
    Ok(Json(prefs))
}

pub async fn update_preferences(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(prefs): Json<Preferences>,
) -> Result<Json<Preferences>, AppError> {
    let user_id = actor(&headers)?;
    proposal_service::update_preferences(&state, &user_id, &prefs)?;
    Ok(Json(prefs))
}
