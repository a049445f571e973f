use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;

use crate::error::AppError;
use crate::models::change_log::ChangeLogEntry;
use crate::models::proposal::Proposal;
use crate::routes::actor;
use crate::services::{apply_service, proposal_service};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateProposalRequest {
    pub scan_id: String,
}

pub async fn create_proposal(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<CreateProposalRequest>,
) -> Result<Json<Proposal>, AppError> {
    let user_id = actor(&headers)?;
    let proposal = proposal_service::create_proposal(&state, &user_id, &request.scan_id).await?;
    Ok(Json(proposal))
}

pub async fn list_proposals(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<Proposal>>, AppError> {
    let user_id = actor(&headers)?;
    let proposals = proposal_service::list_proposals(&state, &user_id)?;
    Ok(Json(proposals))
}

pub async fn get_proposal(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(proposal_id): Path<String>,
) -> Result<Json<Proposal>, AppError> {
    let user_id = actor(&headers)?;
    let proposal = proposal_service::get_proposal(&state, &user_id, &proposal_id)?;
    Ok(Json(proposal))
}

pub async fn apply_proposal(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(proposal_id): Path<String>,
) -> Result<Json<ChangeLogEntry>, AppError> {
    let user_id = actor(&headers)?;
    let entry = apply_service::apply_proposal(&state, &user_id, &proposal_id).await?;
    Ok(Json(entry))
}
