use std::collections::BTreeMap;

use crate::data::repository;
use crate::error::AppError;
use crate::models::preferences::Preferences;
use crate::models::proposal::{Proposal, ProposalStatus};
use crate::models::scan::ScanStatus;
use crate::services::classify_service::{
    self, ClassifierOutput, MAX_CLASSIFIER_FILES,
};
use crate::state::AppState;

/// Build a draft proposal from a completed scan: filter the snapshot by the
/// owner's preferences, run the classifier, persist the result.
pub async fn create_proposal(
    state: &AppState,
    user_id: &str,
    scan_id: &str,
) -> Result<Proposal, AppError> {
    let (snapshot, prefs) = {
        let conn = state.db();
        let scan = repository::get_scan(&conn, scan_id, user_id)?
            .ok_or_else(|| AppError::NotFound(format!("scan {scan_id}")))?;
        if scan.status != ScanStatus::Completed {
            return Err(AppError::InvalidState(format!(
                "scan {scan_id} is {}, expected completed",
                scan.status
            )));
        }
        let snapshot = repository::list_snapshot_files(&conn, scan_id)?;
        let prefs = repository::get_preferences(&conn, user_id)?.unwrap_or_default();
        (snapshot, prefs)
    };

    let candidates = classify_service::filter_files(&snapshot, &prefs);
    let candidates = classify_service::summarize_large_file_list(candidates, MAX_CLASSIFIER_FILES);

    let output = if candidates.is_empty() {
        tracing::info!(scan_id, "no classifiable files, producing empty proposal");
        ClassifierOutput {
            proposed_folders: Vec::new(),
            file_moves: Vec::new(),
            reasoning: None,
        }
    } else {
        state.classifier.classify(&candidates, &prefs).await?
    };

    let folders: BTreeMap<String, String> = output
        .proposed_folders
        .into_iter()
        .map(|f| (f.name, f.description))
        .collect();

    let proposal = Proposal {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        scan_id: scan_id.to_string(),
        status: ProposalStatus::Draft,
        folders,
        moves: output.file_moves,
        reasoning: output.reasoning,
        created_at: chrono::Utc::now().to_rfc3339(),
    };

    {
        let conn = state.db();
        repository::insert_proposal(&conn, &proposal)?;
    }

    tracing::info!(
        proposal_id = %proposal.id,
        scan_id,
        moves = proposal.moves.len(),
        "draft proposal created"
    );
    Ok(proposal)
}

pub fn get_proposal(
    state: &AppState,
    user_id: &str,
    proposal_id: &str,
) -> Result<Proposal, AppError> {
    let conn = state.db();
    repository::get_proposal(&conn, proposal_id, user_id)?
        .ok_or_else(|| AppError::NotFound(format!("proposal {proposal_id}")))
}

pub fn list_proposals(state: &AppState, user_id: &str) -> Result<Vec<Proposal>, AppError> {
    let conn = state.db();
    repository::list_proposals(&conn, user_id)
}

pub fn get_preferences(state: &AppState, user_id: &str) -> Result<Preferences, AppError> {
    let conn = state.db();
    Ok(repository::get_preferences(&conn, user_id)?.unwrap_or_default())
}

pub fn update_preferences(
    state: &AppState,
    user_id: &str,
    prefs: &Preferences,
) -> Result<(), AppError> {
    let conn = state.db();
    repository::upsert_preferences(&conn, user_id, prefs)
}
