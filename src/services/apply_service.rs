use std::collections::HashMap;

use crate::data::repository;
use crate::error::AppError;
use crate::models::change_log::{ChangeLogEntry, MoveRecord};
use crate::models::drive_item::ListFilters;
use crate::models::proposal::{Proposal, ProposalStatus};
use crate::state::AppState;

/// Execute a draft proposal against the user's Drive.
///
/// Moves run strictly in proposal order and stop at the first failure.
/// Every completed move is persisted in the change log, so a partial run
/// leaves an entry holding exactly the moves that happened. Folder creation
/// is memoized per distinct name, seeded from the current folder listing.
pub async fn apply_proposal(
    state: &AppState,
    user_id: &str,
    proposal_id: &str,
) -> Result<ChangeLogEntry, AppError> {
    let proposal = {
        let conn = state.db();
        let proposal = repository::get_proposal(&conn, proposal_id, user_id)?
            .ok_or_else(|| AppError::NotFound(format!("proposal {proposal_id}")))?;
        if !repository::claim_proposal_status(
            &conn,
            proposal_id,
            ProposalStatus::Draft,
            ProposalStatus::Applying,
        )? {
            return Err(AppError::InvalidState(format!(
                "proposal {proposal_id} is {}, expected draft",
                proposal.status
            )));
        }
        proposal
    };

    let folder_ids = match ensure_folders(state, &proposal).await {
        Ok(ids) => ids,
        Err(err) => {
            // nothing moved yet when folder setup fails: hand the draft back
            restore_draft(state, proposal_id);
            return Err(err);
        }
    };

    let (records, failure) = execute_moves(state, &proposal, &folder_ids).await;
    let completed = records.len();
    let total = proposal.moves.len();
    let entry = ChangeLogEntry {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: proposal.user_id.clone(),
        proposal_id: proposal.id.clone(),
        moves: records,
        applied_at: chrono::Utc::now().to_rfc3339(),
        reverted: false,
        reverted_at: None,
        reverted_count: 0,
    };

    let persisted = {
        let conn = state.db();
        repository::insert_change_log(&conn, &entry).and_then(|_| {
            let status = if failure.is_none() {
                ProposalStatus::Applied
            } else {
                ProposalStatus::PartiallyApplied
            };
            repository::set_proposal_status(&conn, &proposal.id, status)
        })
    };
    if let Err(db_err) = persisted {
        // no move recorded means the Drive is untouched, so the proposal
        // must not stay stranded in `applying`
        if completed == 0 {
            restore_draft(state, proposal_id);
        }
        return Err(db_err);
    }

    match failure {
        None => {
            tracing::info!(
                proposal_id = %proposal.id,
                change_log_id = %entry.id,
                moves = completed,
                "proposal applied"
            );
            Ok(entry)
        }
        Some(err) => {
            tracing::warn!(
                proposal_id = %proposal.id,
                change_log_id = %entry.id,
                completed,
                total,
                error = %err,
                "apply stopped after partial progress"
            );
            Err(AppError::PartialApply {
                change_log_id: entry.id,
                completed,
                total,
                message: err.to_string(),
            })
        }
    }
}

fn restore_draft(state: &AppState, proposal_id: &str) {
    let conn = state.db();
    if let Err(err) = repository::set_proposal_status(&conn, proposal_id, ProposalStatus::Draft) {
        tracing::error!(proposal_id = %proposal_id, error = %err, "failed to hand proposal back to draft");
    }
}

/// Run the moves in proposal order, stopping at the first failure. Returns
/// the records for every completed move plus the error that stopped the run.
async fn execute_moves(
    state: &AppState,
    proposal: &Proposal,
    folder_ids: &HashMap<String, String>,
) -> (Vec<MoveRecord>, Option<AppError>) {
    let mut records: Vec<MoveRecord> = Vec::with_capacity(proposal.moves.len());
    let mut failure: Option<AppError> = None;

    for mv in &proposal.moves {
        let new_parent = match folder_ids.get(&mv.proposed_folder) {
            Some(id) => id.clone(),
            None => {
                // parse-time validation keeps destinations non-empty, so a
                // miss here means the cache and the moves disagree
                failure = Some(AppError::General(format!(
                    "no folder id for destination '{}'",
                    mv.proposed_folder
                )));
                break;
            }
        };

        let previous_parents = match state.drive.get_parents(&mv.file_id).await {
            Ok(parents) => parents,
            Err(err) => {
                failure = Some(err);
                break;
            }
        };

        if let Err(err) = state
            .drive
            .move_file(&mv.file_id, &previous_parents, &[new_parent.clone()])
            .await
        {
            failure = Some(err);
            break;
        }

        records.push(MoveRecord {
            file_id: mv.file_id.clone(),
            previous_parents,
            new_parent,
        });
    }

    (records, failure)
}

/// Resolve every destination folder name to an id, creating missing
/// folders at the Drive root. One creation per distinct name.
async fn ensure_folders(
    state: &AppState,
    proposal: &Proposal,
) -> Result<HashMap<String, String>, AppError> {
    let existing = state.drive.list_files(&ListFilters::folders_only()).await?;
    let mut folder_ids: HashMap<String, String> = HashMap::new();
    for folder in existing {
        folder_ids.entry(folder.name).or_insert(folder.id);
    }

    for mv in &proposal.moves {
        if folder_ids.contains_key(&mv.proposed_folder) {
            continue;
        }
        let id = state.drive.create_folder(&mv.proposed_folder, None).await?;
        folder_ids.insert(mv.proposed_folder.clone(), id);
    }

    Ok(folder_ids)
}
