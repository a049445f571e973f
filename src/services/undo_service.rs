use crate::data::repository;
use crate::error::AppError;
use crate::models::change_log::{ChangeLogEntry, UndoResult};
use crate::models::proposal::ProposalStatus;
use crate::state::AppState;

/// Replay a change log entry in reverse, restoring every file to the
/// parents it had before the apply.
///
/// Progress is persisted as a count of reverted moves from the tail, so a
/// run that fails partway can be retried and resumes where it stopped. Only
/// one undo can hold the entry at a time, and a fully reverted entry can
/// never be claimed again.
pub async fn undo_change(
    state: &AppState,
    user_id: &str,
    change_log_id: &str,
) -> Result<UndoResult, AppError> {
    let entry = {
        let conn = state.db();
        let entry = repository::get_change_log(&conn, change_log_id, user_id)?
            .ok_or_else(|| AppError::NotFound(format!("change log {change_log_id}")))?;
        if entry.reverted {
            return Err(AppError::InvalidState(format!(
                "change log {change_log_id} is already reverted"
            )));
        }
        if !repository::claim_revert(&conn, change_log_id)? {
            return Err(AppError::InvalidState(format!(
                "undo already in progress for change log {change_log_id}"
            )));
        }
        entry
    };

    run_undo(state, &entry).await
}

async fn run_undo(state: &AppState, entry: &ChangeLogEntry) -> Result<UndoResult, AppError> {
    let total = entry.moves.len();
    let mut done = entry.reverted_count.min(total);

    // moves were applied front to back; revert back to front, skipping
    // the tail a previous run already restored
    for record in entry.moves.iter().rev().skip(done) {
        let result = state
            .drive
            .move_file(
                &record.file_id,
                std::slice::from_ref(&record.new_parent),
                &record.previous_parents,
            )
            .await;

        if let Err(err) = result {
            let conn = state.db();
            repository::release_revert(&conn, &entry.id, done)?;
            tracing::warn!(
                change_log_id = %entry.id,
                reverted = done,
                total,
                error = %err,
                "undo stopped after partial progress"
            );
            return Err(AppError::PartialUndo {
                change_log_id: entry.id.clone(),
                reverted: done,
                total,
                message: err.to_string(),
            });
        }
        done += 1;
    }

    let reverted_at = chrono::Utc::now().to_rfc3339();
    {
        let conn = state.db();
        repository::finish_revert(&conn, &entry.id, &reverted_at)?;
        repository::set_proposal_status(&conn, &entry.proposal_id, ProposalStatus::Reverted)?;
    }

    tracing::info!(
        change_log_id = %entry.id,
        proposal_id = %entry.proposal_id,
        moves = total,
        "change log reverted"
    );
    Ok(UndoResult {
        change_log_id: entry.id.clone(),
        reverted_moves: total,
        reverted_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::migrations::run_migrations;
    use crate::gateway::fake::FakeDrive;
    use crate::models::drive_item::DriveFile;
    use crate::models::preferences::Preferences;
    use crate::models::proposal::{FileMove, Proposal};
    use crate::services::apply_service::apply_proposal;
    use crate::services::classify_service::{Classifier, ClassifierOutput};
    use async_trait::async_trait;
    use rusqlite::Connection;
    use std::collections::BTreeMap;
    use std::sync::Arc;

    struct NoopClassifier;

    #[async_trait]
    impl Classifier for NoopClassifier {
        async fn classify(
            &self,
            _files: &[DriveFile],
            _preferences: &Preferences,
        ) -> Result<ClassifierOutput, AppError> {
            Ok(ClassifierOutput {
                proposed_folders: Vec::new(),
                file_moves: Vec::new(),
                reasoning: None,
            })
        }
    }

    fn file(id: &str, name: &str, parents: &[&str]) -> DriveFile {
        DriveFile {
            id: id.to_string(),
            name: name.to_string(),
            mime_type: "application/pdf".to_string(),
            size_bytes: Some(100),
            parents: parents.iter().map(|p| p.to_string()).collect(),
            created_time: None,
            modified_time: None,
        }
    }

    fn mv(file_id: &str, file_name: &str, folder: &str) -> FileMove {
        FileMove {
            file_id: file_id.to_string(),
            file_name: file_name.to_string(),
            current_parent: Some("root".to_string()),
            proposed_folder: folder.to_string(),
        }
    }

    fn setup(files: Vec<DriveFile>) -> (Arc<AppState>, Arc<FakeDrive>) {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        let drive = Arc::new(FakeDrive::with_files(files));
        let state = Arc::new(AppState::new(conn, drive.clone(), Arc::new(NoopClassifier)));
        (state, drive)
    }

    fn seed_draft(state: &AppState, user: &str, moves: Vec<FileMove>) -> Proposal {
        let mut folders = BTreeMap::new();
        for m in &moves {
            folders.insert(m.proposed_folder.clone(), String::new());
        }
        let proposal = Proposal {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user.to_string(),
            scan_id: "scan-1".to_string(),
            status: crate::models::proposal::ProposalStatus::Draft,
            folders,
            moves,
            reasoning: None,
            created_at: chrono::Utc::now().to_rfc3339(),
        };
        let conn = state.db();
        repository::insert_proposal(&conn, &proposal).unwrap();
        proposal
    }

    #[tokio::test]
    async fn test_undo_restores_original_parents() {
        // the receipts walkthrough: scatter, apply, undo, back to start
        let (state, drive) = setup(vec![
            file("r1", "receipt-jan.pdf", &["root"]),
            file("r2", "receipt-feb.pdf", &["downloads"]),
            file("r3", "receipt-mar.pdf", &["root", "shared"]),
        ]);
        let proposal = seed_draft(
            &state,
            "alice",
            vec![
                mv("r1", "receipt-jan.pdf", "Receipts"),
                mv("r2", "receipt-feb.pdf", "Receipts"),
                mv("r3", "receipt-mar.pdf", "Receipts"),
            ],
        );

        let entry = apply_proposal(&state, "alice", &proposal.id).await.unwrap();
        let receipts = drive.folder_id("Receipts").unwrap();
        assert_eq!(drive.parents_of("r1"), vec![receipts.clone()]);

        let result = undo_change(&state, "alice", &entry.id).await.unwrap();
        assert_eq!(result.reverted_moves, 3);

        assert_eq!(drive.parents_of("r1"), vec!["root"]);
        assert_eq!(drive.parents_of("r2"), vec!["downloads"]);
        assert_eq!(drive.parents_of("r3"), vec!["root", "shared"]);

        let conn = state.db();
        let fetched = repository::get_proposal(&conn, &proposal.id, "alice")
            .unwrap()
            .unwrap();
        assert_eq!(
            fetched.status,
            crate::models::proposal::ProposalStatus::Reverted
        );
    }

    #[tokio::test]
    async fn test_undo_is_single_shot() {
        let (state, _) = setup(vec![file("a", "a.pdf", &["root"])]);
        let proposal = seed_draft(&state, "alice", vec![mv("a", "a.pdf", "Receipts")]);
        let entry = apply_proposal(&state, "alice", &proposal.id).await.unwrap();

        undo_change(&state, "alice", &entry.id).await.unwrap();
        let err = undo_change(&state, "alice", &entry.id).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));
    }

    #[tokio::test]
    async fn test_partial_undo_resumes_from_persisted_progress() {
        let (state, drive) = setup(vec![
            file("a", "a.pdf", &["root"]),
            file("b", "b.pdf", &["downloads"]),
            file("c", "c.pdf", &["root"]),
        ]);
        let proposal = seed_draft(
            &state,
            "alice",
            vec![
                mv("a", "a.pdf", "Receipts"),
                mv("b", "b.pdf", "Receipts"),
                mv("c", "c.pdf", "Receipts"),
            ],
        );
        let entry = apply_proposal(&state, "alice", &proposal.id).await.unwrap();

        // undo runs tail-first: c reverts, then b fails
        drive.fail_move_for("b");
        let err = undo_change(&state, "alice", &entry.id).await.unwrap_err();
        let AppError::PartialUndo {
            reverted, total, ..
        } = err
        else {
            panic!("expected PartialUndo");
        };
        assert_eq!(reverted, 1);
        assert_eq!(total, 3);
        assert_eq!(drive.parents_of("c"), vec!["root"]);

        {
            let conn = state.db();
            let stored = repository::get_change_log(&conn, &entry.id, "alice")
                .unwrap()
                .unwrap();
            assert!(!stored.reverted);
            assert_eq!(stored.reverted_count, 1);
        }

        // retry picks up at b, leaving c alone
        drive.clear_failures();
        let result = undo_change(&state, "alice", &entry.id).await.unwrap();
        assert_eq!(result.reverted_moves, 3);
        assert_eq!(drive.parents_of("a"), vec!["root"]);
        assert_eq!(drive.parents_of("b"), vec!["downloads"]);
    }

    #[tokio::test]
    async fn test_undo_of_empty_change_log_succeeds() {
        let (state, _) = setup(Vec::new());
        let proposal = seed_draft(&state, "alice", Vec::new());
        let entry = apply_proposal(&state, "alice", &proposal.id).await.unwrap();

        let result = undo_change(&state, "alice", &entry.id).await.unwrap();
        assert_eq!(result.reverted_moves, 0);
    }

    #[tokio::test]
    async fn test_undo_unknown_entry_is_not_found() {
        let (state, _) = setup(Vec::new());
        let err = undo_change(&state, "alice", "nope").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let proposal = seed_draft(&state, "alice", Vec::new());
        let entry = apply_proposal(&state, "alice", &proposal.id).await.unwrap();
        let err = undo_change(&state, "bob", &entry.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
