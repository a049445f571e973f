use rusqlite::{params, Connection, OptionalExtension};

use crate::error::AppError;
use crate::models::change_log::{ChangeLogEntry, MoveRecord};
use crate::models::drive_item::DriveFile;
use crate::models::preferences::Preferences;
use crate::models::proposal::{Proposal, ProposalStatus};
use crate::models::scan::{Scan, ScanStatus};

// --- scans ---

pub fn insert_scan(conn: &Connection, scan: &Scan) -> Result<(), AppError> {
    conn.execute(
        "INSERT INTO scans (id, user_id, status, file_count, folder_count, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            scan.id,
            scan.user_id,
            scan.status.to_string(),
            scan.file_count,
            scan.folder_count,
            scan.created_at,
        ],
    )?;
    Ok(())
}

pub fn get_scan(conn: &Connection, id: &str, user_id: &str) -> Result<Option<Scan>, AppError> {
    let scan = conn
        .prepare(
            "SELECT id, user_id, status, file_count, folder_count, error_message, created_at, completed_at
             FROM scans WHERE id = ?1 AND user_id = ?2",
        )?
        .query_row(params![id, user_id], |row| {
            let status: String = row.get(2)?;
            Ok(Scan {
                id: row.get(0)?,
                user_id: row.get(1)?,
                status: status.parse::<ScanStatus>().unwrap_or(ScanStatus::Error),
                file_count: row.get(3)?,
                folder_count: row.get(4)?,
                error_message: row.get(5)?,
                created_at: row.get(6)?,
                completed_at: row.get(7)?,
            })
        })
        .optional()?;
    Ok(scan)
}

pub fn set_scan_status(conn: &Connection, id: &str, status: ScanStatus) -> Result<(), AppError> {
    conn.execute(
        "UPDATE scans SET status = ?2 WHERE id = ?1",
        params![id, status.to_string()],
    )?;
    Ok(())
}

pub fn complete_scan(
    conn: &Connection,
    id: &str,
    file_count: i64,
    folder_count: i64,
    completed_at: &str,
) -> Result<(), AppError> {
    conn.execute(
        "UPDATE scans SET status = 'completed', file_count = ?2, folder_count = ?3, completed_at = ?4
         WHERE id = ?1",
        params![id, file_count, folder_count, completed_at],
    )?;
    Ok(())
}

pub fn fail_scan(conn: &Connection, id: &str, message: &str) -> Result<(), AppError> {
    conn.execute(
        "UPDATE scans SET status = 'error', error_message = ?2 WHERE id = ?1",
        params![id, message],
    )?;
    Ok(())
}

pub fn insert_snapshot_files(
    conn: &Connection,
    scan_id: &str,
    files: &[DriveFile],
) -> Result<(), AppError> {
    let mut stmt = conn.prepare(
        "INSERT INTO snapshot_files (scan_id, file_id, name, mime_type, size_bytes, parents, created_time, modified_time)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
    )?;
    for file in files {
        let parents_json = serde_json::to_string(&file.parents)?;
        stmt.execute(params![
            scan_id,
            file.id,
            file.name,
            file.mime_type,
            file.size_bytes,
            parents_json,
            file.created_time,
            file.modified_time,
        ])?;
    }
    Ok(())
}

pub fn list_snapshot_files(conn: &Connection, scan_id: &str) -> Result<Vec<DriveFile>, AppError> {
    let mut stmt = conn.prepare(
        "SELECT file_id, name, mime_type, size_bytes, parents, created_time, modified_time
         FROM snapshot_files WHERE scan_id = ?1 ORDER BY id ASC",
    )?;

    let files = stmt
        .query_map(params![scan_id], |row| {
            let parents_json: String = row.get(4)?;
            Ok(DriveFile {
                id: row.get(0)?,
                name: row.get(1)?,
                mime_type: row.get(2)?,
                size_bytes: row.get(3)?,
                parents: serde_json::from_str(&parents_json).unwrap_or_default(),
                created_time: row.get(5)?,
                modified_time: row.get(6)?,
            })
        })?
        .filter_map(|r| r.ok())
        .collect();

    Ok(files)
}

// --- proposals ---

pub fn insert_proposal(conn: &Connection, proposal: &Proposal) -> Result<(), AppError> {
    let folders_json = serde_json::to_string(&proposal.folders)?;
    let moves_json = serde_json::to_string(&proposal.moves)?;
    conn.execute(
        "INSERT INTO proposals (id, user_id, scan_id, status, folders, moves, reasoning, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            proposal.id,
            proposal.user_id,
            proposal.scan_id,
            proposal.status.to_string(),
            folders_json,
            moves_json,
            proposal.reasoning,
            proposal.created_at,
        ],
    )?;
    Ok(())
}

fn proposal_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Proposal> {
    let status: String = row.get(3)?;
    let folders_json: String = row.get(4)?;
    let moves_json: String = row.get(5)?;
    Ok(Proposal {
        id: row.get(0)?,
        user_id: row.get(1)?,
        scan_id: row.get(2)?,
        status: status
            .parse::<ProposalStatus>()
            .unwrap_or(ProposalStatus::Draft),
        folders: serde_json::from_str(&folders_json).unwrap_or_default(),
        moves: serde_json::from_str(&moves_json).unwrap_or_default(),
        reasoning: row.get(6)?,
        created_at: row.get(7)?,
    })
}

pub fn get_proposal(
    conn: &Connection,
    id: &str,
    user_id: &str,
) -> Result<Option<Proposal>, AppError> {
    let proposal = conn
        .prepare(
            "SELECT id, user_id, scan_id, status, folders, moves, reasoning, created_at
             FROM proposals WHERE id = ?1 AND user_id = ?2",
        )?
        .query_row(params![id, user_id], proposal_from_row)
        .optional()?;
    Ok(proposal)
}

pub fn list_proposals(conn: &Connection, user_id: &str) -> Result<Vec<Proposal>, AppError> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, scan_id, status, folders, moves, reasoning, created_at
         FROM proposals WHERE user_id = ?1 ORDER BY created_at DESC",
    )?;
    let proposals = stmt
        .query_map(params![user_id], proposal_from_row)?
        .filter_map(|r| r.ok())
        .collect();
    Ok(proposals)
}

/// Atomic status-transition guard: succeeds only if the proposal is still in
/// `from`, so at most one concurrent caller wins the transition.
pub fn claim_proposal_status(
    conn: &Connection,
    id: &str,
    from: ProposalStatus,
    to: ProposalStatus,
) -> Result<bool, AppError> {
    let count = conn.execute(
        "UPDATE proposals SET status = ?3 WHERE id = ?1 AND status = ?2",
        params![id, from.to_string(), to.to_string()],
    )?;
    Ok(count == 1)
}

pub fn set_proposal_status(
    conn: &Connection,
    id: &str,
    status: ProposalStatus,
) -> Result<(), AppError> {
    conn.execute(
        "UPDATE proposals SET status = ?2 WHERE id = ?1",
        params![id, status.to_string()],
    )?;
    Ok(())
}

// --- change log ---

pub fn insert_change_log(conn: &Connection, entry: &ChangeLogEntry) -> Result<(), AppError> {
    let moves_json = serde_json::to_string(&entry.moves)?;
    conn.execute(
        "INSERT INTO change_log (id, user_id, proposal_id, moves, applied_at, reverted, reverted_count)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            entry.id,
            entry.user_id,
            entry.proposal_id,
            moves_json,
            entry.applied_at,
            entry.reverted,
            entry.reverted_count as i64,
        ],
    )?;
    Ok(())
}

pub fn get_change_log(
    conn: &Connection,
    id: &str,
    user_id: &str,
) -> Result<Option<ChangeLogEntry>, AppError> {
    let entry = conn
        .prepare(
            "SELECT id, user_id, proposal_id, moves, applied_at, reverted, reverted_at, reverted_count
             FROM change_log WHERE id = ?1 AND user_id = ?2",
        )?
        .query_row(params![id, user_id], |row| {
            let moves_json: String = row.get(3)?;
            let moves: Vec<MoveRecord> = serde_json::from_str(&moves_json).unwrap_or_default();
            let reverted_count: i64 = row.get(7)?;
            Ok(ChangeLogEntry {
                id: row.get(0)?,
                user_id: row.get(1)?,
                proposal_id: row.get(2)?,
                moves,
                applied_at: row.get(4)?,
                reverted: row.get(5)?,
                reverted_at: row.get(6)?,
                reverted_count: reverted_count.max(0) as usize,
            })
        })
        .optional()?;
    Ok(entry)
}

/// Claim exclusive undo rights on an entry. Fails if the entry is already
/// reverted or another undo is in flight.
pub fn claim_revert(conn: &Connection, id: &str) -> Result<bool, AppError> {
    let count = conn.execute(
        "UPDATE change_log SET reverting = 1 WHERE id = ?1 AND reverted = 0 AND reverting = 0",
        params![id],
    )?;
    Ok(count == 1)
}

/// Release the undo claim after a partial run, persisting how far it got.
pub fn release_revert(conn: &Connection, id: &str, reverted_count: usize) -> Result<(), AppError> {
    conn.execute(
        "UPDATE change_log SET reverting = 0, reverted_count = ?2 WHERE id = ?1",
        params![id, reverted_count as i64],
    )?;
    Ok(())
}

pub fn finish_revert(conn: &Connection, id: &str, reverted_at: &str) -> Result<(), AppError> {
    conn.execute(
        "UPDATE change_log
         SET reverting = 0, reverted = 1, reverted_at = ?2,
             reverted_count = (SELECT COUNT(*) FROM json_each(change_log.moves))
         WHERE id = ?1",
        params![id, reverted_at],
    )?;
    Ok(())
}

// --- preferences ---

pub fn get_preferences(
    conn: &Connection,
    user_id: &str,
) -> Result<Option<Preferences>, AppError> {
    let prefs = conn
        .prepare(
            "SELECT ignore_mime, ignore_large, max_file_size_mb
             FROM preferences WHERE user_id = ?1",
        )?
        .query_row(params![user_id], |row| {
            let ignore_mime_json: String = row.get(0)?;
            Ok(Preferences {
                ignore_mime: serde_json::from_str(&ignore_mime_json).unwrap_or_default(),
                ignore_large: row.get(1)?,
                max_file_size_mb: row.get(2)?,
            })
        })
        .optional()?;
    Ok(prefs)
}

pub fn upsert_preferences(
    conn: &Connection,
    user_id: &str,
    prefs: &Preferences,
) -> Result<(), AppError> {
    let ignore_mime_json = serde_json::to_string(&prefs.ignore_mime)?;
    conn.execute(
        "INSERT INTO preferences (user_id, ignore_mime, ignore_large, max_file_size_mb, updated_at)
         VALUES (?1, ?2, ?3, ?4, CURRENT_TIMESTAMP)
         ON CONFLICT(user_id) DO UPDATE SET
             ignore_mime = excluded.ignore_mime,
             ignore_large = excluded.ignore_large,
             max_file_size_mb = excluded.max_file_size_mb,
             updated_at = CURRENT_TIMESTAMP",
        params![
            user_id,
            ignore_mime_json,
            prefs.ignore_large,
            prefs.max_file_size_mb,
        ],
    )?;
    Ok(())
}
