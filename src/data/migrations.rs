use rusqlite::Connection;

use crate::error::AppError;

const SCHEMA_V1: &str = "
CREATE TABLE IF NOT EXISTS scans (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'pending',
    file_count INTEGER NOT NULL DEFAULT 0,
    folder_count INTEGER NOT NULL DEFAULT 0,
    error_message TEXT,
    created_at TEXT DEFAULT CURRENT_TIMESTAMP,
    completed_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_scans_user ON scans(user_id, created_at DESC);

CREATE TABLE IF NOT EXISTS snapshot_files (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    scan_id TEXT NOT NULL,
    file_id TEXT NOT NULL,
    name TEXT NOT NULL,
    mime_type TEXT NOT NULL DEFAULT '',
    size_bytes INTEGER,
    parents TEXT NOT NULL DEFAULT '[]',
    created_time TEXT,
    modified_time TEXT
);

CREATE INDEX IF NOT EXISTS idx_snapshot_scan ON snapshot_files(scan_id);

CREATE TABLE IF NOT EXISTS proposals (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    scan_id TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'draft',
    folders TEXT NOT NULL DEFAULT '{}',
    moves TEXT NOT NULL DEFAULT '[]',
    reasoning TEXT,
    created_at TEXT DEFAULT CURRENT_TIMESTAMP
);

CREATE INDEX IF NOT EXISTS idx_proposals_user ON proposals(user_id, created_at DESC);

CREATE TABLE IF NOT EXISTS change_log (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    proposal_id TEXT NOT NULL,
    moves TEXT NOT NULL DEFAULT '[]',
    applied_at TEXT DEFAULT CURRENT_TIMESTAMP,
    reverted BOOLEAN NOT NULL DEFAULT 0,
    reverted_at TEXT,
    reverting BOOLEAN NOT NULL DEFAULT 0,
    reverted_count INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_change_log_user ON change_log(user_id, applied_at DESC);

CREATE TABLE IF NOT EXISTS preferences (
    user_id TEXT PRIMARY KEY,
    ignore_mime TEXT NOT NULL DEFAULT '[]',
    ignore_large BOOLEAN NOT NULL DEFAULT 0,
    max_file_size_mb INTEGER NOT NULL DEFAULT 100,
    updated_at TEXT DEFAULT CURRENT_TIMESTAMP
);
";

pub fn run_migrations(conn: &Connection) -> Result<(), AppError> {
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;
    conn.execute_batch(SCHEMA_V1)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migration_creates_tables() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .filter_map(|r| r.ok())
            .collect();

        assert!(tables.contains(&"scans".to_string()));
        assert!(tables.contains(&"snapshot_files".to_string()));
        assert!(tables.contains(&"proposals".to_string()));
        assert!(tables.contains(&"change_log".to_string()));
        assert!(tables.contains(&"preferences".to_string()));
    }

    #[test]
    fn test_migration_enables_wal() {
        let dir = tempfile::tempdir().unwrap();
        let conn = Connection::open(dir.path().join("test.db")).unwrap();
        run_migrations(&conn).unwrap();

        let mode: String = conn
            .query_row("PRAGMA journal_mode", [], |row| row.get(0))
            .unwrap();
        assert_eq!(mode, "wal");
    }

    #[test]
    fn test_migration_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap(); // should not error
    }
}
