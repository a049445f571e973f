use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::Connection;

use crate::gateway::DriveGateway;
use crate::services::classify_service::Classifier;

/// Shared application state. The SQLite connection sits behind a mutex;
/// callers take the lock for a single repository call and drop it before
/// any await point.
pub struct AppState {
    db: Mutex<Connection>,
    pub drive: Arc<dyn DriveGateway>,
    pub classifier: Arc<dyn Classifier>,
}

impl AppState {
    pub fn new(
        conn: Connection,
        drive: Arc<dyn DriveGateway>,
        classifier: Arc<dyn Classifier>,
    ) -> Self {
        Self {
            db: Mutex::new(conn),
            drive,
            classifier,
        }
    }

    pub fn db(&self) -> MutexGuard<'_, Connection> {
        match self.db.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
