//! SQLite storage for the progress engine
//!
//! ## Tables
//!
//! - `topics`, `topic_prerequisites` - topic catalog and ordered prerequisite edges
//! - `progress_records` - one ledger row per (learner, topic)
//! - `assessment_records` - append-only attempt history
//! - `study_sessions` - client-reported sessions
//! - `learning_goals` - learner goals over target topics
//!
//! Repository functions take a plain `&Connection` so they run the same way
//! inside or outside a transaction. `ProgressDb` owns the connection and
//! implements [`ProgressStore`] on top of them.

pub mod schema;
pub mod context;
pub mod models;
pub mod progress;
pub mod assessments;
pub mod topics;
pub mod sessions;
pub mod goals;
pub mod store;

use std::path::Path;
use std::sync::Mutex;

use rusqlite::Connection;
use tracing::{debug, info};

use crate::error::ProgressError;

/// SQLite database for progress tracking
pub struct ProgressDb {
    conn: Mutex<Connection>,
}

impl ProgressDb {
    /// Open or create the progress database
    pub fn open(storage_dir: &Path) -> Result<Self, ProgressError> {
        let db_path = storage_dir.join("progress.db");
        info!("Opening SQLite database at {:?}", db_path);

        let conn = Connection::open(&db_path)
            .map_err(|e| ProgressError::Storage(format!("Failed to open SQLite: {}", e)))?;

        // WAL keeps heatmap/streak reads from blocking behind ledger writes
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL; PRAGMA foreign_keys=ON;")
            .map_err(|e| ProgressError::Storage(format!("Failed to set PRAGMA: {}", e)))?;

        let db = Self {
            conn: Mutex::new(conn),
        };

        db.init_schema()?;

        Ok(db)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self, ProgressError> {
        debug!("Opening in-memory SQLite database");

        let conn = Connection::open_in_memory()
            .map_err(|e| ProgressError::Storage(format!("Failed to open in-memory SQLite: {}", e)))?;

        conn.execute_batch("PRAGMA foreign_keys=ON;")
            .map_err(|e| ProgressError::Storage(format!("Failed to set PRAGMA: {}", e)))?;

        let db = Self {
            conn: Mutex::new(conn),
        };

        db.init_schema()?;

        Ok(db)
    }

    /// Initialize database schema
    fn init_schema(&self) -> Result<(), ProgressError> {
        self.with_conn(schema::init_schema)
    }

    /// Run a read with the connection locked
    pub fn with_conn<F, T>(&self, f: F) -> Result<T, ProgressError>
    where
        F: FnOnce(&Connection) -> Result<T, ProgressError>,
    {
        let conn = self.conn.lock()
            .map_err(|e| ProgressError::Internal(format!("Lock poisoned: {}", e)))?;
        f(&conn)
    }

    /// Execute a write operation with exclusive access
    pub fn with_conn_mut<F, T>(&self, f: F) -> Result<T, ProgressError>
    where
        F: FnOnce(&mut Connection) -> Result<T, ProgressError>,
    {
        let mut conn = self.conn.lock()
            .map_err(|e| ProgressError::Internal(format!("Lock poisoned: {}", e)))?;
        f(&mut conn)
    }

    /// Get database statistics
    pub fn stats(&self) -> Result<DbStats, ProgressError> {
        self.with_conn(|conn| {
            Ok(DbStats {
                topic_count: topics::topic_count(conn)? as u64,
                progress_record_count: progress::progress_count(conn)? as u64,
                assessment_count: assessments::assessment_count(conn)? as u64,
                session_count: sessions::session_count(conn)? as u64,
            })
        })
    }
}

/// Database statistics
#[derive(Debug, Clone, serde::Serialize)]
pub struct DbStats {
    pub topic_count: u64,
    pub progress_record_count: u64,
    pub assessment_count: u64,
    pub session_count: u64,
}

// Re-exports
pub use context::LearnerContext;
pub use models::{
    AssessmentFeedback, AssessmentRecord, AssessmentType, LearningGoal, MasteryLevel, Priority,
    ProgressRecord, SortOrder, StudySession, Topic,
};
pub use store::ProgressStore;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_on_disk_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let db = ProgressDb::open(dir.path()).unwrap();
        assert!(dir.path().join("progress.db").exists());

        let stats = db.stats().unwrap();
        assert_eq!(stats.topic_count, 0);
        assert_eq!(stats.assessment_count, 0);
    }

    #[test]
    fn test_reopen_keeps_schema() {
        let dir = tempfile::tempdir().unwrap();
        drop(ProgressDb::open(dir.path()).unwrap());
        let db = ProgressDb::open(dir.path()).unwrap();
        assert_eq!(db.stats().unwrap().session_count, 0);
    }
}
