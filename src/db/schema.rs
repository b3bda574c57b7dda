//! Database schema definitions

use rusqlite::Connection;
use tracing::info;

use crate::error::ProgressError;

/// Current schema version for migrations
pub const SCHEMA_VERSION: i32 = 1;

/// Initialize the database schema
pub fn init_schema(conn: &Connection) -> Result<(), ProgressError> {
    let current_version = get_schema_version(conn)?;

    if current_version == 0 {
        info!("Creating new database schema v{}", SCHEMA_VERSION);
        create_tables(conn)?;
        set_schema_version(conn, SCHEMA_VERSION)?;
    } else if current_version < SCHEMA_VERSION {
        info!("Migrating schema from v{} to v{}", current_version, SCHEMA_VERSION);
        set_schema_version(conn, SCHEMA_VERSION)?;
    } else {
        info!("Database schema is up to date (v{})", current_version);
    }

    Ok(())
}

/// Get current schema version (0 if not initialized)
fn get_schema_version(conn: &Connection) -> Result<i32, ProgressError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL)",
        [],
    )
    .map_err(|e| ProgressError::Storage(format!("Failed to create schema_version table: {}", e)))?;

    let version: i32 = conn
        .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| row.get(0))
        .unwrap_or(0);

    Ok(version)
}

/// Set schema version
fn set_schema_version(conn: &Connection, version: i32) -> Result<(), ProgressError> {
    conn.execute("DELETE FROM schema_version", [])
        .map_err(|e| ProgressError::Storage(format!("Failed to clear schema_version: {}", e)))?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?)", [version])
        .map_err(|e| ProgressError::Storage(format!("Failed to set schema_version: {}", e)))?;
    Ok(())
}

/// Create all tables
fn create_tables(conn: &Connection) -> Result<(), ProgressError> {
    conn.execute_batch(TOPICS_SCHEMA)
        .map_err(|e| ProgressError::Storage(format!("Failed to create topic tables: {}", e)))?;

    conn.execute_batch(PROGRESS_SCHEMA)
        .map_err(|e| ProgressError::Storage(format!("Failed to create progress tables: {}", e)))?;

    conn.execute_batch(ACTIVITY_SCHEMA)
        .map_err(|e| ProgressError::Storage(format!("Failed to create activity tables: {}", e)))?;

    conn.execute_batch(INDEXES_SCHEMA)
        .map_err(|e| ProgressError::Storage(format!("Failed to create indexes: {}", e)))?;

    Ok(())
}

/// Topics and the prerequisite relation
const TOPICS_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS topics (
    id TEXT PRIMARY KEY NOT NULL,
    title TEXT NOT NULL,
    description TEXT,
    subject TEXT,
    difficulty_level TEXT,
    estimated_time_minutes INTEGER,
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Ordered prerequisite list; no FK on prerequisite_id since ingestion may
-- reference topics it has not delivered yet
CREATE TABLE IF NOT EXISTS topic_prerequisites (
    topic_id TEXT NOT NULL,
    position INTEGER NOT NULL,
    prerequisite_id TEXT NOT NULL,
    PRIMARY KEY (topic_id, position),
    FOREIGN KEY (topic_id) REFERENCES topics(id) ON DELETE CASCADE
);
"#;

/// Ledger and assessment log
const PROGRESS_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS progress_records (
    id TEXT PRIMARY KEY NOT NULL,
    learner_id TEXT NOT NULL,
    topic_id TEXT NOT NULL,

    mastery_level TEXT NOT NULL DEFAULT 'not_started',
    confidence_score REAL NOT NULL DEFAULT 0.0,
    time_spent_minutes INTEGER NOT NULL DEFAULT 0,

    total_attempts INTEGER NOT NULL DEFAULT 0,
    successful_attempts INTEGER NOT NULL DEFAULT 0,
    success_rate REAL NOT NULL DEFAULT 0.0,

    first_attempt_at TEXT,
    last_practice_at TEXT,
    mastery_achieved_at TEXT,

    perceived_difficulty REAL,
    engagement_level REAL,

    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,

    UNIQUE (learner_id, topic_id)
);

-- Append-only; seq orders entries created within the same instant
CREATE TABLE IF NOT EXISTS assessment_records (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    id TEXT NOT NULL UNIQUE,
    progress_record_id TEXT NOT NULL,
    assessment_type TEXT NOT NULL,
    question TEXT,
    response TEXT,
    score REAL,
    max_score REAL,
    is_correct INTEGER,
    time_taken_seconds INTEGER,
    feedback_json TEXT,
    conversation_id TEXT,
    document_id TEXT,
    created_at TEXT NOT NULL,

    FOREIGN KEY (progress_record_id) REFERENCES progress_records(id)
);
"#;

/// Sessions and goals
const ACTIVITY_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS study_sessions (
    id TEXT PRIMARY KEY NOT NULL,
    learner_id TEXT NOT NULL,
    title TEXT,
    description TEXT,
    subject TEXT,
    start_time TEXT NOT NULL,
    end_time TEXT,
    duration_minutes INTEGER,
    topics_studied_json TEXT NOT NULL DEFAULT '[]',
    documents_reviewed_json TEXT NOT NULL DEFAULT '[]',
    focus_score REAL,
    difficulty_encountered REAL,
    satisfaction REAL,
    session_goals_json TEXT NOT NULL DEFAULT '[]',
    goals_achieved_json TEXT NOT NULL DEFAULT '[]',
    notes TEXT,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS learning_goals (
    id TEXT PRIMARY KEY NOT NULL,
    learner_id TEXT NOT NULL,
    title TEXT NOT NULL,
    description TEXT,
    subject TEXT,
    target_topics_json TEXT NOT NULL,
    target_mastery_level TEXT NOT NULL DEFAULT 'mastered',
    target_date TEXT,
    priority TEXT NOT NULL DEFAULT 'medium',
    is_active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL
);
"#;

/// Index definitions for fast queries
const INDEXES_SCHEMA: &str = r#"
CREATE INDEX IF NOT EXISTS idx_topics_subject ON topics(subject);
CREATE INDEX IF NOT EXISTS idx_progress_learner ON progress_records(learner_id);
CREATE INDEX IF NOT EXISTS idx_progress_mastery ON progress_records(learner_id, mastery_level);
CREATE INDEX IF NOT EXISTS idx_assessments_progress ON assessment_records(progress_record_id, seq);
CREATE INDEX IF NOT EXISTS idx_sessions_learner_start ON study_sessions(learner_id, start_time);
CREATE INDEX IF NOT EXISTS idx_goals_learner ON learning_goals(learner_id, is_active);
"#;
