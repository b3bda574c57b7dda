//! Study session persistence

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};

use super::models::StudySession;
use crate::error::ProgressError;

const SESSION_COLUMNS: &str = "id, learner_id, title, description, subject, start_time, end_time,
    duration_minutes, topics_studied_json, documents_reviewed_json, focus_score,
    difficulty_encountered, satisfaction, session_goals_json, goals_achieved_json, notes, created_at";

fn json_list(row: &Row<'_>, idx: usize) -> rusqlite::Result<Vec<String>> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn row_to_session(row: &Row<'_>) -> rusqlite::Result<StudySession> {
    Ok(StudySession {
        id: row.get(0)?,
        learner_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        subject: row.get(4)?,
        start_time: row.get(5)?,
        end_time: row.get(6)?,
        duration_minutes: row.get(7)?,
        topics_studied: json_list(row, 8)?,
        documents_reviewed: json_list(row, 9)?,
        focus_score: row.get(10)?,
        difficulty_encountered: row.get(11)?,
        satisfaction: row.get(12)?,
        session_goals: json_list(row, 13)?,
        goals_achieved: json_list(row, 14)?,
        notes: row.get(15)?,
        created_at: row.get(16)?,
    })
}

/// Append a study session
pub fn append_session(conn: &Connection, session: &StudySession) -> Result<(), ProgressError> {
    conn.execute(
        "INSERT INTO study_sessions (
            id, learner_id, title, description, subject, start_time, end_time,
            duration_minutes, topics_studied_json, documents_reviewed_json, focus_score,
            difficulty_encountered, satisfaction, session_goals_json, goals_achieved_json,
            notes, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        params![
            session.id,
            session.learner_id,
            session.title,
            session.description,
            session.subject,
            session.start_time,
            session.end_time,
            session.duration_minutes,
            serde_json::to_string(&session.topics_studied)?,
            serde_json::to_string(&session.documents_reviewed)?,
            session.focus_score,
            session.difficulty_encountered,
            session.satisfaction,
            serde_json::to_string(&session.session_goals)?,
            serde_json::to_string(&session.goals_achieved)?,
            session.notes,
            session.created_at,
        ],
    )
    .map_err(|e| ProgressError::Storage(format!("Failed to append session: {}", e)))?;

    Ok(())
}

/// List a learner's sessions, most recent start first, optionally only those
/// starting at or after `since`
pub fn list_sessions(
    conn: &Connection,
    learner_id: &str,
    since: Option<DateTime<Utc>>,
) -> Result<Vec<StudySession>, ProgressError> {
    let mut sql = format!("SELECT {} FROM study_sessions WHERE learner_id = ?", SESSION_COLUMNS);
    let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(learner_id.to_string())];

    if let Some(since) = since {
        sql.push_str(" AND start_time >= ?");
        params_vec.push(Box::new(since));
    }

    sql.push_str(" ORDER BY start_time DESC");

    let params_refs: Vec<&dyn rusqlite::ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();

    let mut stmt = conn
        .prepare(&sql)
        .map_err(|e| ProgressError::Storage(format!("Failed to prepare statement: {}", e)))?;

    let rows = stmt
        .query_map(params_refs.as_slice(), row_to_session)
        .map_err(|e| ProgressError::Storage(format!("Failed to query sessions: {}", e)))?;

    let mut results = Vec::new();
    for row in rows {
        results.push(row.map_err(|e| ProgressError::Storage(format!("Failed to read row: {}", e)))?);
    }

    Ok(results)
}

/// Count sessions
pub fn session_count(conn: &Connection) -> Result<i64, ProgressError> {
    conn.query_row("SELECT COUNT(*) FROM study_sessions", [], |row| row.get(0))
        .map_err(|e| ProgressError::Storage(format!("Count query failed: {}", e)))
}
