//! Progress record persistence
//!
//! One row per (learner, topic). Writes are whole-record upserts keyed on
//! the pair; the ledger computes the new state and this module stores it.

use rusqlite::{params, Connection, OptionalExtension, Row};

use super::models::ProgressRecord;
use crate::error::ProgressError;
use crate::heatmap::GENERAL_SUBJECT;

const PROGRESS_COLUMNS: &str = "p.id, p.learner_id, p.topic_id, p.mastery_level, p.confidence_score,
    p.time_spent_minutes, p.total_attempts, p.successful_attempts, p.success_rate,
    p.first_attempt_at, p.last_practice_at, p.mastery_achieved_at,
    p.perceived_difficulty, p.engagement_level, p.created_at, p.updated_at";

fn row_to_progress(row: &Row<'_>) -> rusqlite::Result<ProgressRecord> {
    Ok(ProgressRecord {
        id: row.get(0)?,
        learner_id: row.get(1)?,
        topic_id: row.get(2)?,
        mastery_level: row.get(3)?,
        confidence_score: row.get(4)?,
        time_spent_minutes: row.get(5)?,
        total_attempts: row.get(6)?,
        successful_attempts: row.get(7)?,
        success_rate: row.get(8)?,
        first_attempt_at: row.get(9)?,
        last_practice_at: row.get(10)?,
        mastery_achieved_at: row.get(11)?,
        perceived_difficulty: row.get(12)?,
        engagement_level: row.get(13)?,
        created_at: row.get(14)?,
        updated_at: row.get(15)?,
    })
}

/// Get the record for a learner+topic pair
pub fn get_progress(
    conn: &Connection,
    learner_id: &str,
    topic_id: &str,
) -> Result<Option<ProgressRecord>, ProgressError> {
    let sql = format!(
        "SELECT {} FROM progress_records p WHERE p.learner_id = ? AND p.topic_id = ?",
        PROGRESS_COLUMNS
    );

    conn.query_row(&sql, params![learner_id, topic_id], row_to_progress)
        .optional()
        .map_err(|e| ProgressError::Storage(format!("Failed to get progress: {}", e)))
}

/// Insert or replace the record for its (learner, topic) pair
pub fn save_progress(conn: &Connection, record: &ProgressRecord) -> Result<(), ProgressError> {
    let sql = "INSERT INTO progress_records (
            id, learner_id, topic_id, mastery_level, confidence_score, time_spent_minutes,
            total_attempts, successful_attempts, success_rate,
            first_attempt_at, last_practice_at, mastery_achieved_at,
            perceived_difficulty, engagement_level, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
        ON CONFLICT(learner_id, topic_id) DO UPDATE SET
            mastery_level = excluded.mastery_level,
            confidence_score = excluded.confidence_score,
            time_spent_minutes = excluded.time_spent_minutes,
            total_attempts = excluded.total_attempts,
            successful_attempts = excluded.successful_attempts,
            success_rate = excluded.success_rate,
            first_attempt_at = excluded.first_attempt_at,
            last_practice_at = excluded.last_practice_at,
            mastery_achieved_at = excluded.mastery_achieved_at,
            perceived_difficulty = excluded.perceived_difficulty,
            engagement_level = excluded.engagement_level,
            updated_at = excluded.updated_at";

    conn.execute(
        sql,
        params![
            record.id,
            record.learner_id,
            record.topic_id,
            record.mastery_level,
            record.confidence_score,
            record.time_spent_minutes,
            record.total_attempts,
            record.successful_attempts,
            record.success_rate,
            record.first_attempt_at,
            record.last_practice_at,
            record.mastery_achieved_at,
            record.perceived_difficulty,
            record.engagement_level,
            record.created_at,
            record.updated_at,
        ],
    )
    .map_err(|e| ProgressError::Storage(format!("Failed to save progress: {}", e)))?;

    Ok(())
}

/// List a learner's records ordered by topic id, optionally limited to one subject
pub fn list_progress_for_learner(
    conn: &Connection,
    learner_id: &str,
    subject: Option<&str>,
) -> Result<Vec<ProgressRecord>, ProgressError> {
    let mut sql = format!("SELECT {} FROM progress_records p", PROGRESS_COLUMNS);
    let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

    if let Some(subject) = subject {
        // Subject-less topics are shown under the "General" heatmap row
        if subject == GENERAL_SUBJECT {
            sql.push_str(
                " JOIN topics t ON t.id = p.topic_id WHERE p.learner_id = ? AND (t.subject IS NULL OR t.subject = ?)",
            );
        } else {
            sql.push_str(" JOIN topics t ON t.id = p.topic_id WHERE p.learner_id = ? AND t.subject = ?");
        }
        params_vec.push(Box::new(learner_id.to_string()));
        params_vec.push(Box::new(subject.to_string()));
    } else {
        sql.push_str(" WHERE p.learner_id = ?");
        params_vec.push(Box::new(learner_id.to_string()));
    }

    sql.push_str(" ORDER BY p.topic_id ASC");

    let params_refs: Vec<&dyn rusqlite::ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();

    let mut stmt = conn
        .prepare(&sql)
        .map_err(|e| ProgressError::Storage(format!("Failed to prepare statement: {}", e)))?;

    let rows = stmt
        .query_map(params_refs.as_slice(), row_to_progress)
        .map_err(|e| ProgressError::Storage(format!("Failed to query progress: {}", e)))?;

    let mut results = Vec::new();
    for row in rows {
        results.push(row.map_err(|e| ProgressError::Storage(format!("Failed to read row: {}", e)))?);
    }

    Ok(results)
}

/// Count ledger rows
pub fn progress_count(conn: &Connection) -> Result<i64, ProgressError> {
    conn.query_row("SELECT COUNT(*) FROM progress_records", [], |row| row.get(0))
        .map_err(|e| ProgressError::Storage(format!("Count query failed: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{MasteryLevel, Topic};
    use crate::db::{schema, topics};
    use chrono::{TimeZone, Utc};

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        schema::init_schema(&conn).unwrap();
        conn
    }

    #[test]
    fn test_save_then_update_same_pair() {
        let conn = conn();
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();

        let mut record = ProgressRecord::new("learner-1", "algebra", now);
        save_progress(&conn, &record).unwrap();

        record.total_attempts = 2;
        record.successful_attempts = 1;
        record.success_rate = 0.5;
        record.mastery_level = MasteryLevel::Learning;
        record.last_practice_at = Some(now);
        save_progress(&conn, &record).unwrap();

        let loaded = get_progress(&conn, "learner-1", "algebra").unwrap().unwrap();
        assert_eq!(loaded, record);
        assert_eq!(progress_count(&conn).unwrap(), 1);
    }

    #[test]
    fn test_missing_pair_is_none() {
        let conn = conn();
        assert!(get_progress(&conn, "learner-1", "nope").unwrap().is_none());
    }

    #[test]
    fn test_list_filters_by_learner_and_subject() {
        let conn = conn();
        let now = Utc::now();

        for (id, subject) in [("t1", Some("math")), ("t2", Some("physics")), ("t3", None)] {
            topics::upsert_topic(
                &conn,
                &Topic {
                    id: id.to_string(),
                    title: id.to_uppercase(),
                    description: None,
                    subject: subject.map(str::to_string),
                    difficulty_level: None,
                    estimated_time_minutes: None,
                    prerequisites: vec![],
                },
            )
            .unwrap();
            save_progress(&conn, &ProgressRecord::new("learner-1", id, now)).unwrap();
        }
        save_progress(&conn, &ProgressRecord::new("learner-2", "t1", now)).unwrap();

        let all = list_progress_for_learner(&conn, "learner-1", None).unwrap();
        let ids: Vec<_> = all.iter().map(|r| r.topic_id.as_str()).collect();
        assert_eq!(ids, vec!["t1", "t2", "t3"]);

        let math = list_progress_for_learner(&conn, "learner-1", Some("math")).unwrap();
        assert_eq!(math.len(), 1);
        assert_eq!(math[0].topic_id, "t1");

        let general = list_progress_for_learner(&conn, "learner-1", Some(GENERAL_SUBJECT)).unwrap();
        let ids: Vec<_> = general.iter().map(|r| r.topic_id.as_str()).collect();
        assert_eq!(ids, vec!["t3"]);
    }
}
