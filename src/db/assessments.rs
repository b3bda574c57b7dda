//! Assessment log persistence
//!
//! Append-only. There is deliberately no update or delete here.

use rusqlite::{params, Connection, Row};

use super::models::{AssessmentFeedback, AssessmentRecord, SortOrder};
use crate::error::ProgressError;

const ASSESSMENT_COLUMNS: &str = "id, progress_record_id, assessment_type, question, response,
    score, max_score, is_correct, time_taken_seconds, feedback_json,
    conversation_id, document_id, created_at";

fn row_to_assessment(row: &Row<'_>) -> rusqlite::Result<AssessmentRecord> {
    let feedback_json: Option<String> = row.get(9)?;
    let feedback = match feedback_json {
        Some(json) => Some(serde_json::from_str::<AssessmentFeedback>(&json).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(9, rusqlite::types::Type::Text, Box::new(e))
        })?),
        None => None,
    };

    Ok(AssessmentRecord {
        id: row.get(0)?,
        progress_record_id: row.get(1)?,
        assessment_type: row.get(2)?,
        question: row.get(3)?,
        response: row.get(4)?,
        score: row.get(5)?,
        max_score: row.get(6)?,
        is_correct: row.get(7)?,
        time_taken_seconds: row.get(8)?,
        feedback,
        conversation_id: row.get(10)?,
        document_id: row.get(11)?,
        created_at: row.get(12)?,
    })
}

/// Append one assessment
pub fn append_assessment(conn: &Connection, record: &AssessmentRecord) -> Result<(), ProgressError> {
    let feedback_json = record
        .feedback
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;

    conn.execute(
        "INSERT INTO assessment_records (
            id, progress_record_id, assessment_type, question, response,
            score, max_score, is_correct, time_taken_seconds, feedback_json,
            conversation_id, document_id, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        params![
            record.id,
            record.progress_record_id,
            record.assessment_type,
            record.question,
            record.response,
            record.score,
            record.max_score,
            record.is_correct,
            record.time_taken_seconds,
            feedback_json,
            record.conversation_id,
            record.document_id,
            record.created_at,
        ],
    )
    .map_err(|e| ProgressError::Storage(format!("Failed to append assessment: {}", e)))?;

    Ok(())
}

/// List assessments for a progress record, bounded by `limit`
pub fn list_assessments(
    conn: &Connection,
    progress_record_id: &str,
    limit: usize,
    order: SortOrder,
) -> Result<Vec<AssessmentRecord>, ProgressError> {
    let direction = match order {
        SortOrder::Chronological => "ASC",
        SortOrder::MostRecentFirst => "DESC",
    };
    let sql = format!(
        "SELECT {} FROM assessment_records WHERE progress_record_id = ? ORDER BY seq {} LIMIT ?",
        ASSESSMENT_COLUMNS, direction
    );

    let mut stmt = conn
        .prepare(&sql)
        .map_err(|e| ProgressError::Storage(format!("Failed to prepare statement: {}", e)))?;

    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    let rows = stmt
        .query_map(params![progress_record_id, limit], row_to_assessment)
        .map_err(|e| ProgressError::Storage(format!("Failed to query assessments: {}", e)))?;

    let mut results = Vec::new();
    for row in rows {
        results.push(row.map_err(|e| ProgressError::Storage(format!("Failed to read row: {}", e)))?);
    }

    Ok(results)
}

/// Count assessment rows
pub fn assessment_count(conn: &Connection) -> Result<i64, ProgressError> {
    conn.query_row("SELECT COUNT(*) FROM assessment_records", [], |row| row.get(0))
        .map_err(|e| ProgressError::Storage(format!("Count query failed: {}", e)))
}
