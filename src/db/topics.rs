//! Topic catalog persistence
//!
//! Topics are owned by document ingestion; this core reads them and offers an
//! upsert so ingestion (or a seed script) can deliver them.

use std::collections::HashMap;

use rusqlite::{params, Connection, OptionalExtension, Row};

use super::models::Topic;
use crate::error::ProgressError;

fn row_to_topic(row: &Row<'_>) -> rusqlite::Result<Topic> {
    Ok(Topic {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        subject: row.get(3)?,
        difficulty_level: row.get(4)?,
        estimated_time_minutes: row.get(5)?,
        prerequisites: Vec::new(),
    })
}

fn prerequisites_for(conn: &Connection, topic_id: &str) -> Result<Vec<String>, ProgressError> {
    let mut stmt = conn
        .prepare("SELECT prerequisite_id FROM topic_prerequisites WHERE topic_id = ? ORDER BY position")
        .map_err(|e| ProgressError::Storage(format!("Failed to prepare statement: {}", e)))?;

    let rows = stmt
        .query_map(params![topic_id], |row| row.get::<_, String>(0))
        .map_err(|e| ProgressError::Storage(format!("Failed to query prerequisites: {}", e)))?;

    let mut results = Vec::new();
    for row in rows {
        results.push(row.map_err(|e| ProgressError::Storage(format!("Failed to read row: {}", e)))?);
    }
    Ok(results)
}

/// Get a topic by ID, with its ordered prerequisites
pub fn get_topic(conn: &Connection, id: &str) -> Result<Option<Topic>, ProgressError> {
    let topic = conn
        .query_row(
            "SELECT id, title, description, subject, difficulty_level, estimated_time_minutes
             FROM topics WHERE id = ?",
            params![id],
            row_to_topic,
        )
        .optional()
        .map_err(|e| ProgressError::Storage(format!("Failed to get topic: {}", e)))?;

    match topic {
        Some(mut topic) => {
            topic.prerequisites = prerequisites_for(conn, &topic.id)?;
            Ok(Some(topic))
        }
        None => Ok(None),
    }
}

/// List every topic ordered by id
pub fn list_topics(conn: &Connection) -> Result<Vec<Topic>, ProgressError> {
    let mut stmt = conn
        .prepare(
            "SELECT id, title, description, subject, difficulty_level, estimated_time_minutes
             FROM topics ORDER BY id ASC",
        )
        .map_err(|e| ProgressError::Storage(format!("Failed to prepare statement: {}", e)))?;

    let rows = stmt
        .query_map([], row_to_topic)
        .map_err(|e| ProgressError::Storage(format!("Failed to query topics: {}", e)))?;

    let mut topics = Vec::new();
    for row in rows {
        topics.push(row.map_err(|e| ProgressError::Storage(format!("Failed to read row: {}", e)))?);
    }

    // One pass over the edge table instead of a query per topic
    let mut edges: HashMap<String, Vec<String>> = HashMap::new();
    let mut stmt = conn
        .prepare("SELECT topic_id, prerequisite_id FROM topic_prerequisites ORDER BY topic_id, position")
        .map_err(|e| ProgressError::Storage(format!("Failed to prepare statement: {}", e)))?;
    let rows = stmt
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))
        .map_err(|e| ProgressError::Storage(format!("Failed to query prerequisites: {}", e)))?;
    for row in rows {
        let (topic_id, prerequisite_id) =
            row.map_err(|e| ProgressError::Storage(format!("Failed to read row: {}", e)))?;
        edges.entry(topic_id).or_default().push(prerequisite_id);
    }

    for topic in &mut topics {
        if let Some(prerequisites) = edges.remove(&topic.id) {
            topic.prerequisites = prerequisites;
        }
    }

    Ok(topics)
}

/// Create or replace a topic and its prerequisite list.
///
/// Issues several statements; callers wanting all-or-nothing run it inside a
/// transaction.
pub fn upsert_topic(conn: &Connection, topic: &Topic) -> Result<(), ProgressError> {
    conn.execute(
        "INSERT INTO topics (id, title, description, subject, difficulty_level, estimated_time_minutes, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, datetime('now'))
         ON CONFLICT(id) DO UPDATE SET
            title = excluded.title,
            description = excluded.description,
            subject = excluded.subject,
            difficulty_level = excluded.difficulty_level,
            estimated_time_minutes = excluded.estimated_time_minutes,
            updated_at = excluded.updated_at",
        params![
            topic.id,
            topic.title,
            topic.description,
            topic.subject,
            topic.difficulty_level,
            topic.estimated_time_minutes,
        ],
    )
    .map_err(|e| ProgressError::Storage(format!("Failed to upsert topic: {}", e)))?;

    conn.execute("DELETE FROM topic_prerequisites WHERE topic_id = ?", params![topic.id])
        .map_err(|e| ProgressError::Storage(format!("Failed to clear prerequisites: {}", e)))?;

    for (position, prerequisite_id) in topic.prerequisites.iter().enumerate() {
        conn.execute(
            "INSERT INTO topic_prerequisites (topic_id, position, prerequisite_id) VALUES (?, ?, ?)",
            params![topic.id, position as i64, prerequisite_id],
        )
        .map_err(|e| ProgressError::Storage(format!("Failed to insert prerequisite: {}", e)))?;
    }

    Ok(())
}

/// Count topics
pub fn topic_count(conn: &Connection) -> Result<i64, ProgressError> {
    conn.query_row("SELECT COUNT(*) FROM topics", [], |row| row.get(0))
        .map_err(|e| ProgressError::Storage(format!("Count query failed: {}", e)))
}
