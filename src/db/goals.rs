//! Learning goal persistence

use rusqlite::{params, Connection, Row};

use super::models::LearningGoal;
use crate::error::ProgressError;

fn row_to_goal(row: &Row<'_>) -> rusqlite::Result<LearningGoal> {
    let targets: String = row.get(5)?;
    let target_topics = serde_json::from_str(&targets).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(LearningGoal {
        id: row.get(0)?,
        learner_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        subject: row.get(4)?,
        target_topics,
        target_mastery_level: row.get(6)?,
        target_date: row.get(7)?,
        priority: row.get(8)?,
        is_active: row.get(9)?,
        created_at: row.get(10)?,
    })
}

/// Insert a goal
pub fn create_goal(conn: &Connection, goal: &LearningGoal) -> Result<(), ProgressError> {
    conn.execute(
        "INSERT INTO learning_goals (
            id, learner_id, title, description, subject, target_topics_json,
            target_mastery_level, target_date, priority, is_active, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        params![
            goal.id,
            goal.learner_id,
            goal.title,
            goal.description,
            goal.subject,
            serde_json::to_string(&goal.target_topics)?,
            goal.target_mastery_level,
            goal.target_date,
            goal.priority,
            goal.is_active,
            goal.created_at,
        ],
    )
    .map_err(|e| ProgressError::Storage(format!("Failed to create goal: {}", e)))?;

    Ok(())
}

/// List a learner's goals, newest first
pub fn list_goals(
    conn: &Connection,
    learner_id: &str,
    active_only: bool,
) -> Result<Vec<LearningGoal>, ProgressError> {
    let mut sql = String::from(
        "SELECT id, learner_id, title, description, subject, target_topics_json,
         target_mastery_level, target_date, priority, is_active, created_at
         FROM learning_goals WHERE learner_id = ?",
    );
    if active_only {
        sql.push_str(" AND is_active = 1");
    }
    sql.push_str(" ORDER BY created_at DESC, id ASC");

    let mut stmt = conn
        .prepare(&sql)
        .map_err(|e| ProgressError::Storage(format!("Failed to prepare statement: {}", e)))?;

    let rows = stmt
        .query_map(params![learner_id], row_to_goal)
        .map_err(|e| ProgressError::Storage(format!("Failed to query goals: {}", e)))?;

    let mut results = Vec::new();
    for row in rows {
        results.push(row.map_err(|e| ProgressError::Storage(format!("Failed to read row: {}", e)))?);
    }

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{MasteryLevel, Priority};
    use crate::db::schema;
    use chrono::{Duration, NaiveDate, TimeZone, Utc};

    #[test]
    fn test_active_filter_and_order() {
        let conn = Connection::open_in_memory().unwrap();
        schema::init_schema(&conn).unwrap();
        let created = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

        let first = LearningGoal {
            id: "g1".into(),
            learner_id: "learner-1".into(),
            title: "Finish algebra".into(),
            description: None,
            subject: Some("math".into()),
            target_topics: vec!["t1".into(), "t2".into()],
            target_mastery_level: MasteryLevel::Practicing,
            target_date: NaiveDate::from_ymd_opt(2024, 3, 1),
            priority: Priority::High,
            is_active: true,
            created_at: created,
        };
        let second = LearningGoal {
            id: "g2".into(),
            is_active: false,
            created_at: created + Duration::days(1),
            ..first.clone()
        };
        create_goal(&conn, &first).unwrap();
        create_goal(&conn, &second).unwrap();

        let all = list_goals(&conn, "learner-1", false).unwrap();
        assert_eq!(all.iter().map(|g| g.id.as_str()).collect::<Vec<_>>(), vec!["g2", "g1"]);

        let active = list_goals(&conn, "learner-1", true).unwrap();
        assert_eq!(active, vec![first]);
    }
}
