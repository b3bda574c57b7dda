//! Storage collaborator interface
//!
//! The engine talks to persistence only through [`ProgressStore`]. Entities
//! reference each other by id; there are no live back-pointers to keep in
//! sync.
//!
//! Read-modify-write sequences go through [`ProgressStore::atomically`]. The
//! SQLite implementation runs the unit inside an IMMEDIATE transaction while
//! holding the connection mutex, so two assessments on the same
//! (learner, topic) pair cannot interleave and lose an update.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, TransactionBehavior};
use tracing::trace;

use super::models::{AssessmentRecord, LearningGoal, ProgressRecord, SortOrder, StudySession, Topic};
use super::{assessments, goals, progress, sessions, topics, ProgressDb};
use crate::error::ProgressError;

/// A unit of work run all-or-nothing against a store
pub type StoreUnit<'u> = dyn FnMut(&dyn ProgressStore) -> Result<(), ProgressError> + 'u;

/// Persistence operations consumed by the engine
pub trait ProgressStore {
    fn load_progress(&self, learner_id: &str, topic_id: &str) -> Result<Option<ProgressRecord>, ProgressError>;

    fn save_progress(&self, record: &ProgressRecord) -> Result<(), ProgressError>;

    fn append_assessment(&self, record: &AssessmentRecord) -> Result<(), ProgressError>;

    fn list_assessments(
        &self,
        progress_record_id: &str,
        limit: usize,
        order: SortOrder,
    ) -> Result<Vec<AssessmentRecord>, ProgressError>;

    fn list_progress_records(
        &self,
        learner_id: &str,
        subject: Option<&str>,
    ) -> Result<Vec<ProgressRecord>, ProgressError>;

    fn list_topics(&self) -> Result<Vec<Topic>, ProgressError>;

    fn get_topic(&self, topic_id: &str) -> Result<Option<Topic>, ProgressError>;

    fn upsert_topic(&self, topic: &Topic) -> Result<(), ProgressError>;

    fn list_sessions(
        &self,
        learner_id: &str,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<StudySession>, ProgressError>;

    fn append_session(&self, session: &StudySession) -> Result<(), ProgressError>;

    fn create_goal(&self, goal: &LearningGoal) -> Result<(), ProgressError>;

    fn list_goals(&self, learner_id: &str, active_only: bool) -> Result<Vec<LearningGoal>, ProgressError>;

    /// Run `unit` so that either every write it makes lands or none does
    fn atomically(&self, unit: &mut StoreUnit<'_>) -> Result<(), ProgressError>;
}

/// Store view over a connection that is already inside a transaction
pub struct ConnStore<'c> {
    conn: &'c Connection,
}

impl<'c> ConnStore<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }
}

impl ProgressStore for ConnStore<'_> {
    fn load_progress(&self, learner_id: &str, topic_id: &str) -> Result<Option<ProgressRecord>, ProgressError> {
        progress::get_progress(self.conn, learner_id, topic_id)
    }

    fn save_progress(&self, record: &ProgressRecord) -> Result<(), ProgressError> {
        progress::save_progress(self.conn, record)
    }

    fn append_assessment(&self, record: &AssessmentRecord) -> Result<(), ProgressError> {
        assessments::append_assessment(self.conn, record)
    }

    fn list_assessments(
        &self,
        progress_record_id: &str,
        limit: usize,
        order: SortOrder,
    ) -> Result<Vec<AssessmentRecord>, ProgressError> {
        assessments::list_assessments(self.conn, progress_record_id, limit, order)
    }

    fn list_progress_records(
        &self,
        learner_id: &str,
        subject: Option<&str>,
    ) -> Result<Vec<ProgressRecord>, ProgressError> {
        progress::list_progress_for_learner(self.conn, learner_id, subject)
    }

    fn list_topics(&self) -> Result<Vec<Topic>, ProgressError> {
        topics::list_topics(self.conn)
    }

    fn get_topic(&self, topic_id: &str) -> Result<Option<Topic>, ProgressError> {
        topics::get_topic(self.conn, topic_id)
    }

    fn upsert_topic(&self, topic: &Topic) -> Result<(), ProgressError> {
        topics::upsert_topic(self.conn, topic)
    }

    fn list_sessions(
        &self,
        learner_id: &str,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<StudySession>, ProgressError> {
        sessions::list_sessions(self.conn, learner_id, since)
    }

    fn append_session(&self, session: &StudySession) -> Result<(), ProgressError> {
        sessions::append_session(self.conn, session)
    }

    fn create_goal(&self, goal: &LearningGoal) -> Result<(), ProgressError> {
        goals::create_goal(self.conn, goal)
    }

    fn list_goals(&self, learner_id: &str, active_only: bool) -> Result<Vec<LearningGoal>, ProgressError> {
        goals::list_goals(self.conn, learner_id, active_only)
    }

    /// Already inside the caller's transaction
    fn atomically(&self, unit: &mut StoreUnit<'_>) -> Result<(), ProgressError> {
        unit(self)
    }
}

impl ProgressStore for ProgressDb {
    fn load_progress(&self, learner_id: &str, topic_id: &str) -> Result<Option<ProgressRecord>, ProgressError> {
        self.with_conn(|conn| progress::get_progress(conn, learner_id, topic_id))
    }

    fn save_progress(&self, record: &ProgressRecord) -> Result<(), ProgressError> {
        self.with_conn(|conn| progress::save_progress(conn, record))
    }

    fn append_assessment(&self, record: &AssessmentRecord) -> Result<(), ProgressError> {
        self.with_conn(|conn| assessments::append_assessment(conn, record))
    }

    fn list_assessments(
        &self,
        progress_record_id: &str,
        limit: usize,
        order: SortOrder,
    ) -> Result<Vec<AssessmentRecord>, ProgressError> {
        self.with_conn(|conn| assessments::list_assessments(conn, progress_record_id, limit, order))
    }

    fn list_progress_records(
        &self,
        learner_id: &str,
        subject: Option<&str>,
    ) -> Result<Vec<ProgressRecord>, ProgressError> {
        self.with_conn(|conn| progress::list_progress_for_learner(conn, learner_id, subject))
    }

    fn list_topics(&self) -> Result<Vec<Topic>, ProgressError> {
        self.with_conn(topics::list_topics)
    }

    fn get_topic(&self, topic_id: &str) -> Result<Option<Topic>, ProgressError> {
        self.with_conn(|conn| topics::get_topic(conn, topic_id))
    }

    fn upsert_topic(&self, topic: &Topic) -> Result<(), ProgressError> {
        self.atomically(&mut |store| store.upsert_topic(topic))
    }

    fn list_sessions(
        &self,
        learner_id: &str,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<StudySession>, ProgressError> {
        self.with_conn(|conn| sessions::list_sessions(conn, learner_id, since))
    }

    fn append_session(&self, session: &StudySession) -> Result<(), ProgressError> {
        self.with_conn(|conn| sessions::append_session(conn, session))
    }

    fn create_goal(&self, goal: &LearningGoal) -> Result<(), ProgressError> {
        self.with_conn(|conn| goals::create_goal(conn, goal))
    }

    fn list_goals(&self, learner_id: &str, active_only: bool) -> Result<Vec<LearningGoal>, ProgressError> {
        self.with_conn(|conn| goals::list_goals(conn, learner_id, active_only))
    }

    fn atomically(&self, unit: &mut StoreUnit<'_>) -> Result<(), ProgressError> {
        self.with_conn_mut(|conn| {
            let tx = conn
                .transaction_with_behavior(TransactionBehavior::Immediate)
                .map_err(|e| ProgressError::Storage(format!("Failed to start transaction: {}", e)))?;

            // Dropping `tx` without commit rolls back
            unit(&ConnStore::new(&tx))?;

            tx.commit()
                .map_err(|e| ProgressError::Storage(format!("Failed to commit transaction: {}", e)))?;
            trace!("Committed store unit");
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::AssessmentType;

    fn topic(id: &str) -> Topic {
        Topic {
            id: id.to_string(),
            title: id.to_string(),
            description: None,
            subject: None,
            difficulty_level: None,
            estimated_time_minutes: None,
            prerequisites: vec!["base".into()],
        }
    }

    #[test]
    fn test_failed_unit_rolls_back_every_write() {
        let db = ProgressDb::open_in_memory().unwrap();
        let record = ProgressRecord::new("learner-1", "t1", Utc::now());

        let result = db.atomically(&mut |store| {
            store.save_progress(&record)?;
            store.append_assessment(&AssessmentRecord {
                id: "a1".into(),
                progress_record_id: record.id.clone(),
                assessment_type: AssessmentType::Quiz,
                question: None,
                response: None,
                score: None,
                max_score: None,
                is_correct: Some(true),
                time_taken_seconds: None,
                feedback: None,
                conversation_id: None,
                document_id: None,
                created_at: Utc::now(),
            })?;
            Err(ProgressError::Internal("boom".into()))
        });

        assert!(matches!(result, Err(ProgressError::Internal(_))));
        assert!(db.load_progress("learner-1", "t1").unwrap().is_none());
        assert_eq!(db.stats().unwrap().assessment_count, 0);
    }

    #[test]
    fn test_committed_unit_is_visible() {
        let db = ProgressDb::open_in_memory().unwrap();
        db.upsert_topic(&topic("t1")).unwrap();

        let loaded = db.get_topic("t1").unwrap().unwrap();
        assert_eq!(loaded.prerequisites, vec!["base"]);
        assert_eq!(db.list_topics().unwrap().len(), 1);
    }
}
