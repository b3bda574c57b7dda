//! Progress service - business logic for the mastery ledger and its readers
//!
//! Writes validate their input first, then run the read-compute-write
//! sequence as one store unit so an assessment and the ledger update it
//! causes land together or not at all. Reads go straight to the store and
//! may see a slightly stale snapshot.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Duration;
use tracing::{debug, info};

use crate::analytics::{self, Analytics};
use crate::clock::Clock;
use crate::config::Config;
use crate::db::models::{MasteryLevel, ProgressRecord, SortOrder, Topic};
use crate::db::{LearnerContext, ProgressStore};
use crate::error::ProgressError;
use crate::goals::{goal_view, GoalView};
use crate::heatmap::{build_heatmap, Heatmap};
use crate::mastery::{self, ManualUpdate, Transition};
use crate::prerequisites::ready_topics;
use crate::recommendations::{recommend, Recommendation};
use crate::streak::{self, StreakState};
use crate::views::{
    AssessmentInput, GoalInput, MasterySummary, ProgressUpdateInput, RecentAssessment, SessionSummary,
    StudySessionInput, TopicInfo, TopicMasteryDetail,
};

use super::events::{EventBus, ProgressEvent};

pub const MAX_RECOMMENDATION_LIMIT: usize = 100;
pub const DEFAULT_SESSION_PAGE_SIZE: usize = 100;
pub const MAX_SESSION_PAGE_SIZE: usize = 1000;

/// Tunables the service reads from [`Config`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceSettings {
    pub recent_assessments_limit: usize,
    pub streak_lookback_days: u32,
    pub default_recommendation_limit: usize,
    pub default_analytics_window_days: u32,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for ServiceSettings {
    fn from(config: &Config) -> Self {
        Self {
            recent_assessments_limit: config.recent_assessments_limit,
            streak_lookback_days: config.streak_lookback_days,
            default_recommendation_limit: config.default_recommendation_limit,
            default_analytics_window_days: config.default_analytics_window_days,
        }
    }
}

/// Pagination for the session journal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionPage {
    pub days: Option<u32>,
    pub skip: usize,
    pub limit: usize,
}

impl Default for SessionPage {
    fn default() -> Self {
        Self {
            days: None,
            skip: 0,
            limit: DEFAULT_SESSION_PAGE_SIZE,
        }
    }
}

fn topic_lookup(topics: &[Topic]) -> HashMap<&str, &Topic> {
    topics.iter().map(|t| (t.id.as_str(), t)).collect()
}

/// Progress service for per-learner ledger operations
pub struct ProgressService {
    store: Arc<dyn ProgressStore + Send + Sync>,
    events: Arc<EventBus>,
    clock: Arc<dyn Clock>,
    settings: ServiceSettings,
}

impl ProgressService {
    pub fn new(
        store: Arc<dyn ProgressStore + Send + Sync>,
        events: Arc<EventBus>,
        clock: Arc<dyn Clock>,
        settings: ServiceSettings,
    ) -> Self {
        Self {
            store,
            events,
            clock,
            settings,
        }
    }

    pub fn settings(&self) -> &ServiceSettings {
        &self.settings
    }

    // =========================================================================
    // Ledger writes
    // =========================================================================

    /// Append an assessment and update the ledger in one unit
    pub fn record_assessment(
        &self,
        ctx: &LearnerContext,
        input: AssessmentInput,
    ) -> Result<MasterySummary, ProgressError> {
        input.validate()?;
        let now = self.clock.now();
        let learner_id = ctx.learner_id();

        let mut outcome: Option<(ProgressRecord, Transition, String)> = None;
        self.store.atomically(&mut |store| {
            if store.get_topic(&input.topic_id)?.is_none() {
                return Err(ProgressError::invalid(format!("Unknown topic '{}'", input.topic_id)));
            }

            let mut record = store
                .load_progress(learner_id, &input.topic_id)?
                .unwrap_or_else(|| ProgressRecord::new(learner_id, &input.topic_id, now));
            let transition = mastery::apply_assessment(&mut record, input.is_correct, now);
            let assessment = input.to_record(&record.id, now);

            // Ledger row first; the log references it
            store.save_progress(&record)?;
            store.append_assessment(&assessment)?;

            outcome = Some((record, transition, assessment.id));
            Ok(())
        })?;

        let (record, transition, assessment_id) =
            outcome.ok_or_else(|| ProgressError::Internal("assessment unit produced no record".into()))?;

        info!(
            learner = %learner_id,
            topic = %record.topic_id,
            attempts = record.total_attempts,
            level = record.mastery_level.as_str(),
            "Assessment recorded"
        );

        self.events.emit(ProgressEvent::AssessmentRecorded {
            learner_id: learner_id.to_string(),
            topic_id: record.topic_id.clone(),
            assessment_id,
            is_correct: input.is_correct,
        });
        self.emit_transition(learner_id, &record.topic_id, transition);

        Ok(MasterySummary::from(&record))
    }

    /// Apply a partial manual update
    pub fn update_progress(
        &self,
        ctx: &LearnerContext,
        input: ProgressUpdateInput,
    ) -> Result<MasterySummary, ProgressError> {
        input.validate()?;
        let update = ManualUpdate::from(&input);
        let now = self.clock.now();
        let learner_id = ctx.learner_id();

        let mut outcome: Option<(ProgressRecord, Transition)> = None;
        self.store.atomically(&mut |store| {
            if store.get_topic(&input.topic_id)?.is_none() {
                return Err(ProgressError::invalid(format!("Unknown topic '{}'", input.topic_id)));
            }

            let mut record = store
                .load_progress(learner_id, &input.topic_id)?
                .unwrap_or_else(|| ProgressRecord::new(learner_id, &input.topic_id, now));
            let transition = mastery::apply_manual_update(&mut record, &update, now);
            store.save_progress(&record)?;

            outcome = Some((record, transition));
            Ok(())
        })?;

        let (record, transition) =
            outcome.ok_or_else(|| ProgressError::Internal("update unit produced no record".into()))?;

        debug!(learner = %learner_id, topic = %record.topic_id, "Progress updated");
        self.emit_transition(learner_id, &record.topic_id, transition);

        Ok(MasterySummary::from(&record))
    }

    fn emit_transition(&self, learner_id: &str, topic_id: &str, transition: Transition) {
        self.events.emit(ProgressEvent::ProgressUpdated {
            learner_id: learner_id.to_string(),
            topic_id: topic_id.to_string(),
            previous: transition.previous,
            current: transition.current,
        });
        if transition.newly_mastered {
            self.events.emit(ProgressEvent::MasteryAchieved {
                learner_id: learner_id.to_string(),
                topic_id: topic_id.to_string(),
            });
        }
    }

    // =========================================================================
    // Ledger reads
    // =========================================================================

    /// Detail view for one topic, or NotFound when there is no record
    pub fn get_topic_mastery(
        &self,
        ctx: &LearnerContext,
        topic_id: &str,
    ) -> Result<TopicMasteryDetail, ProgressError> {
        let record = self
            .store
            .load_progress(ctx.learner_id(), topic_id)?
            .ok_or_else(|| ProgressError::NotFound(format!("No progress for topic '{}'", topic_id)))?;

        let topic = self
            .store
            .get_topic(topic_id)?
            .ok_or_else(|| ProgressError::NotFound(format!("Topic '{}' not found", topic_id)))?;

        let recent = self.store.list_assessments(
            &record.id,
            self.settings.recent_assessments_limit,
            SortOrder::MostRecentFirst,
        )?;

        Ok(TopicMasteryDetail {
            topic: TopicInfo::from(&topic),
            progress: MasterySummary::from(&record),
            recent_assessments: recent.into_iter().map(RecentAssessment::from).collect(),
        })
    }

    /// Subject-grouped heatmap, optionally for one subject
    pub fn get_heatmap(&self, ctx: &LearnerContext, subject: Option<&str>) -> Result<Heatmap, ProgressError> {
        let records = self.store.list_progress_records(ctx.learner_id(), subject)?;
        let topics = self.store.list_topics()?;
        Ok(build_heatmap(&records, &topic_lookup(&topics)))
    }

    /// Review entries first, then newly ready topics
    pub fn get_recommendations(
        &self,
        ctx: &LearnerContext,
        limit: Option<usize>,
    ) -> Result<Vec<Recommendation>, ProgressError> {
        let limit = limit.unwrap_or(self.settings.default_recommendation_limit);
        if limit > MAX_RECOMMENDATION_LIMIT {
            return Err(ProgressError::invalid(format!(
                "limit must be at most {}",
                MAX_RECOMMENDATION_LIMIT
            )));
        }

        let records = self.store.list_progress_records(ctx.learner_id(), None)?;
        let topics = self.store.list_topics()?;
        let mastered: HashSet<&str> = records
            .iter()
            .filter(|r| r.mastery_level == MasteryLevel::Mastered)
            .map(|r| r.topic_id.as_str())
            .collect();

        let ready = ready_topics(&topics, &mastered);
        Ok(recommend(&records, &topic_lookup(&topics), &ready, limit))
    }

    // =========================================================================
    // Sessions
    // =========================================================================

    pub fn get_streak(&self, ctx: &LearnerContext) -> Result<StreakState, ProgressError> {
        let lookback = self.settings.streak_lookback_days;
        let since = self.clock.now() - Duration::days(lookback as i64);
        let sessions = self.store.list_sessions(ctx.learner_id(), Some(since))?;

        Ok(streak::calculate_streak(
            self.clock.today(),
            &streak::active_days(&sessions),
            lookback,
        ))
    }

    pub fn get_analytics(&self, ctx: &LearnerContext, days: Option<u32>) -> Result<Analytics, ProgressError> {
        let days = days.unwrap_or(self.settings.default_analytics_window_days);
        if days == 0 {
            return Err(ProgressError::invalid("days must be at least 1"));
        }

        let now = self.clock.now();
        let sessions = self
            .store
            .list_sessions(ctx.learner_id(), Some(analytics::window_start(now, days)))?;
        let records = self.store.list_progress_records(ctx.learner_id(), None)?;

        Ok(analytics::summarize(&sessions, &records, now, days))
    }

    pub fn record_study_session(
        &self,
        ctx: &LearnerContext,
        input: StudySessionInput,
    ) -> Result<SessionSummary, ProgressError> {
        input.validate()?;
        let session = input.into_session(ctx.learner_id(), self.clock.now());
        self.store.append_session(&session)?;

        info!(learner = %ctx.learner_id(), session = %session.id, "Study session recorded");
        self.events.emit(ProgressEvent::StudySessionRecorded {
            learner_id: ctx.learner_id().to_string(),
            session_id: session.id.clone(),
            duration_minutes: session.duration_minutes,
        });

        Ok(SessionSummary::from(session))
    }

    /// Sessions started in the last `days`, most recent first
    pub fn list_study_sessions(
        &self,
        ctx: &LearnerContext,
        page: SessionPage,
    ) -> Result<Vec<SessionSummary>, ProgressError> {
        let days = page.days.unwrap_or(self.settings.default_analytics_window_days);
        if days == 0 {
            return Err(ProgressError::invalid("days must be at least 1"));
        }
        if page.limit == 0 || page.limit > MAX_SESSION_PAGE_SIZE {
            return Err(ProgressError::invalid(format!(
                "limit must be between 1 and {}",
                MAX_SESSION_PAGE_SIZE
            )));
        }

        let since = self.clock.now() - Duration::days(days as i64);
        let sessions = self.store.list_sessions(ctx.learner_id(), Some(since))?;

        Ok(sessions
            .into_iter()
            .skip(page.skip)
            .take(page.limit)
            .map(SessionSummary::from)
            .collect())
    }

    // =========================================================================
    // Goals
    // =========================================================================

    pub fn create_goal(&self, ctx: &LearnerContext, input: GoalInput) -> Result<GoalView, ProgressError> {
        input.validate()?;

        for topic_id in &input.target_topics {
            if self.store.get_topic(topic_id)?.is_none() {
                return Err(ProgressError::invalid(format!("Unknown topic '{}'", topic_id)));
            }
        }

        let goal = input.into_goal(ctx.learner_id(), self.clock.now());
        self.store.create_goal(&goal)?;

        self.events.emit(ProgressEvent::GoalCreated {
            learner_id: ctx.learner_id().to_string(),
            goal_id: goal.id.clone(),
            target_count: goal.target_topics.len(),
        });

        let records = self.store.list_progress_records(ctx.learner_id(), None)?;
        Ok(goal_view(goal, &mastery_levels(&records)))
    }

    pub fn list_goals(&self, ctx: &LearnerContext, active_only: bool) -> Result<Vec<GoalView>, ProgressError> {
        let goals = self.store.list_goals(ctx.learner_id(), active_only)?;
        let records = self.store.list_progress_records(ctx.learner_id(), None)?;
        let levels = mastery_levels(&records);

        Ok(goals.into_iter().map(|goal| goal_view(goal, &levels)).collect())
    }

    // =========================================================================
    // Topic catalog
    // =========================================================================

    /// Create or replace a topic delivered by ingestion
    pub fn upsert_topic(&self, topic: Topic) -> Result<Topic, ProgressError> {
        if topic.id.trim().is_empty() {
            return Err(ProgressError::invalid("topic id is required"));
        }
        if topic.title.trim().is_empty() {
            return Err(ProgressError::invalid("title is required"));
        }
        if topic.prerequisites.iter().any(|p| p == &topic.id) {
            return Err(ProgressError::invalid(format!("Topic '{}' cannot require itself", topic.id)));
        }

        self.store.upsert_topic(&topic)?;
        self.events.emit(ProgressEvent::TopicUpserted {
            topic_id: topic.id.clone(),
        });

        Ok(topic)
    }

    pub fn list_topics(&self) -> Result<Vec<Topic>, ProgressError> {
        self.store.list_topics()
    }
}

fn mastery_levels(records: &[ProgressRecord]) -> HashMap<&str, MasteryLevel> {
    records
        .iter()
        .map(|r| (r.topic_id.as_str(), r.mastery_level))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::db::models::AssessmentType;
    use crate::db::ProgressDb;
    use chrono::{TimeZone, Utc};

    fn service() -> (ProgressService, Arc<ProgressDb>) {
        let db = Arc::new(ProgressDb::open_in_memory().unwrap());
        let clock = Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2024, 6, 15, 10, 0, 0).unwrap()));
        let service = ProgressService::new(
            db.clone(),
            Arc::new(EventBus::new()),
            clock,
            ServiceSettings::default(),
        );
        (service, db)
    }

    fn topic(id: &str) -> Topic {
        Topic {
            id: id.to_string(),
            title: id.to_uppercase(),
            description: None,
            subject: Some("math".into()),
            difficulty_level: None,
            estimated_time_minutes: None,
            prerequisites: vec![],
        }
    }

    fn quiz(topic_id: &str, is_correct: bool, score: Option<f64>) -> AssessmentInput {
        AssessmentInput {
            topic_id: topic_id.to_string(),
            assessment_type: AssessmentType::Quiz,
            question: None,
            response: None,
            score,
            max_score: Some(10.0),
            is_correct: Some(is_correct),
            time_taken_seconds: None,
            feedback: None,
            conversation_id: None,
            document_id: None,
        }
    }

    #[test]
    fn test_invalid_assessment_changes_nothing() {
        let (service, db) = service();
        let ctx = LearnerContext::new("learner-1");
        service.upsert_topic(topic("t1")).unwrap();

        let err = service.record_assessment(&ctx, quiz("t1", true, Some(12.0))).unwrap_err();
        assert!(matches!(err, ProgressError::InvalidInput(_)));

        let err = service.record_assessment(&ctx, quiz("nope", true, None)).unwrap_err();
        assert!(matches!(err, ProgressError::InvalidInput(_)));

        let stats = db.stats().unwrap();
        assert_eq!(stats.progress_record_count, 0);
        assert_eq!(stats.assessment_count, 0);
    }

    #[test]
    fn test_mastery_detail_not_found_without_record() {
        let (service, _db) = service();
        let ctx = LearnerContext::new("learner-1");
        service.upsert_topic(topic("t1")).unwrap();

        let err = service.get_topic_mastery(&ctx, "t1").unwrap_err();
        assert!(matches!(err, ProgressError::NotFound(_)));
    }

    #[test]
    fn test_recent_assessments_are_bounded_and_newest_first() {
        let (service, _db) = service();
        let ctx = LearnerContext::new("learner-1");
        service.upsert_topic(topic("t1")).unwrap();

        for i in 0..12 {
            service
                .record_assessment(&ctx, quiz("t1", i % 2 == 0, Some(i as f64 / 2.0)))
                .unwrap();
        }

        let detail = service.get_topic_mastery(&ctx, "t1").unwrap();
        assert_eq!(detail.progress.total_attempts, 12);
        assert_eq!(detail.recent_assessments.len(), 10);
        assert_eq!(detail.recent_assessments[0].score, Some(5.5));
    }

    #[test]
    fn test_bad_limits_and_windows() {
        let (service, _db) = service();
        let ctx = LearnerContext::new("learner-1");

        assert!(service.get_recommendations(&ctx, Some(MAX_RECOMMENDATION_LIMIT + 1)).is_err());
        assert!(service.get_analytics(&ctx, Some(0)).is_err());
        assert!(service
            .list_study_sessions(&ctx, SessionPage { limit: 0, ..Default::default() })
            .is_err());
    }

    #[test]
    fn test_zero_recommendation_limit_is_empty() {
        let (service, _db) = service();
        let ctx = LearnerContext::new("learner-1");
        service.upsert_topic(topic("t1")).unwrap();
        service.record_assessment(&ctx, quiz("t1", false, None)).unwrap();

        assert!(service.get_recommendations(&ctx, Some(0)).unwrap().is_empty());
        assert_eq!(service.get_recommendations(&ctx, Some(1)).unwrap().len(), 1);
    }

    #[test]
    fn test_goal_requires_known_topics() {
        let (service, _db) = service();
        let ctx = LearnerContext::new("learner-1");
        service.upsert_topic(topic("t1")).unwrap();

        let input: GoalInput =
            serde_json::from_str(r#"{"title":"Finish","target_topics":["t1","ghost"]}"#).unwrap();
        assert!(matches!(service.create_goal(&ctx, input), Err(ProgressError::InvalidInput(_))));
        assert!(service.list_goals(&ctx, false).unwrap().is_empty());
    }

    #[test]
    fn test_topic_cannot_require_itself() {
        let (service, _db) = service();
        let mut looped = topic("t1");
        looped.prerequisites = vec!["t1".into()];
        assert!(service.upsert_topic(looped).is_err());
    }
}
