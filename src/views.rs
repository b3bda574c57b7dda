//! Input and view types for the service boundary
//!
//! Inputs reject unknown fields. Free-form metadata is only accepted inside
//! `AssessmentFeedback::extension`.
//!
//! Pattern:
//! - HTTP layer deserializes `*Input` types and hands them to the service
//! - Service validates, applies, and returns the view types below
//! - Records from `db::models` are never sent raw where a view exists

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::models::{
    AssessmentFeedback, AssessmentRecord, AssessmentType, LearningGoal, MasteryLevel, Priority,
    ProgressRecord, StudySession, Topic,
};
use crate::error::ProgressError;
use crate::mastery::ManualUpdate;

fn check_unit_range(name: &str, value: Option<f64>, min: f64, max: f64) -> Result<(), ProgressError> {
    match value {
        Some(v) if !(min..=max).contains(&v) => Err(ProgressError::invalid(format!(
            "{} must be between {} and {}, got {}",
            name, min, max, v
        ))),
        _ => Ok(()),
    }
}

fn check_topic_id(topic_id: &str) -> Result<(), ProgressError> {
    if topic_id.trim().is_empty() {
        return Err(ProgressError::invalid("topic_id is required"));
    }
    Ok(())
}

// ============================================================================
// Assessment Input
// ============================================================================

/// One assessment attempt reported by a client or grader
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AssessmentInput {
    pub topic_id: String,
    pub assessment_type: AssessmentType,
    #[serde(default)]
    pub question: Option<String>,
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub max_score: Option<f64>,
    #[serde(default)]
    pub is_correct: Option<bool>,
    #[serde(default)]
    pub time_taken_seconds: Option<u32>,
    #[serde(default)]
    pub feedback: Option<AssessmentFeedback>,
    #[serde(default)]
    pub conversation_id: Option<String>,
    #[serde(default)]
    pub document_id: Option<String>,
}

impl AssessmentInput {
    /// Check shape and ranges. Topic existence is checked by the service.
    pub fn validate(&self) -> Result<(), ProgressError> {
        check_topic_id(&self.topic_id)?;

        if let Some(max) = self.max_score {
            if !(max.is_finite() && max > 0.0) {
                return Err(ProgressError::invalid(format!("max_score must be positive, got {}", max)));
            }
        }

        if let Some(score) = self.score {
            let upper = self.max_score.unwrap_or(f64::INFINITY);
            if !(score.is_finite() && score >= 0.0 && score <= upper) {
                return Err(ProgressError::invalid(format!(
                    "score {} is outside [0, {}]",
                    score,
                    self.max_score.map(|m| m.to_string()).unwrap_or_else(|| "inf".into())
                )));
            }
        }

        Ok(())
    }

    /// Log entry for this attempt against `progress_record_id`
    pub fn to_record(&self, progress_record_id: &str, now: DateTime<Utc>) -> AssessmentRecord {
        AssessmentRecord {
            id: Uuid::new_v4().to_string(),
            progress_record_id: progress_record_id.to_string(),
            assessment_type: self.assessment_type,
            question: self.question.clone(),
            response: self.response.clone(),
            score: self.score,
            max_score: self.max_score,
            is_correct: self.is_correct,
            time_taken_seconds: self.time_taken_seconds,
            feedback: self.feedback.clone(),
            conversation_id: self.conversation_id.clone(),
            document_id: self.document_id.clone(),
            created_at: now,
        }
    }
}

// ============================================================================
// Progress Update Input
// ============================================================================

/// Partial manual update for one topic
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProgressUpdateInput {
    pub topic_id: String,
    #[serde(default)]
    pub mastery_level: Option<MasteryLevel>,
    #[serde(default)]
    pub confidence_score: Option<f64>,
    /// Minutes to add
    #[serde(default)]
    pub time_spent_minutes: Option<u32>,
    #[serde(default)]
    pub perceived_difficulty: Option<f64>,
    #[serde(default)]
    pub engagement_level: Option<f64>,
}

impl ProgressUpdateInput {
    pub fn validate(&self) -> Result<(), ProgressError> {
        check_topic_id(&self.topic_id)?;
        check_unit_range("confidence_score", self.confidence_score, 0.0, 1.0)?;
        check_unit_range("perceived_difficulty", self.perceived_difficulty, 1.0, 5.0)?;
        check_unit_range("engagement_level", self.engagement_level, 1.0, 5.0)?;
        Ok(())
    }
}

impl From<&ProgressUpdateInput> for ManualUpdate {
    fn from(v: &ProgressUpdateInput) -> Self {
        Self {
            mastery_level: v.mastery_level,
            confidence_score: v.confidence_score,
            time_spent_minutes: v.time_spent_minutes,
            perceived_difficulty: v.perceived_difficulty,
            engagement_level: v.engagement_level,
        }
    }
}

// ============================================================================
// Study Session Input
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StudySessionInput {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    pub start_time: DateTime<Utc>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub duration_minutes: Option<u32>,
    #[serde(default)]
    pub topics_studied: Vec<String>,
    #[serde(default)]
    pub documents_reviewed: Vec<String>,
    #[serde(default)]
    pub focus_score: Option<f64>,
    #[serde(default)]
    pub difficulty_encountered: Option<f64>,
    #[serde(default)]
    pub satisfaction: Option<f64>,
    #[serde(default)]
    pub session_goals: Vec<String>,
    #[serde(default)]
    pub goals_achieved: Vec<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl StudySessionInput {
    pub fn validate(&self) -> Result<(), ProgressError> {
        if let Some(end) = self.end_time {
            if end < self.start_time {
                return Err(ProgressError::invalid("end_time is before start_time"));
            }
        }
        check_unit_range("focus_score", self.focus_score, 1.0, 5.0)?;
        check_unit_range("difficulty_encountered", self.difficulty_encountered, 1.0, 5.0)?;
        check_unit_range("satisfaction", self.satisfaction, 1.0, 5.0)?;
        Ok(())
    }

    /// Build the stored session. Duration falls back to end - start in whole minutes.
    pub fn into_session(self, learner_id: &str, now: DateTime<Utc>) -> StudySession {
        let duration_minutes = self.duration_minutes.or_else(|| {
            self.end_time
                .map(|end| (end - self.start_time).num_minutes())
                .and_then(|minutes| u32::try_from(minutes).ok())
        });

        StudySession {
            id: Uuid::new_v4().to_string(),
            learner_id: learner_id.to_string(),
            title: self.title,
            description: self.description,
            subject: self.subject,
            start_time: self.start_time,
            end_time: self.end_time,
            duration_minutes,
            topics_studied: self.topics_studied,
            documents_reviewed: self.documents_reviewed,
            focus_score: self.focus_score,
            difficulty_encountered: self.difficulty_encountered,
            satisfaction: self.satisfaction,
            session_goals: self.session_goals,
            goals_achieved: self.goals_achieved,
            notes: self.notes,
            created_at: now,
        }
    }
}

// ============================================================================
// Goal Input
// ============================================================================

fn default_goal_level() -> MasteryLevel {
    MasteryLevel::Mastered
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GoalInput {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    pub target_topics: Vec<String>,
    #[serde(default = "default_goal_level")]
    pub target_mastery_level: MasteryLevel,
    #[serde(default)]
    pub target_date: Option<NaiveDate>,
    #[serde(default)]
    pub priority: Priority,
}

impl GoalInput {
    /// Shape checks. Target topic existence is checked by the service.
    pub fn validate(&self) -> Result<(), ProgressError> {
        if self.title.trim().is_empty() {
            return Err(ProgressError::invalid("title is required"));
        }
        if self.target_topics.is_empty() {
            return Err(ProgressError::invalid("target_topics must not be empty"));
        }
        for topic_id in &self.target_topics {
            check_topic_id(topic_id)?;
        }
        Ok(())
    }

    pub fn into_goal(self, learner_id: &str, now: DateTime<Utc>) -> LearningGoal {
        LearningGoal {
            id: Uuid::new_v4().to_string(),
            learner_id: learner_id.to_string(),
            title: self.title.trim().to_string(),
            description: self.description,
            subject: self.subject,
            target_topics: self.target_topics,
            target_mastery_level: self.target_mastery_level,
            target_date: self.target_date,
            priority: self.priority,
            is_active: true,
            created_at: now,
        }
    }
}

// ============================================================================
// Topic Input
// ============================================================================

/// Topic body for `PUT /topics/{id}`; the id comes from the path
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TopicInput {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub difficulty_level: Option<String>,
    #[serde(default)]
    pub estimated_time_minutes: Option<u32>,
    #[serde(default)]
    pub prerequisites: Vec<String>,
}

impl TopicInput {
    pub fn into_topic(self, id: &str) -> Topic {
        Topic {
            id: id.to_string(),
            title: self.title,
            description: self.description,
            subject: self.subject,
            difficulty_level: self.difficulty_level,
            estimated_time_minutes: self.estimated_time_minutes,
            prerequisites: self.prerequisites,
        }
    }
}

// ============================================================================
// Mastery Views
// ============================================================================

/// Ledger state returned after a write
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MasterySummary {
    pub topic_id: String,
    pub mastery_level: MasteryLevel,
    pub confidence_score: f64,
    pub success_rate: f64,
    pub total_attempts: u32,
    pub successful_attempts: u32,
    pub time_spent_minutes: u32,
    pub last_practice_at: Option<DateTime<Utc>>,
    pub mastery_achieved_at: Option<DateTime<Utc>>,
}

impl From<&ProgressRecord> for MasterySummary {
    fn from(r: &ProgressRecord) -> Self {
        Self {
            topic_id: r.topic_id.clone(),
            mastery_level: r.mastery_level,
            confidence_score: r.confidence_score,
            success_rate: r.success_rate,
            total_attempts: r.total_attempts,
            successful_attempts: r.successful_attempts,
            time_spent_minutes: r.time_spent_minutes,
            last_practice_at: r.last_practice_at,
            mastery_achieved_at: r.mastery_achieved_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicInfo {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub difficulty_level: Option<String>,
}

impl From<&Topic> for TopicInfo {
    fn from(t: &Topic) -> Self {
        Self {
            id: t.id.clone(),
            title: t.title.clone(),
            description: t.description.clone(),
            difficulty_level: t.difficulty_level.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentAssessment {
    #[serde(rename = "type")]
    pub assessment_type: AssessmentType,
    pub score: Option<f64>,
    pub max_score: Option<f64>,
    pub is_correct: Option<bool>,
    pub created_at: DateTime<Utc>,
}

impl From<AssessmentRecord> for RecentAssessment {
    fn from(a: AssessmentRecord) -> Self {
        Self {
            assessment_type: a.assessment_type,
            score: a.score,
            max_score: a.max_score,
            is_correct: a.is_correct,
            created_at: a.created_at,
        }
    }
}

/// Detail view for one (learner, topic) pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicMasteryDetail {
    pub topic: TopicInfo,
    pub progress: MasterySummary,
    /// Most recent first
    pub recent_assessments: Vec<RecentAssessment>,
}

// ============================================================================
// Session Views
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub id: String,
    pub title: Option<String>,
    pub subject: Option<String>,
    pub start_time: DateTime<Utc>,
    pub duration_minutes: Option<u32>,
    pub focus_score: Option<f64>,
    pub satisfaction: Option<f64>,
    pub topics_count: usize,
}

impl From<StudySession> for SessionSummary {
    fn from(s: StudySession) -> Self {
        Self {
            id: s.id,
            title: s.title,
            subject: s.subject,
            start_time: s.start_time,
            duration_minutes: s.duration_minutes,
            focus_score: s.focus_score,
            satisfaction: s.satisfaction,
            topics_count: s.topics_studied.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn assessment(score: Option<f64>, max_score: Option<f64>) -> AssessmentInput {
        AssessmentInput {
            topic_id: "t1".into(),
            assessment_type: AssessmentType::Quiz,
            question: None,
            response: None,
            score,
            max_score,
            is_correct: None,
            time_taken_seconds: None,
            feedback: None,
            conversation_id: None,
            document_id: None,
        }
    }

    #[test]
    fn test_score_bounds() {
        assert!(assessment(Some(8.0), Some(10.0)).validate().is_ok());
        assert!(assessment(None, None).validate().is_ok());
        assert!(assessment(Some(11.0), Some(10.0)).validate().is_err());
        assert!(assessment(Some(-1.0), None).validate().is_err());
        assert!(assessment(Some(0.0), Some(0.0)).validate().is_err());
        assert!(assessment(Some(f64::NAN), None).validate().is_err());
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let err = serde_json::from_str::<AssessmentInput>(
            r#"{"topic_id":"t1","assessment_type":"quiz","mood":"tired"}"#,
        );
        assert!(err.is_err());

        let ok = serde_json::from_str::<AssessmentInput>(
            r#"{"topic_id":"t1","assessment_type":"quiz","feedback":{"extension":{"mood":"tired"}}}"#,
        )
        .unwrap();
        assert_eq!(ok.feedback.unwrap().extension["mood"], "tired");

        assert!(serde_json::from_str::<ProgressUpdateInput>(r#"{"topic_id":"t1","xp":3}"#).is_err());
    }

    #[test]
    fn test_progress_update_ranges() {
        let input: ProgressUpdateInput =
            serde_json::from_str(r#"{"topic_id":"t1","confidence_score":1.2}"#).unwrap();
        assert!(matches!(input.validate(), Err(ProgressError::InvalidInput(_))));

        let input: ProgressUpdateInput =
            serde_json::from_str(r#"{"topic_id":"t1","engagement_level":0.5}"#).unwrap();
        assert!(input.validate().is_err());

        let input: ProgressUpdateInput =
            serde_json::from_str(r#"{"topic_id":"t1","mastery_level":"practicing","time_spent_minutes":5}"#)
                .unwrap();
        assert!(input.validate().is_ok());
        let update = ManualUpdate::from(&input);
        assert_eq!(update.mastery_level, Some(MasteryLevel::Practicing));
    }

    #[test]
    fn test_session_duration_derivation() {
        let start = Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap();
        let input = StudySessionInput {
            title: None,
            description: None,
            subject: None,
            start_time: start,
            end_time: Some(start + Duration::seconds(50 * 60 + 30)),
            duration_minutes: None,
            topics_studied: vec!["t1".into()],
            documents_reviewed: vec![],
            focus_score: Some(4.0),
            difficulty_encountered: None,
            satisfaction: None,
            session_goals: vec![],
            goals_achieved: vec![],
            notes: None,
        };
        assert!(input.validate().is_ok());
        let session = input.clone().into_session("learner-1", start);
        assert_eq!(session.duration_minutes, Some(50));

        let explicit = StudySessionInput {
            duration_minutes: Some(20),
            ..input.clone()
        };
        assert_eq!(explicit.into_session("learner-1", start).duration_minutes, Some(20));

        let backwards = StudySessionInput {
            end_time: Some(start - Duration::minutes(1)),
            ..input.clone()
        };
        assert!(backwards.validate().is_err());

        let bad_focus = StudySessionInput {
            focus_score: Some(6.0),
            ..input
        };
        assert!(bad_focus.validate().is_err());
    }

    #[test]
    fn test_goal_input_defaults_and_checks() {
        let goal: GoalInput =
            serde_json::from_str(r#"{"title":"Calculus","target_topics":["limits"]}"#).unwrap();
        assert!(goal.validate().is_ok());
        assert_eq!(goal.target_mastery_level, MasteryLevel::Mastered);
        assert_eq!(goal.priority, Priority::Medium);

        let empty: GoalInput = serde_json::from_str(r#"{"title":"x","target_topics":[]}"#).unwrap();
        assert!(empty.validate().is_err());

        let blank: GoalInput = serde_json::from_str(r#"{"title":" ","target_topics":["a"]}"#).unwrap();
        assert!(blank.validate().is_err());
    }
}
