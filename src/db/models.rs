//! Plain data records for the progress store
//!
//! Records reference each other by id only. A `ProgressRecord` does not own
//! its assessments; the assessment log is queried by `progress_record_id`.

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Enumerations
// ============================================================================

/// Discrete proficiency stage for a learner/topic pair.
///
/// Variant order is meaningful: later variants are higher levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MasteryLevel {
    NotStarted,
    Learning,
    Practicing,
    Mastered,
}

impl MasteryLevel {
    pub const ALL: [MasteryLevel; 4] = [
        MasteryLevel::NotStarted,
        MasteryLevel::Learning,
        MasteryLevel::Practicing,
        MasteryLevel::Mastered,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MasteryLevel::NotStarted => "not_started",
            MasteryLevel::Learning => "learning",
            MasteryLevel::Practicing => "practicing",
            MasteryLevel::Mastered => "mastered",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|level| level.as_str() == s)
    }

    /// Learning or practicing
    pub fn is_in_progress(&self) -> bool {
        matches!(self, MasteryLevel::Learning | MasteryLevel::Practicing)
    }
}

impl Default for MasteryLevel {
    fn default() -> Self {
        MasteryLevel::NotStarted
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssessmentType {
    Quiz,
    ProblemSolving,
    Discussion,
    SelfAssessment,
    AiEvaluation,
}

impl AssessmentType {
    pub const ALL: [AssessmentType; 5] = [
        AssessmentType::Quiz,
        AssessmentType::ProblemSolving,
        AssessmentType::Discussion,
        AssessmentType::SelfAssessment,
        AssessmentType::AiEvaluation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AssessmentType::Quiz => "quiz",
            AssessmentType::ProblemSolving => "problem_solving",
            AssessmentType::Discussion => "discussion",
            AssessmentType::SelfAssessment => "self_assessment",
            AssessmentType::AiEvaluation => "ai_evaluation",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == s)
    }
}

/// Priority shared by recommendations and goals
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "low" => Some(Priority::Low),
            "medium" => Some(Priority::Medium),
            "high" => Some(Priority::High),
            _ => None,
        }
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Medium
    }
}

/// Ordering for assessment history reads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Chronological,
    MostRecentFirst,
}

macro_rules! text_enum_sql {
    ($ty:ty, $what:literal) => {
        impl ToSql for $ty {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.as_str()))
            }
        }

        impl FromSql for $ty {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                let s = value.as_str()?;
                <$ty>::parse(s).ok_or_else(|| {
                    FromSqlError::Other(format!("unknown {} '{}'", $what, s).into())
                })
            }
        }
    };
}

text_enum_sql!(MasteryLevel, "mastery level");
text_enum_sql!(AssessmentType, "assessment type");
text_enum_sql!(Priority, "priority");

// ============================================================================
// Progress
// ============================================================================

/// Mutable per-(learner, topic) ledger entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub id: String,
    pub learner_id: String,
    pub topic_id: String,
    pub mastery_level: MasteryLevel,
    pub confidence_score: f64,
    pub time_spent_minutes: u32,
    pub total_attempts: u32,
    pub successful_attempts: u32,
    pub success_rate: f64,
    pub first_attempt_at: Option<DateTime<Utc>>,
    pub last_practice_at: Option<DateTime<Utc>>,
    pub mastery_achieved_at: Option<DateTime<Utc>>,
    pub perceived_difficulty: Option<f64>,
    pub engagement_level: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProgressRecord {
    /// Fresh record for a pair that has no history yet
    pub fn new(learner_id: &str, topic_id: &str, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            learner_id: learner_id.to_string(),
            topic_id: topic_id.to_string(),
            mastery_level: MasteryLevel::NotStarted,
            confidence_score: 0.0,
            time_spent_minutes: 0,
            total_attempts: 0,
            successful_attempts: 0,
            success_rate: 0.0,
            first_attempt_at: None,
            last_practice_at: None,
            mastery_achieved_at: None,
            perceived_difficulty: None,
            engagement_level: None,
            created_at: now,
            updated_at: now,
        }
    }
}

// ============================================================================
// Assessments
// ============================================================================

/// Structured feedback attached to an assessment.
///
/// Anything a producer sends beyond the recognized fields goes in
/// `extension`, never at the top level.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AssessmentFeedback {
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub weaknesses: Vec<String>,
    #[serde(default)]
    pub suggested_improvements: Vec<String>,
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub extension: serde_json::Map<String, serde_json::Value>,
}

/// Immutable entry in the assessment log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentRecord {
    pub id: String,
    pub progress_record_id: String,
    pub assessment_type: AssessmentType,
    pub question: Option<String>,
    pub response: Option<String>,
    pub score: Option<f64>,
    pub max_score: Option<f64>,
    pub is_correct: Option<bool>,
    pub time_taken_seconds: Option<u32>,
    pub feedback: Option<AssessmentFeedback>,
    pub conversation_id: Option<String>,
    pub document_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Topics
// ============================================================================

/// Topic metadata produced by document ingestion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topic {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub difficulty_level: Option<String>,
    #[serde(default)]
    pub estimated_time_minutes: Option<u32>,
    /// Ordered prerequisite topic ids
    #[serde(default)]
    pub prerequisites: Vec<String>,
}

// ============================================================================
// Study sessions
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudySession {
    pub id: String,
    pub learner_id: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub subject: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration_minutes: Option<u32>,
    pub topics_studied: Vec<String>,
    pub documents_reviewed: Vec<String>,
    pub focus_score: Option<f64>,
    pub difficulty_encountered: Option<f64>,
    pub satisfaction: Option<f64>,
    pub session_goals: Vec<String>,
    pub goals_achieved: Vec<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Goals
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningGoal {
    pub id: String,
    pub learner_id: String,
    pub title: String,
    pub description: Option<String>,
    pub subject: Option<String>,
    pub target_topics: Vec<String>,
    pub target_mastery_level: MasteryLevel,
    pub target_date: Option<NaiveDate>,
    pub priority: Priority,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}
