//! Mastery ledger rules
//!
//! Pure transitions over a [`ProgressRecord`]. Nothing here touches storage;
//! the service loads the record, applies one of these functions, and writes
//! the result back inside a single store unit.
//!
//! ## Classification
//!
//! | Level | Attempts | Success rate | Confidence |
//! |-------|----------|--------------|------------|
//! | mastered | >= 5 | >= 0.9 | >= 0.8 |
//! | practicing | >= 3 | >= 0.7 | - |
//! | learning | >= 1 | - | - |
//! | not_started | 0 | - | - |
//!
//! Higher rows are checked first.

use chrono::{DateTime, Utc};

use crate::db::models::{MasteryLevel, ProgressRecord};

pub const MASTERED_MIN_ATTEMPTS: u32 = 5;
pub const MASTERED_MIN_SUCCESS_RATE: f64 = 0.9;
pub const MASTERED_MIN_CONFIDENCE: f64 = 0.8;
pub const PRACTICING_MIN_ATTEMPTS: u32 = 3;
pub const PRACTICING_MIN_SUCCESS_RATE: f64 = 0.7;

/// Classify a record from its counters alone
pub fn classify(total_attempts: u32, success_rate: f64, confidence: f64) -> MasteryLevel {
    if total_attempts >= MASTERED_MIN_ATTEMPTS
        && success_rate >= MASTERED_MIN_SUCCESS_RATE
        && confidence >= MASTERED_MIN_CONFIDENCE
    {
        MasteryLevel::Mastered
    } else if total_attempts >= PRACTICING_MIN_ATTEMPTS && success_rate >= PRACTICING_MIN_SUCCESS_RATE {
        MasteryLevel::Practicing
    } else if total_attempts >= 1 {
        MasteryLevel::Learning
    } else {
        MasteryLevel::NotStarted
    }
}

/// successful / total, or 0 with no attempts
pub fn success_rate(successful_attempts: u32, total_attempts: u32) -> f64 {
    if total_attempts == 0 {
        0.0
    } else {
        successful_attempts as f64 / total_attempts as f64
    }
}

/// Level change produced by one ledger operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub previous: MasteryLevel,
    pub current: MasteryLevel,
    /// True only the first time a record reaches mastered
    pub newly_mastered: bool,
}

/// Partial manual update. Absent fields leave the record unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ManualUpdate {
    pub mastery_level: Option<MasteryLevel>,
    pub confidence_score: Option<f64>,
    /// Added to the running total
    pub time_spent_minutes: Option<u32>,
    pub perceived_difficulty: Option<f64>,
    pub engagement_level: Option<f64>,
}

fn enter_level(record: &mut ProgressRecord, level: MasteryLevel, now: DateTime<Utc>) -> Transition {
    let previous = record.mastery_level;
    record.mastery_level = level;

    let newly_mastered = level == MasteryLevel::Mastered && record.mastery_achieved_at.is_none();
    if newly_mastered {
        record.mastery_achieved_at = Some(now);
    }

    Transition {
        previous,
        current: level,
        newly_mastered,
    }
}

/// Count one attempt and reclassify
pub fn apply_assessment(record: &mut ProgressRecord, is_correct: Option<bool>, now: DateTime<Utc>) -> Transition {
    record.total_attempts = record.total_attempts.saturating_add(1);
    if is_correct == Some(true) {
        record.successful_attempts = record.successful_attempts.saturating_add(1);
    }
    record.success_rate = success_rate(record.successful_attempts, record.total_attempts);

    record.last_practice_at = Some(now);
    if record.first_attempt_at.is_none() {
        record.first_attempt_at = Some(now);
    }
    record.updated_at = now;

    let level = classify(record.total_attempts, record.success_rate, record.confidence_score);
    enter_level(record, level, now)
}

/// Apply a partial update.
///
/// An explicit `mastery_level` wins for this update; otherwise the record is
/// reclassified so a confidence change can move it either way.
pub fn apply_manual_update(record: &mut ProgressRecord, update: &ManualUpdate, now: DateTime<Utc>) -> Transition {
    if let Some(confidence) = update.confidence_score {
        record.confidence_score = confidence;
    }
    if let Some(minutes) = update.time_spent_minutes {
        record.time_spent_minutes = record.time_spent_minutes.saturating_add(minutes);
    }
    if let Some(difficulty) = update.perceived_difficulty {
        record.perceived_difficulty = Some(difficulty);
    }
    if let Some(engagement) = update.engagement_level {
        record.engagement_level = Some(engagement);
    }

    record.last_practice_at = Some(now);
    record.updated_at = now;

    let level = update.mastery_level.unwrap_or_else(|| {
        classify(record.total_attempts, record.success_rate, record.confidence_score)
    });
    enter_level(record, level, now)
}
