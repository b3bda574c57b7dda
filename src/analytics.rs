//! Windowed learning analytics

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::db::models::{MasteryLevel, ProgressRecord, StudySession};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Period {
    pub days: u32,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudyTime {
    pub total_minutes: u64,
    pub average_session_minutes: f64,
    pub sessions_count: usize,
    pub daily_average_minutes: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressTotals {
    pub active_topics: usize,
    pub topics_mastered: usize,
    pub topics_in_progress: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Performance {
    pub average_success_rate: f64,
    pub average_confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analytics {
    pub period: Period,
    pub study_time: StudyTime,
    pub progress: ProgressTotals,
    pub performance: Performance,
}

/// Start of a `days`-long window ending at `end`
pub fn window_start(end: DateTime<Utc>, days: u32) -> DateTime<Utc> {
    end - Duration::days(days as i64)
}

fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Aggregate over the window ending at `now`.
///
/// Sessions and records outside the window are ignored here, so callers may
/// pass unfiltered lists. `days` must be at least 1.
pub fn summarize(
    sessions: &[StudySession],
    records: &[ProgressRecord],
    now: DateTime<Utc>,
    days: u32,
) -> Analytics {
    let start = window_start(now, days);

    let in_window: Vec<&StudySession> = sessions.iter().filter(|s| s.start_time >= start).collect();
    let total_minutes: u64 = in_window
        .iter()
        .map(|s| s.duration_minutes.unwrap_or(0) as u64)
        .sum();
    let average_session_minutes = if in_window.is_empty() {
        0.0
    } else {
        total_minutes as f64 / in_window.len() as f64
    };

    let active: Vec<&ProgressRecord> = records
        .iter()
        .filter(|r| r.last_practice_at.is_some_and(|at| at >= start))
        .collect();

    let (average_success_rate, average_confidence) = if active.is_empty() {
        (0.0, 0.0)
    } else {
        let n = active.len() as f64;
        (
            active.iter().map(|r| r.success_rate).sum::<f64>() / n,
            active.iter().map(|r| r.confidence_score).sum::<f64>() / n,
        )
    };

    Analytics {
        period: Period {
            days,
            start_date: start,
            end_date: now,
        },
        study_time: StudyTime {
            total_minutes,
            average_session_minutes: round_tenth(average_session_minutes),
            sessions_count: in_window.len(),
            daily_average_minutes: round_tenth(total_minutes as f64 / days.max(1) as f64),
        },
        progress: ProgressTotals {
            active_topics: active.len(),
            topics_mastered: active
                .iter()
                .filter(|r| r.mastery_level == MasteryLevel::Mastered)
                .count(),
            topics_in_progress: active.iter().filter(|r| r.mastery_level.is_in_progress()).count(),
        },
        performance: Performance {
            average_success_rate,
            average_confidence,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 30, 12, 0, 0).unwrap()
    }

    fn session(days_ago: i64, minutes: Option<u32>) -> StudySession {
        let start = now() - Duration::days(days_ago);
        StudySession {
            id: format!("s{}", days_ago),
            learner_id: "learner-1".into(),
            title: None,
            description: None,
            subject: None,
            start_time: start,
            end_time: None,
            duration_minutes: minutes,
            topics_studied: vec![],
            documents_reviewed: vec![],
            focus_score: None,
            difficulty_encountered: None,
            satisfaction: None,
            session_goals: vec![],
            goals_achieved: vec![],
            notes: None,
            created_at: start,
        }
    }

    fn record(topic: &str, level: MasteryLevel, days_ago: Option<i64>, rate: f64, confidence: f64) -> ProgressRecord {
        let mut record = ProgressRecord::new("learner-1", topic, now());
        record.mastery_level = level;
        record.last_practice_at = days_ago.map(|d| now() - Duration::days(d));
        record.success_rate = rate;
        record.confidence_score = confidence;
        record
    }

    #[test]
    fn test_empty_window() {
        let analytics = summarize(&[], &[], now(), 30);
        assert_eq!(analytics.study_time.total_minutes, 0);
        assert_eq!(analytics.study_time.average_session_minutes, 0.0);
        assert_eq!(analytics.progress.active_topics, 0);
        assert_eq!(analytics.performance.average_confidence, 0.0);
        assert_eq!(analytics.period.start_date, now() - Duration::days(30));
    }

    #[test]
    fn test_window_math() {
        let sessions = vec![
            session(1, Some(30)),
            session(2, Some(40)),
            session(3, None),
            session(10, Some(500)),
        ];
        let records = vec![
            record("a", MasteryLevel::Mastered, Some(1), 1.0, 0.9),
            record("b", MasteryLevel::Learning, Some(5), 0.5, 0.5),
            record("c", MasteryLevel::Practicing, Some(20), 0.8, 0.7),
            record("d", MasteryLevel::NotStarted, None, 0.0, 0.0),
        ];

        let analytics = summarize(&sessions, &records, now(), 7);

        assert_eq!(analytics.study_time.sessions_count, 3);
        assert_eq!(analytics.study_time.total_minutes, 70);
        assert_eq!(analytics.study_time.average_session_minutes, 23.3);
        assert_eq!(analytics.study_time.daily_average_minutes, 10.0);

        assert_eq!(
            analytics.progress,
            ProgressTotals {
                active_topics: 2,
                topics_mastered: 1,
                topics_in_progress: 1,
            }
        );
        assert_eq!(analytics.performance.average_success_rate, 0.75);
        assert!((analytics.performance.average_confidence - 0.7).abs() < 1e-9);
    }
}
