//! Recommendation engine
//!
//! Two sources, never interleaved: review entries for weak ledger records
//! come first, then newly ready topics from the prerequisite resolver fill
//! whatever slots remain.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::db::models::{Priority, ProgressRecord, Topic};

pub const REVIEW_SUCCESS_RATE_BELOW: f64 = 0.7;
pub const REVIEW_CONFIDENCE_BELOW: f64 = 0.6;
pub const HIGH_PRIORITY_SUCCESS_RATE_BELOW: f64 = 0.5;
pub const REVIEW_ESTIMATE_MINUTES: u32 = 45;
pub const NEW_TOPIC_DEFAULT_MINUTES: u32 = 60;

const REVIEW_ACTION: &str = "Review fundamentals and practice problems";
const NEW_TOPIC_ACTION: &str = "Start learning this new topic";
const NEW_TOPIC_REASON: &str = "Prerequisites completed";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationKind {
    Review,
    NewTopic,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    #[serde(rename = "type")]
    pub kind: RecommendationKind,
    pub priority: Priority,
    pub topic_id: String,
    pub topic_title: String,
    pub reason: String,
    pub suggested_action: String,
    pub estimated_time_minutes: u32,
}

fn needs_review(record: &ProgressRecord) -> bool {
    record.success_rate < REVIEW_SUCCESS_RATE_BELOW || record.confidence_score < REVIEW_CONFIDENCE_BELOW
}

fn review_entry(record: &ProgressRecord, topic: &Topic) -> Recommendation {
    let priority = if record.success_rate < HIGH_PRIORITY_SUCCESS_RATE_BELOW {
        Priority::High
    } else {
        Priority::Medium
    };

    Recommendation {
        kind: RecommendationKind::Review,
        priority,
        topic_id: topic.id.clone(),
        topic_title: topic.title.clone(),
        reason: format!("Low success rate ({:.1}%)", record.success_rate * 100.0),
        suggested_action: REVIEW_ACTION.to_string(),
        estimated_time_minutes: REVIEW_ESTIMATE_MINUTES,
    }
}

fn new_topic_entry(topic: &Topic) -> Recommendation {
    Recommendation {
        kind: RecommendationKind::NewTopic,
        priority: Priority::Medium,
        topic_id: topic.id.clone(),
        topic_title: topic.title.clone(),
        reason: NEW_TOPIC_REASON.to_string(),
        suggested_action: NEW_TOPIC_ACTION.to_string(),
        estimated_time_minutes: topic.estimated_time_minutes.unwrap_or(NEW_TOPIC_DEFAULT_MINUTES),
    }
}

/// Rank recommendations, at most `limit` entries.
///
/// `records` keep their given order among review entries; `ready` is the
/// resolver output in its own order.
pub fn recommend(
    records: &[ProgressRecord],
    topics: &HashMap<&str, &Topic>,
    ready: &[&Topic],
    limit: usize,
) -> Vec<Recommendation> {
    let mut out: Vec<Recommendation> = records
        .iter()
        .filter(|record| needs_review(record))
        .filter_map(|record| {
            topics
                .get(record.topic_id.as_str())
                .map(|topic| review_entry(record, topic))
        })
        .take(limit)
        .collect();

    let remaining = limit.saturating_sub(out.len());
    out.extend(ready.iter().take(remaining).map(|topic| new_topic_entry(topic)));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn topic(id: &str, estimate: Option<u32>) -> Topic {
        Topic {
            id: id.to_string(),
            title: format!("Topic {}", id),
            description: None,
            subject: None,
            difficulty_level: None,
            estimated_time_minutes: estimate,
            prerequisites: vec![],
        }
    }

    fn record(topic_id: &str, success_rate: f64, confidence: f64) -> ProgressRecord {
        let mut record = ProgressRecord::new("learner-1", topic_id, Utc::now());
        record.success_rate = success_rate;
        record.confidence_score = confidence;
        record
    }

    #[test]
    fn test_review_entries_precede_new_topics() {
        let catalog = vec![topic("a", None), topic("b", None), topic("c", Some(25)), topic("d", None)];
        let lookup: HashMap<&str, &Topic> = catalog.iter().map(|t| (t.id.as_str(), t)).collect();
        let records = vec![
            record("a", 0.4, 0.9),
            record("b", 0.95, 0.9),
            record("d", 0.8, 0.5),
            record("unknown", 0.1, 0.1),
        ];
        let ready = vec![&catalog[2]];

        let recs = recommend(&records, &lookup, &ready, 10);
        assert_eq!(recs.len(), 3);

        assert_eq!(recs[0].topic_id, "a");
        assert_eq!(recs[0].priority, Priority::High);
        assert_eq!(recs[0].reason, "Low success rate (40.0%)");
        assert_eq!(recs[0].estimated_time_minutes, REVIEW_ESTIMATE_MINUTES);

        assert_eq!(recs[1].topic_id, "d");
        assert_eq!(recs[1].priority, Priority::Medium);

        assert_eq!(recs[2].kind, RecommendationKind::NewTopic);
        assert_eq!(recs[2].reason, "Prerequisites completed");
        assert_eq!(recs[2].estimated_time_minutes, 25);

        let first_new = recs.iter().position(|r| r.kind == RecommendationKind::NewTopic).unwrap();
        assert!(recs[first_new..].iter().all(|r| r.kind == RecommendationKind::NewTopic));
    }

    #[test]
    fn test_limit_is_respected() {
        let catalog = vec![topic("a", None), topic("b", None), topic("c", None)];
        let lookup: HashMap<&str, &Topic> = catalog.iter().map(|t| (t.id.as_str(), t)).collect();
        let records = vec![record("a", 0.0, 0.0), record("b", 0.0, 0.0)];
        let ready = vec![&catalog[2]];

        let recs = recommend(&records, &lookup, &ready, 2);
        assert_eq!(recs.len(), 2);
        assert!(recs.iter().all(|r| r.kind == RecommendationKind::Review));

        assert!(recommend(&records, &lookup, &ready, 0).is_empty());

        let new_only = recommend(&[], &lookup, &ready, 5);
        assert_eq!(new_only.len(), 1);
        assert_eq!(new_only[0].estimated_time_minutes, NEW_TOPIC_DEFAULT_MINUTES);
    }

    #[test]
    fn test_wire_shape() {
        let catalog = vec![topic("a", None)];
        let ready = vec![&catalog[0]];
        let recs = recommend(&[], &HashMap::new(), &ready, 1);
        let json = serde_json::to_value(&recs[0]).unwrap();
        assert_eq!(json["type"], "new_topic");
        assert_eq!(json["priority"], "medium");
    }
}
