//! Skill heatmap aggregation
//!
//! Groups a learner's ledger entries by topic subject for presentation.
//! Records whose topic is not in the catalog are left out.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::models::{MasteryLevel, ProgressRecord, Topic};

/// Bucket for topics without a subject
pub const GENERAL_SUBJECT: &str = "General";
pub const DEFAULT_DIFFICULTY: &str = "intermediate";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeatmapCell {
    pub topic_id: String,
    pub name: String,
    pub mastery: MasteryLevel,
    pub confidence: f64,
    pub time_spent: u32,
    pub success_rate: f64,
    pub difficulty: String,
    pub last_practice: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectRow {
    pub subject: String,
    pub topics: Vec<HeatmapCell>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeatmapSummary {
    pub total_topics: usize,
    pub mastered_topics: usize,
    pub in_progress_topics: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Heatmap {
    pub heatmap: Vec<SubjectRow>,
    pub summary: HeatmapSummary,
}

/// Build the heatmap. Subjects come out sorted by name, topics by id.
pub fn build_heatmap(records: &[ProgressRecord], topics: &HashMap<&str, &Topic>) -> Heatmap {
    let mut grouped: BTreeMap<String, Vec<HeatmapCell>> = BTreeMap::new();
    let mut summary = HeatmapSummary::default();

    for record in records {
        let Some(topic) = topics.get(record.topic_id.as_str()) else {
            continue;
        };

        summary.total_topics += 1;
        if record.mastery_level == MasteryLevel::Mastered {
            summary.mastered_topics += 1;
        } else if record.mastery_level.is_in_progress() {
            summary.in_progress_topics += 1;
        }

        let subject = topic.subject.clone().unwrap_or_else(|| GENERAL_SUBJECT.to_string());
        grouped.entry(subject).or_default().push(HeatmapCell {
            topic_id: topic.id.clone(),
            name: topic.title.clone(),
            mastery: record.mastery_level,
            confidence: record.confidence_score,
            time_spent: record.time_spent_minutes,
            success_rate: record.success_rate,
            difficulty: topic
                .difficulty_level
                .clone()
                .unwrap_or_else(|| DEFAULT_DIFFICULTY.to_string()),
            last_practice: record.last_practice_at,
        });
    }

    let heatmap = grouped
        .into_iter()
        .map(|(subject, mut cells)| {
            cells.sort_by(|a, b| a.topic_id.cmp(&b.topic_id));
            SubjectRow { subject, topics: cells }
        })
        .collect();

    Heatmap { heatmap, summary }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn topic(id: &str, subject: Option<&str>, difficulty: Option<&str>) -> Topic {
        Topic {
            id: id.to_string(),
            title: format!("Topic {}", id),
            description: None,
            subject: subject.map(String::from),
            difficulty_level: difficulty.map(String::from),
            estimated_time_minutes: None,
            prerequisites: vec![],
        }
    }

    fn record(topic_id: &str, level: MasteryLevel) -> ProgressRecord {
        let mut record = ProgressRecord::new("learner-1", topic_id, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        record.mastery_level = level;
        record
    }

    #[test]
    fn test_empty_input_gives_empty_heatmap() {
        let heatmap = build_heatmap(&[], &HashMap::new());
        assert!(heatmap.heatmap.is_empty());
        assert_eq!(heatmap.summary, HeatmapSummary::default());
    }

    #[test]
    fn test_grouping_and_counters() {
        let catalog = vec![
            topic("t3", Some("physics"), None),
            topic("t1", Some("math"), Some("advanced")),
            topic("t2", Some("math"), None),
            topic("t4", None, None),
        ];
        let lookup: HashMap<&str, &Topic> = catalog.iter().map(|t| (t.id.as_str(), t)).collect();

        let records = vec![
            record("t2", MasteryLevel::Learning),
            record("t1", MasteryLevel::Mastered),
            record("t3", MasteryLevel::NotStarted),
            record("t4", MasteryLevel::Practicing),
            record("gone", MasteryLevel::Mastered),
        ];

        let heatmap = build_heatmap(&records, &lookup);
        let subjects: Vec<_> = heatmap.heatmap.iter().map(|row| row.subject.as_str()).collect();
        assert_eq!(subjects, vec!["General", "math", "physics"]);

        let math = &heatmap.heatmap[1];
        assert_eq!(math.topics[0].topic_id, "t1");
        assert_eq!(math.topics[0].difficulty, "advanced");
        assert_eq!(math.topics[1].difficulty, DEFAULT_DIFFICULTY);

        assert_eq!(
            heatmap.summary,
            HeatmapSummary {
                total_topics: 4,
                mastered_topics: 1,
                in_progress_topics: 2,
            }
        );
        assert!(
            heatmap.summary.mastered_topics + heatmap.summary.in_progress_topics
                <= heatmap.summary.total_topics
        );
    }
}
