//! Learning goal progress

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::db::models::{LearningGoal, MasteryLevel};

/// Goal plus its progress derived from the ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalView {
    #[serde(flatten)]
    pub goal: LearningGoal,
    pub progress_percentage: f64,
}

/// Share of target topics at or above the target level, 0 to 100.
///
/// Topics with no ledger record count as not started.
pub fn progress_percentage(goal: &LearningGoal, levels: &HashMap<&str, MasteryLevel>) -> f64 {
    if goal.target_topics.is_empty() {
        return 0.0;
    }

    let reached = goal
        .target_topics
        .iter()
        .filter(|topic| {
            levels
                .get(topic.as_str())
                .is_some_and(|level| *level >= goal.target_mastery_level)
        })
        .count();

    let pct = reached as f64 * 100.0 / goal.target_topics.len() as f64;
    (pct * 10.0).round() / 10.0
}

pub fn goal_view(goal: LearningGoal, levels: &HashMap<&str, MasteryLevel>) -> GoalView {
    let progress_percentage = progress_percentage(&goal, levels);
    GoalView {
        goal,
        progress_percentage,
    }
}
