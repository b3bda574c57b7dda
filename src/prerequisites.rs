//! Prerequisite graph resolver
//!
//! One-hop readiness filter: a topic is ready when every prerequisite it
//! lists is mastered and it is not mastered itself. Recomputed from the full
//! snapshot on each call.

use std::collections::HashSet;

use crate::db::models::Topic;

/// Topics ready to start, ordered by id ascending
pub fn ready_topics<'a>(topics: &'a [Topic], mastered: &HashSet<&str>) -> Vec<&'a Topic> {
    let mut ready: Vec<&Topic> = topics
        .iter()
        .filter(|topic| !mastered.contains(topic.id.as_str()))
        .filter(|topic| {
            topic
                .prerequisites
                .iter()
                .all(|prerequisite| mastered.contains(prerequisite.as_str()))
        })
        .collect();

    ready.sort_by(|a, b| a.id.cmp(&b.id));
    ready
}
