//! Topics that tend to be evaluated alongside an anchor topic.
//!
//! Only events where the anchor is the primary topic are considered, so a
//! passing mention of the anchor elsewhere does not add noise.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::model::{EvaluationEvent, TopicId};

/// A topic and the number of anchor evaluations it appeared in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelatedTopic {
    pub topic_id: TopicId,
    pub count: u32,
}

/// Rank the topics listed alongside `anchor` in events where `anchor` is
/// primary. Highest count first, ties by topic id ascending, at most `limit`
/// entries.
pub fn related(events: &[EvaluationEvent], anchor: &TopicId, limit: usize) -> Vec<RelatedTopic> {
    if limit == 0 {
        return Vec::new();
    }

    let mut counts: HashMap<&TopicId, u32> = HashMap::new();
    for event in events {
        if event.primary_topic() != Some(anchor) {
            continue;
        }
        let mut seen: HashSet<&TopicId> = HashSet::new();
        for topic in event.co_occurring_topics() {
            if topic != anchor && seen.insert(topic) {
                *counts.entry(topic).or_insert(0) += 1;
            }
        }
    }

    let mut ranked: Vec<RelatedTopic> = counts
        .into_iter()
        .map(|(topic_id, count)| RelatedTopic {
            topic_id: topic_id.clone(),
            count,
        })
        .collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.topic_id.cmp(&b.topic_id)));
    ranked.truncate(limit);
    ranked
}
