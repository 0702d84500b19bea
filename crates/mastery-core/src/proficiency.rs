//! Per-topic mastery aggregation.
//!
//! A topic's score is the decay-weighted mean of the evaluations where it was
//! the primary topic:
//!
//! score = Σ(score_i · w_i) / Σ(w_i),  w_i = 2^(-age_i / half_life)
//!
//! Co-occurring appearances are counted but never contribute to the score.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::ScoringConfig;
use crate::decay::{age_days, usable_half_life, weight_with_half_life};
use crate::level::{classify, MasteryLevel};
use crate::model::{EvaluationEvent, TopicId};

/// Derived mastery state for one topic. Recomputed on every query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicProficiency {
    pub topic_id: TopicId,
    /// `None` when the topic was never the primary subject of an evaluation.
    pub score: Option<f64>,
    pub level: MasteryLevel,
    /// Evaluations where this topic was primary.
    pub direct_count: u32,
    /// Evaluations where this topic was listed but not primary.
    pub indirect_count: u32,
    /// Most recent `occurred_at` among direct evaluations.
    pub last_evaluated_at: Option<DateTime<Utc>>,
}

impl TopicProficiency {
    fn unevaluated(topic_id: TopicId) -> Self {
        Self {
            topic_id,
            score: None,
            level: MasteryLevel::NotEvaluated,
            direct_count: 0,
            indirect_count: 0,
            last_evaluated_at: None,
        }
    }
}

/// One direct evaluation of a topic together with its current weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedEvaluation {
    pub event: EvaluationEvent,
    pub age_days: f64,
    pub weight: f64,
}

/// Number of topics at each mastery level.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LevelSummary {
    pub counts: BTreeMap<MasteryLevel, usize>,
    pub evaluated: usize,
    pub unevaluated: usize,
    /// Unweighted mean of all defined topic scores.
    pub mean_score: Option<f64>,
}

impl LevelSummary {
    pub fn count(&self, level: MasteryLevel) -> usize {
        self.counts.get(&level).copied().unwrap_or(0)
    }
}

/// Turns a user's evaluation history into per-topic proficiency records.
#[derive(Debug, Clone, Default)]
pub struct ProficiencyAggregator {
    config: ScoringConfig,
}

impl ProficiencyAggregator {
    /// A half-life that is not a positive finite number is replaced by the
    /// default.
    pub fn new(mut config: ScoringConfig) -> Self {
        let half_life = usable_half_life(config.half_life_days);
        if half_life != config.half_life_days {
            tracing::warn!(
                configured = config.half_life_days,
                using = half_life,
                "unusable half-life, falling back to default"
            );
            config.half_life_days = half_life;
        }
        Self { config }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Compute one record for every topic mentioned anywhere in `events`.
    ///
    /// Malformed events (no topics, non-finite score) are skipped.
    pub fn compute_all(
        &self,
        events: &[EvaluationEvent],
        as_of: DateTime<Utc>,
    ) -> BTreeMap<TopicId, TopicProficiency> {
        let mut groups: HashMap<&TopicId, Vec<&EvaluationEvent>> = HashMap::new();
        let mut records: BTreeMap<TopicId, TopicProficiency> = BTreeMap::new();
        let mut skipped = 0usize;

        for event in events {
            if !event.is_well_formed() {
                skipped += 1;
                continue;
            }
            let mut topics = event.topic_ids.iter();
            let Some(primary) = topics.next() else {
                continue;
            };

            groups.entry(primary).or_default().push(event);
            records
                .entry(primary.clone())
                .or_insert_with(|| TopicProficiency::unevaluated(primary.clone()));

            // A topic listed twice on one event still counts once.
            let mut seen: HashSet<&TopicId> = HashSet::from([primary]);
            for topic in topics {
                if seen.insert(topic) {
                    let record = records
                        .entry(topic.clone())
                        .or_insert_with(|| TopicProficiency::unevaluated(topic.clone()));
                    record.indirect_count = record.indirect_count.saturating_add(1);
                }
            }
        }

        if skipped > 0 {
            tracing::warn!(skipped, "skipped malformed evaluation events");
        }

        for (topic, group) in groups {
            let score = self.weighted_score(&group, as_of);
            let record = records
                .entry(topic.clone())
                .or_insert_with(|| TopicProficiency::unevaluated(topic.clone()));
            record.score = Some(score);
            record.level = classify(Some(score));
            record.direct_count = saturating_count(group.len());
            record.last_evaluated_at = group.iter().map(|e| e.occurred_at).max();
        }

        records
    }

    /// The direct evaluations of `topic`, newest first, with their weights.
    pub fn history(
        &self,
        events: &[EvaluationEvent],
        topic: &TopicId,
        as_of: DateTime<Utc>,
    ) -> Vec<WeightedEvaluation> {
        let mut history: Vec<WeightedEvaluation> = events
            .iter()
            .filter(|e| e.is_well_formed() && e.primary_topic() == Some(topic))
            .map(|e| {
                let age = age_days(e.occurred_at, as_of).max(0.0);
                WeightedEvaluation {
                    event: e.clone(),
                    age_days: age,
                    weight: weight_with_half_life(age, self.config.half_life_days),
                }
            })
            .collect();

        history.sort_by(|a, b| {
            b.event
                .occurred_at
                .cmp(&a.event.occurred_at)
                .then_with(|| a.event.id.cmp(&b.event.id))
        });
        history
    }

    /// Weighted mean over a non-empty group.
    ///
    /// Ages are taken relative to the freshest event in the group. The ratio
    /// is unchanged by the common factor, but the denominator is then at
    /// least 1 and cannot underflow for arbitrarily stale groups.
    fn weighted_score(&self, group: &[&EvaluationEvent], as_of: DateTime<Utc>) -> f64 {
        let ages: Vec<f64> = group
            .iter()
            .map(|e| age_days(e.occurred_at, as_of).max(0.0))
            .collect();
        let freshest = ages.iter().copied().fold(f64::INFINITY, f64::min);

        let (numerator, denominator) =
            group
                .iter()
                .zip(&ages)
                .fold((0.0_f64, 0.0_f64), |(num, den), (event, &age)| {
                    let w = weight_with_half_life(age - freshest, self.config.half_life_days);
                    (num + event.performance_score * w, den + w)
                });

        // Keep rounding noise from escaping the range of the inputs.
        let (lo, hi) = group.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), e| {
            (lo.min(e.performance_score), hi.max(e.performance_score))
        });
        (numerator / denominator).clamp(lo, hi)
    }
}

fn saturating_count(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

/// [`ProficiencyAggregator::compute_all`] with the default configuration.
pub fn compute_all(
    events: &[EvaluationEvent],
    as_of: DateTime<Utc>,
) -> BTreeMap<TopicId, TopicProficiency> {
    ProficiencyAggregator::default().compute_all(events, as_of)
}

/// Count topics per level.
pub fn summarize(proficiencies: &BTreeMap<TopicId, TopicProficiency>) -> LevelSummary {
    let mut summary = LevelSummary::default();
    let mut total = 0.0;

    for record in proficiencies.values() {
        *summary.counts.entry(record.level).or_insert(0) += 1;
        match record.score {
            Some(score) => {
                summary.evaluated += 1;
                total += score;
            }
            None => summary.unevaluated += 1,
        }
    }
    if summary.evaluated > 0 {
        summary.mean_score = Some(total / summary.evaluated as f64);
    }
    summary
}
