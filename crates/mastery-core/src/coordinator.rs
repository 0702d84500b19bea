//! The only entry point that changes stored state.
//!
//! Mutations never update derived scores: there are none to update. Callers
//! re-fetch the event list and recompute after every mutation.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::config::ScoringConfig;
use crate::error::{MutationError, ValidationError};
use crate::model::{EvaluationDraft, EvaluationEvent, EventId, NewEvaluation, TopicId, UserId};
use crate::traits::EventStore;

/// Outcome of a topic reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetOutcome {
    /// Events that referenced the topic when the reset started.
    pub matched_count: usize,
    /// Events the store reports as actually deleted.
    pub deleted_count: usize,
}

impl ResetOutcome {
    /// Some matched events survived. Running the reset again removes them.
    pub fn is_partial(&self) -> bool {
        self.deleted_count < self.matched_count
    }
}

/// Validates and applies mutations against an [`EventStore`].
pub struct MutationCoordinator {
    store: Arc<dyn EventStore>,
    config: ScoringConfig,
}

impl MutationCoordinator {
    pub fn new(store: Arc<dyn EventStore>, config: ScoringConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &Arc<dyn EventStore> {
        &self.store
    }

    /// Validate a draft and resolve its score without touching the store.
    pub fn prepare(
        &self,
        draft: EvaluationDraft,
        now: DateTime<Utc>,
    ) -> Result<NewEvaluation, ValidationError> {
        if draft.topic_ids.is_empty() {
            return Err(ValidationError::EmptyTopics);
        }

        let mut seen = HashSet::new();
        let mut topic_ids = Vec::with_capacity(draft.topic_ids.len());
        for (index, topic) in draft.topic_ids.iter().enumerate() {
            let trimmed = topic.as_str().trim();
            if trimmed.is_empty() {
                return Err(ValidationError::BlankTopic { index });
            }
            if seen.insert(trimmed.to_string()) {
                topic_ids.push(TopicId::from(trimmed));
            }
        }

        let score = draft
            .performance_score
            .or_else(|| {
                draft
                    .evaluation_tier
                    .map(|tier| self.config.tier_scores.score_for(tier))
            })
            .ok_or(ValidationError::UnresolvableScore)?;
        if !(score.is_finite() && (0.0..=100.0).contains(&score)) {
            return Err(ValidationError::ScoreOutOfRange(score));
        }

        let source_ref = draft
            .source_ref
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        Ok(NewEvaluation {
            topic_ids,
            source_type: draft.source_type,
            source_ref,
            occurred_at: draft.occurred_at.unwrap_or(now),
            performance_score: score,
            evaluation_tier: draft.evaluation_tier,
        })
    }

    /// Record one evaluation. Invalid drafts are rejected before any store
    /// call.
    #[instrument(skip_all, fields(user = %user, store = self.store.name()))]
    pub async fn append(
        &self,
        user: &UserId,
        draft: EvaluationDraft,
    ) -> Result<EvaluationEvent, MutationError> {
        let evaluation = self.prepare(draft, Utc::now())?;
        let stored = self.store.append(user, evaluation).await?;
        tracing::info!(
            event_id = %stored.id,
            primary_topic = ?stored.primary_topic(),
            score = stored.performance_score,
            "recorded evaluation"
        );
        Ok(stored)
    }

    /// Erase every event that mentions `topic` in any position.
    ///
    /// A store that deletes only part of the batch is reported as success
    /// with the true count.
    #[instrument(skip_all, fields(user = %user, topic = %topic, store = self.store.name()))]
    pub async fn reset_topic(
        &self,
        user: &UserId,
        topic: &TopicId,
    ) -> Result<ResetOutcome, MutationError> {
        let events = self.store.list_by_user(user).await?;
        let ids: Vec<EventId> = events
            .into_iter()
            .filter(|e| e.references(topic))
            .map(|e| e.id)
            .collect();

        if ids.is_empty() {
            tracing::debug!("no evaluations reference topic");
            return Ok(ResetOutcome {
                matched_count: 0,
                deleted_count: 0,
            });
        }

        let deleted_count = self.store.delete_many(user, &ids).await?;
        let outcome = ResetOutcome {
            matched_count: ids.len(),
            deleted_count,
        };
        if outcome.is_partial() {
            tracing::warn!(
                matched = outcome.matched_count,
                deleted = outcome.deleted_count,
                "topic reset only partially applied"
            );
        } else {
            tracing::info!(deleted = deleted_count, "reset topic");
        }
        Ok(outcome)
    }
}
