//! In-memory event store for tests and ephemeral sessions.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use mastery_core::error::StoreError;
use mastery_core::model::{EvaluationEvent, EventId, NewEvaluation, UserId};
use mastery_core::traits::EventStore;

/// Process-local store keyed by user. Events keep insertion order.
#[derive(Default)]
pub struct MemoryEventStore {
    events: Mutex<HashMap<UserId, Vec<EvaluationEvent>>>,
    /// Number of store calls made.
    call_count: AtomicU32,
    /// Calls that will fail with `Unavailable` before the store recovers.
    failures_pending: AtomicU32,
}

impl MemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an event as-is, bypassing validation. Useful for simulating
    /// corrupt stored data.
    pub async fn insert_raw(&self, user: &UserId, event: EvaluationEvent) {
        self.events
            .lock()
            .await
            .entry(user.clone())
            .or_default()
            .push(event);
    }

    /// Make the next `n` calls fail as if the store were unreachable.
    pub fn fail_next(&self, n: u32) {
        self.failures_pending.store(n, Ordering::Relaxed);
    }

    /// Get the number of calls made to this store.
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }

    fn begin_call(&self) -> Result<(), StoreError> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        let failing = self
            .failures_pending
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(StoreError::Unavailable("simulated outage".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl EventStore for MemoryEventStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn list_by_user(&self, user: &UserId) -> Result<Vec<EvaluationEvent>, StoreError> {
        self.begin_call()?;
        let guard = self.events.lock().await;
        Ok(guard.get(user).cloned().unwrap_or_default())
    }

    async fn append(
        &self,
        user: &UserId,
        event: NewEvaluation,
    ) -> Result<EvaluationEvent, StoreError> {
        self.begin_call()?;
        let stored = event.into_event(EventId::new(Uuid::new_v4().to_string()), Utc::now());
        self.events
            .lock()
            .await
            .entry(user.clone())
            .or_default()
            .push(stored.clone());
        Ok(stored)
    }

    async fn delete_many(&self, user: &UserId, ids: &[EventId]) -> Result<usize, StoreError> {
        self.begin_call()?;
        let mut guard = self.events.lock().await;
        let Some(events) = guard.get_mut(user) else {
            return Ok(0);
        };
        let before = events.len();
        events.retain(|e| !ids.contains(&e.id));
        Ok(before - events.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mastery_core::model::{SourceType, TopicId};

    fn new_eval(topics: &[&str], score: f64) -> NewEvaluation {
        NewEvaluation {
            topic_ids: topics.iter().map(|t| TopicId::from(*t)).collect(),
            source_type: SourceType::FreePractice,
            source_ref: None,
            occurred_at: Utc::now(),
            performance_score: score,
            evaluation_tier: None,
        }
    }

    #[tokio::test]
    async fn append_assigns_ids_and_preserves_order() {
        let store = MemoryEventStore::new();
        let user = UserId::from("u1");

        let first = store.append(&user, new_eval(&["a"], 10.0)).await.unwrap();
        let second = store.append(&user, new_eval(&["b"], 20.0)).await.unwrap();
        assert_ne!(first.id, second.id);

        let listed = store.list_by_user(&user).await.unwrap();
        assert_eq!(listed, vec![first, second]);
        assert_eq!(store.call_count(), 3);
    }

    #[tokio::test]
    async fn users_are_isolated() {
        let store = MemoryEventStore::new();
        store
            .append(&"u1".into(), new_eval(&["a"], 10.0))
            .await
            .unwrap();
        assert!(store.list_by_user(&"u2".into()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_many_counts_only_existing() {
        let store = MemoryEventStore::new();
        let user = UserId::from("u1");
        let stored = store.append(&user, new_eval(&["a"], 10.0)).await.unwrap();

        let deleted = store
            .delete_many(&user, &[stored.id, "missing".into()])
            .await
            .unwrap();
        assert_eq!(deleted, 1);
        assert_eq!(store.delete_many(&"nobody".into(), &[]).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn simulated_outage_recovers() {
        let store = MemoryEventStore::new();
        store.fail_next(2);
        let user = UserId::from("u1");

        assert!(store.list_by_user(&user).await.unwrap_err().is_unavailable());
        assert!(store.append(&user, new_eval(&["a"], 1.0)).await.is_err());
        assert!(store.list_by_user(&user).await.unwrap().is_empty());
    }
}
