//! Event store trait.
//!
//! Implemented by the adapters in `mastery-store`. The engine only ever reads
//! full snapshots and issues single appends and batch deletes.

use async_trait::async_trait;

use crate::error::StoreError;
use crate::model::{EvaluationEvent, EventId, NewEvaluation, UserId};

/// Append-only store of evaluation events, partitioned by user.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Human-readable backend name (e.g. "file").
    fn name(&self) -> &str;

    /// Every stored event for `user`. No pagination.
    async fn list_by_user(&self, user: &UserId) -> Result<Vec<EvaluationEvent>, StoreError>;

    /// Insert one event and return its stored form with the assigned id.
    async fn append(
        &self,
        user: &UserId,
        event: NewEvaluation,
    ) -> Result<EvaluationEvent, StoreError>;

    /// Delete the given events. Returns how many were actually removed,
    /// which may be fewer than requested.
    async fn delete_many(&self, user: &UserId, ids: &[EventId]) -> Result<usize, StoreError>;
}
