//! Error types for mutations and event store access.
//!
//! Scoring itself has no failure mode. Only the mutation path can fail,
//! either because the caller's draft is invalid or because the event store
//! could not complete the request.

use thiserror::Error;

/// A draft was rejected before any store call was made.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// The draft listed no topics.
    #[error("an evaluation needs at least one topic")]
    EmptyTopics,

    /// A topic identifier was empty or whitespace.
    #[error("topic at position {index} is blank")]
    BlankTopic { index: usize },

    /// Neither a score nor a tier was supplied.
    #[error("performance score is missing and no evaluation tier was given")]
    UnresolvableScore,

    /// The score was not a finite number within the 0-100 scale.
    #[error("performance score {0} is outside 0-100")]
    ScoreOutOfRange(f64),
}

/// Errors reported by an event store adapter.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store could not be reached or failed internally.
    #[error("event store unavailable: {0}")]
    Unavailable(String),

    /// No session, an expired session, or a session for another user.
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The store refused the request.
    #[error("event store rejected request (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },

    /// A user identifier or store address cannot be used to locate data.
    #[error("invalid storage key: {0}")]
    InvalidKey(String),

    /// The stored payload could not be decoded at all.
    #[error("corrupt event data: {0}")]
    Corrupt(String),
}

impl StoreError {
    /// Returns `true` for transient failures a caller may retry later.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

/// Failure half of every mutation result.
#[derive(Debug, Error)]
pub enum MutationError {
    #[error("invalid evaluation: {0}")]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    StoreUnavailable(#[from] StoreError),
}

impl MutationError {
    /// Returns `true` if the failure happened before the store was touched.
    pub fn is_validation(&self) -> bool {
        matches!(self, MutationError::Validation(_))
    }
}
