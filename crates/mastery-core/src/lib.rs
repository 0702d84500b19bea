//! mastery-core: Decay-weighted mastery scoring for evaluation histories.
//!
//! This crate turns a user's timestamped, multi-topic evaluation events into
//! per-topic mastery scores and levels, ranks topics that co-occur with an
//! anchor topic, and validates mutations before they reach an event store.
//! All scoring is a pure function of an event snapshot.

pub mod config;
pub mod cooccurrence;
pub mod coordinator;
pub mod decay;
pub mod error;
pub mod level;
pub mod model;
pub mod proficiency;
pub mod session;
pub mod traits;

pub use config::{ScoringConfig, TierScores};
pub use cooccurrence::{related, RelatedTopic};
pub use coordinator::{MutationCoordinator, ResetOutcome};
pub use error::{MutationError, StoreError, ValidationError};
pub use level::{classify, MasteryLevel};
pub use model::{
    EvaluationDraft, EvaluationEvent, EvaluationTier, EventId, NewEvaluation, SourceType, TopicId,
    UserId,
};
pub use proficiency::{compute_all, summarize, ProficiencyAggregator, TopicProficiency};
pub use session::Session;
pub use traits::EventStore;
