//! Core data model types for mastery tracking.
//!
//! Evaluation events are immutable facts owned by the event store. Everything
//! the engine derives from them (scores, levels, co-occurrence) is recomputed
//! on demand and never persisted.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

string_id!(
    /// Identifier of the learner whose evaluations are being tracked.
    UserId
);
string_id!(
    /// Identifier of a curriculum topic.
    TopicId
);
string_id!(
    /// Opaque identifier assigned to an evaluation by the event store.
    EventId
);

/// Where an evaluation came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceType {
    CurriculumLesson,
    PastExam,
    StandardizedTest,
    #[default]
    FreePractice,
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceType::CurriculumLesson => write!(f, "curriculum-lesson"),
            SourceType::PastExam => write!(f, "past-exam"),
            SourceType::StandardizedTest => write!(f, "standardized-test"),
            SourceType::FreePractice => write!(f, "free-practice"),
        }
    }
}

impl FromStr for SourceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "curriculum-lesson" | "lesson" => Ok(SourceType::CurriculumLesson),
            "past-exam" | "exam" => Ok(SourceType::PastExam),
            "standardized-test" | "test" => Ok(SourceType::StandardizedTest),
            "free-practice" | "practice" => Ok(SourceType::FreePractice),
            other => Err(format!("unknown source type: {other}")),
        }
    }
}

/// Shorthand outcome a caller may supply instead of a raw score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvaluationTier {
    Strong,
    Moderate,
    Weak,
}

impl fmt::Display for EvaluationTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvaluationTier::Strong => write!(f, "strong"),
            EvaluationTier::Moderate => write!(f, "moderate"),
            EvaluationTier::Weak => write!(f, "weak"),
        }
    }
}

impl FromStr for EvaluationTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "strong" => Ok(EvaluationTier::Strong),
            "moderate" => Ok(EvaluationTier::Moderate),
            "weak" => Ok(EvaluationTier::Weak),
            other => Err(format!("unknown evaluation tier: {other}")),
        }
    }
}

/// A single stored evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationEvent {
    /// Store-assigned identifier.
    pub id: EventId,
    /// Topics covered. The first entry is the primary topic.
    pub topic_ids: Vec<TopicId>,
    #[serde(default)]
    pub source_type: SourceType,
    #[serde(default)]
    pub source_ref: Option<String>,
    /// When the evaluation happened. May be backdated.
    pub occurred_at: DateTime<Utc>,
    /// Outcome quality on a 0-100 scale.
    pub performance_score: f64,
    /// Tier the score was resolved from, if any.
    #[serde(default)]
    pub evaluation_tier: Option<EvaluationTier>,
    /// Audit timestamp. Never used for scoring.
    pub created_at: DateTime<Utc>,
}

impl EvaluationEvent {
    /// The topic this evaluation actually assessed.
    pub fn primary_topic(&self) -> Option<&TopicId> {
        self.topic_ids.first()
    }

    /// Topics listed alongside the primary one.
    pub fn co_occurring_topics(&self) -> &[TopicId] {
        self.topic_ids.get(1..).unwrap_or_default()
    }

    /// Whether `topic` appears anywhere in this event.
    pub fn references(&self, topic: &TopicId) -> bool {
        self.topic_ids.contains(topic)
    }

    /// Events read back from storage can be corrupt; these are skipped by
    /// aggregation instead of poisoning every other topic.
    pub fn is_well_formed(&self) -> bool {
        !self.topic_ids.is_empty() && self.performance_score.is_finite()
    }
}

/// A validated evaluation ready to be written. The store assigns `id` and
/// `created_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewEvaluation {
    pub topic_ids: Vec<TopicId>,
    pub source_type: SourceType,
    #[serde(default)]
    pub source_ref: Option<String>,
    pub occurred_at: DateTime<Utc>,
    pub performance_score: f64,
    #[serde(default)]
    pub evaluation_tier: Option<EvaluationTier>,
}

impl NewEvaluation {
    /// Complete this evaluation into its stored form.
    pub fn into_event(self, id: EventId, created_at: DateTime<Utc>) -> EvaluationEvent {
        EvaluationEvent {
            id,
            topic_ids: self.topic_ids,
            source_type: self.source_type,
            source_ref: self.source_ref,
            occurred_at: self.occurred_at,
            performance_score: self.performance_score,
            evaluation_tier: self.evaluation_tier,
            created_at,
        }
    }
}

/// Caller input for recording an evaluation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EvaluationDraft {
    pub topic_ids: Vec<TopicId>,
    #[serde(default)]
    pub source_type: SourceType,
    #[serde(default)]
    pub source_ref: Option<String>,
    /// Defaults to the time of the append.
    #[serde(default)]
    pub occurred_at: Option<DateTime<Utc>>,
    /// Wins over `evaluation_tier` when both are present.
    #[serde(default)]
    pub performance_score: Option<f64>,
    #[serde(default)]
    pub evaluation_tier: Option<EvaluationTier>,
}

impl EvaluationDraft {
    pub fn new<I, T>(topic_ids: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<TopicId>,
    {
        Self {
            topic_ids: topic_ids.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn with_score(mut self, score: f64) -> Self {
        self.performance_score = Some(score);
        self
    }

    pub fn with_tier(mut self, tier: EvaluationTier) -> Self {
        self.evaluation_tier = Some(tier);
        self
    }

    pub fn with_source(mut self, source_type: SourceType, source_ref: Option<String>) -> Self {
        self.source_type = source_type;
        self.source_ref = source_ref;
        self
    }

    pub fn occurred_at(mut self, at: DateTime<Utc>) -> Self {
        self.occurred_at = Some(at);
        self
    }
}
