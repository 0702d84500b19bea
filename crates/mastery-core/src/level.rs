//! Discrete mastery levels derived from a numeric score.

use std::fmt;

use serde::{Deserialize, Serialize};

const CONFIDENT_THRESHOLD: f64 = 90.0;
const SOLID_THRESHOLD: f64 = 75.0;
const AVERAGE_THRESHOLD: f64 = 50.0;
const NEEDS_REVIEW_THRESHOLD: f64 = 30.0;

/// Mastery level, ordered from "no evidence" to "confident".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MasteryLevel {
    NotEvaluated,
    Weak,
    NeedsReview,
    Average,
    Solid,
    Confident,
}

impl MasteryLevel {
    /// Every level, lowest rank first.
    pub const ALL: [MasteryLevel; 6] = [
        MasteryLevel::NotEvaluated,
        MasteryLevel::Weak,
        MasteryLevel::NeedsReview,
        MasteryLevel::Average,
        MasteryLevel::Solid,
        MasteryLevel::Confident,
    ];

    /// Numeric rank, 0-5.
    pub fn rank(self) -> u8 {
        self as u8
    }

    pub fn from_rank(rank: u8) -> Option<Self> {
        Self::ALL.get(rank as usize).copied()
    }

    pub fn label(self) -> &'static str {
        match self {
            MasteryLevel::NotEvaluated => "not yet evaluated",
            MasteryLevel::Weak => "weak",
            MasteryLevel::NeedsReview => "needs review",
            MasteryLevel::Average => "average",
            MasteryLevel::Solid => "solid",
            MasteryLevel::Confident => "confident",
        }
    }

    /// Hex color hint for UI collaborators.
    pub fn color(self) -> &'static str {
        match self {
            MasteryLevel::NotEvaluated => "#9e9e9e",
            MasteryLevel::Weak => "#e53935",
            MasteryLevel::NeedsReview => "#fb8c00",
            MasteryLevel::Average => "#fdd835",
            MasteryLevel::Solid => "#7cb342",
            MasteryLevel::Confident => "#2e7d32",
        }
    }
}

impl fmt::Display for MasteryLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Map a score to its mastery level. Thresholds are inclusive lower bounds.
///
/// `None` and non-finite scores mean there is no evidence to classify.
pub fn classify(score: Option<f64>) -> MasteryLevel {
    match score {
        None => MasteryLevel::NotEvaluated,
        Some(s) if !s.is_finite() => MasteryLevel::NotEvaluated,
        Some(s) if s >= CONFIDENT_THRESHOLD => MasteryLevel::Confident,
        Some(s) if s >= SOLID_THRESHOLD => MasteryLevel::Solid,
        Some(s) if s >= AVERAGE_THRESHOLD => MasteryLevel::Average,
        Some(s) if s >= NEEDS_REVIEW_THRESHOLD => MasteryLevel::NeedsReview,
        Some(_) => MasteryLevel::Weak,
    }
}
