//! Tunable scoring constants.

use serde::{Deserialize, Serialize};

use crate::decay::HALF_LIFE_DAYS;
use crate::model::EvaluationTier;

/// Constants the scoring engine depends on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Age in days at which an evaluation counts half as much as a fresh one.
    pub half_life_days: f64,
    /// Score substituted when a caller supplies a tier instead of a number.
    pub tier_scores: TierScores,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            half_life_days: HALF_LIFE_DAYS,
            tier_scores: TierScores::default(),
        }
    }
}

impl ScoringConfig {
    /// Check the constants are usable. Returns a description of the first
    /// problem found.
    pub fn validate(&self) -> Result<(), String> {
        if !(self.half_life_days.is_finite() && self.half_life_days > 0.0) {
            return Err(format!(
                "half_life_days must be a positive number, got {}",
                self.half_life_days
            ));
        }
        let TierScores {
            strong,
            moderate,
            weak,
        } = self.tier_scores;
        for (name, value) in [("strong", strong), ("moderate", moderate), ("weak", weak)] {
            if !(0.0..=100.0).contains(&value) {
                return Err(format!("tier score '{name}' must be within 0-100, got {value}"));
            }
        }
        if !(strong > moderate && moderate > weak) {
            return Err("tier scores must be ordered strong > moderate > weak".to_string());
        }
        Ok(())
    }
}

/// Fixed score for each evaluation tier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TierScores {
    pub strong: f64,
    pub moderate: f64,
    pub weak: f64,
}

impl Default for TierScores {
    fn default() -> Self {
        Self {
            strong: 90.0,
            moderate: 60.0,
            weak: 25.0,
        }
    }
}

impl TierScores {
    pub fn score_for(&self, tier: EvaluationTier) -> f64 {
        match tier {
            EvaluationTier::Strong => self.strong,
            EvaluationTier::Moderate => self.moderate,
            EvaluationTier::Weak => self.weak,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = ScoringConfig::default();
        assert_eq!(config.half_life_days, 90.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn tier_scores_map_each_tier() {
        let tiers = TierScores::default();
        assert_eq!(tiers.score_for(EvaluationTier::Strong), 90.0);
        assert_eq!(tiers.score_for(EvaluationTier::Moderate), 60.0);
        assert_eq!(tiers.score_for(EvaluationTier::Weak), 25.0);
    }

    #[test]
    fn rejects_non_positive_half_life() {
        let config = ScoringConfig {
            half_life_days: 0.0,
            ..Default::default()
        };
        assert!(config.validate().unwrap_err().contains("half_life_days"));
    }

    #[test]
    fn rejects_unordered_tiers() {
        let config = ScoringConfig {
            tier_scores: TierScores {
                strong: 50.0,
                moderate: 60.0,
                weak: 10.0,
            },
            ..Default::default()
        };
        assert!(config.validate().unwrap_err().contains("ordered"));
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: ScoringConfig =
            serde_json::from_str(r#"{"tier_scores": {"weak": 20.0}}"#).unwrap();
        assert_eq!(config.half_life_days, 90.0);
        assert_eq!(config.tier_scores.weak, 20.0);
        assert_eq!(config.tier_scores.strong, 90.0);
    }
}
