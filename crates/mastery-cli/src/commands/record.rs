//! The `mastery record` command.

use std::path::Path;

use anyhow::Result;
use chrono::Utc;

use mastery_core::coordinator::MutationCoordinator;
use mastery_core::model::{EvaluationDraft, EvaluationTier, SourceType};
use mastery_core::proficiency::ProficiencyAggregator;

use super::{fmt_score, parse_instant, Workspace};

#[allow(clippy::too_many_arguments)]
pub async fn execute(
    config_path: Option<&Path>,
    user: Option<&str>,
    topics: Vec<String>,
    score: Option<f64>,
    tier: Option<EvaluationTier>,
    source: SourceType,
    source_ref: Option<String>,
    occurred_at: Option<String>,
) -> Result<()> {
    let mut draft = EvaluationDraft::new(topics).with_source(source, source_ref);
    if let Some(score) = score {
        draft = draft.with_score(score);
    }
    if let Some(tier) = tier {
        draft = draft.with_tier(tier);
    }
    if let Some(at) = occurred_at {
        draft = draft.occurred_at(parse_instant(&at)?);
    }

    let ws = Workspace::open(config_path, user)?;
    let coordinator = MutationCoordinator::new(ws.store.clone(), ws.config.scoring.clone());
    let stored = coordinator.append(&ws.user, draft).await?;

    let Some(primary) = stored.primary_topic() else {
        anyhow::bail!("store returned an evaluation without topics");
    };
    println!(
        "Recorded evaluation {} for {primary} ({:.1})",
        stored.id, stored.performance_score
    );

    // Scores are derived, so show the primary topic's new standing.
    let events = ws.events().await?;
    let records =
        ProficiencyAggregator::new(ws.config.scoring.clone()).compute_all(&events, Utc::now());
    if let Some(record) = records.get(primary) {
        println!(
            "{primary}: {} ({}), {} direct evaluation(s)",
            fmt_score(record.score),
            record.level,
            record.direct_count
        );
    }

    Ok(())
}
