//! The `mastery history` command.

use std::path::Path;

use anyhow::Result;
use comfy_table::{Cell, Table};

use mastery_core::model::TopicId;
use mastery_core::proficiency::ProficiencyAggregator;

use super::{as_of_or_now, fmt_score, wants_json, Workspace};

pub async fn execute(
    config_path: Option<&Path>,
    user: Option<&str>,
    topic: String,
    as_of: Option<String>,
    format: String,
) -> Result<()> {
    let json = wants_json(&format)?;
    let as_of = as_of_or_now(as_of.as_deref())?;
    let topic = TopicId::from(topic.trim());
    let ws = Workspace::open(config_path, user)?;

    let events = ws.events().await?;
    let aggregator = ProficiencyAggregator::new(ws.config.scoring.clone());
    let history = aggregator.history(&events, &topic, as_of);

    if json {
        println!("{}", serde_json::to_string_pretty(&history)?);
        return Ok(());
    }

    let records = aggregator.compute_all(&events, as_of);
    let Some(record) = records.get(&topic) else {
        println!("No evaluations mention {topic}.");
        return Ok(());
    };
    println!(
        "{topic}: {} ({}), {} direct, {} indirect",
        fmt_score(record.score),
        record.level,
        record.direct_count,
        record.indirect_count
    );

    if history.is_empty() {
        println!("{topic} has only been evaluated alongside other primary topics.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec![
        "Occurred", "Score", "Weight", "Source", "Reference", "Also covered",
    ]);
    for entry in &history {
        let event = &entry.event;
        let also: Vec<&str> = event
            .co_occurring_topics()
            .iter()
            .map(|t| t.as_str())
            .collect();
        table.add_row(vec![
            Cell::new(event.occurred_at.format("%Y-%m-%d %H:%M")),
            Cell::new(format!("{:.1}", event.performance_score)),
            Cell::new(format!("{:.3}", entry.weight)),
            Cell::new(event.source_type),
            Cell::new(event.source_ref.as_deref().unwrap_or("-")),
            Cell::new(also.join(", ")),
        ]);
    }
    println!("{table}");

    Ok(())
}
