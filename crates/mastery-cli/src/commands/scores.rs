//! The `mastery scores` command.

use std::path::Path;

use anyhow::Result;
use comfy_table::{Cell, Table};

use mastery_core::proficiency::{summarize, ProficiencyAggregator, TopicProficiency};

use super::{as_of_or_now, fmt_score, wants_json, Workspace};

pub async fn execute(
    config_path: Option<&Path>,
    user: Option<&str>,
    as_of: Option<String>,
    format: String,
) -> Result<()> {
    let json = wants_json(&format)?;
    let as_of = as_of_or_now(as_of.as_deref())?;
    let ws = Workspace::open(config_path, user)?;

    let events = ws.events().await?;
    let records = ProficiencyAggregator::new(ws.config.scoring.clone()).compute_all(&events, as_of);

    if json {
        let list: Vec<&TopicProficiency> = records.values().collect();
        println!("{}", serde_json::to_string_pretty(&list)?);
        return Ok(());
    }

    if records.is_empty() {
        println!("No evaluations recorded for {}.", ws.user);
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec![
        "Topic",
        "Score",
        "Level",
        "Direct",
        "Indirect",
        "Last evaluated",
    ]);
    for record in records.values() {
        table.add_row(vec![
            Cell::new(&record.topic_id),
            Cell::new(fmt_score(record.score)),
            Cell::new(record.level),
            Cell::new(record.direct_count),
            Cell::new(record.indirect_count),
            Cell::new(
                record
                    .last_evaluated_at
                    .map(|at| at.format("%Y-%m-%d").to_string())
                    .unwrap_or_else(|| "-".to_string()),
            ),
        ]);
    }
    println!("{table}");

    let summary = summarize(&records);
    println!(
        "\n{} topic(s): {} evaluated, {} not yet evaluated, mean score {}",
        records.len(),
        summary.evaluated,
        summary.unevaluated,
        fmt_score(summary.mean_score)
    );

    Ok(())
}
