//! The `mastery related` command.

use std::path::Path;

use anyhow::Result;
use comfy_table::{Cell, Table};

use mastery_core::cooccurrence::related;
use mastery_core::model::TopicId;

use super::{wants_json, Workspace};

pub async fn execute(
    config_path: Option<&Path>,
    user: Option<&str>,
    topic: String,
    limit: usize,
    format: String,
) -> Result<()> {
    let json = wants_json(&format)?;
    let anchor = TopicId::from(topic.trim());
    let ws = Workspace::open(config_path, user)?;

    let events = ws.events().await?;
    let ranked = related(&events, &anchor, limit);

    if json {
        println!("{}", serde_json::to_string_pretty(&ranked)?);
        return Ok(());
    }

    if ranked.is_empty() {
        println!("No topics evaluated alongside {anchor}.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Topic", "Shared evaluations"]);
    for entry in &ranked {
        table.add_row(vec![Cell::new(&entry.topic_id), Cell::new(entry.count)]);
    }
    println!("Topics evaluated alongside {anchor}:\n{table}");

    Ok(())
}
