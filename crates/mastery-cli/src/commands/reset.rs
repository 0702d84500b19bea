//! The `mastery reset` command.

use std::path::Path;

use anyhow::Result;

use mastery_core::coordinator::MutationCoordinator;
use mastery_core::model::TopicId;

use super::Workspace;

pub async fn execute(config_path: Option<&Path>, user: Option<&str>, topic: String) -> Result<()> {
    let topic = TopicId::from(topic.trim());
    let ws = Workspace::open(config_path, user)?;
    let coordinator = MutationCoordinator::new(ws.store.clone(), ws.config.scoring.clone());

    let outcome = coordinator.reset_topic(&ws.user, &topic).await?;
    if outcome.matched_count == 0 {
        println!("No evaluations mention {topic}.");
        return Ok(());
    }

    println!(
        "Removed {} of {} evaluation(s) mentioning {topic}.",
        outcome.deleted_count, outcome.matched_count
    );
    if outcome.is_partial() {
        println!("Some evaluations could not be removed. Run the reset again to retry.");
    }

    Ok(())
}
