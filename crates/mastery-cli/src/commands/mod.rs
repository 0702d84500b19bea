pub mod history;
pub mod init;
pub mod record;
pub mod related;
pub mod reset;
pub mod scores;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};

use mastery_core::model::{EvaluationEvent, UserId};
use mastery_core::traits::EventStore;
use mastery_store::config::{create_store, load_config_from, MasteryConfig};

/// Loaded config plus the store and user a command acts on.
pub struct Workspace {
    pub config: MasteryConfig,
    pub user: UserId,
    pub store: Arc<dyn EventStore>,
}

impl Workspace {
    pub fn open(config_path: Option<&Path>, user: Option<&str>) -> Result<Self> {
        let config = load_config_from(config_path)?;
        let user = user
            .map(str::to_string)
            .or_else(|| config.default_user.clone())
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty())
            .context("no user given: pass --user or set default_user in mastery.toml")?;
        let user = UserId::from(user);

        // The token belongs to the configured identity; other users fail
        // authentication at the store.
        let store = create_store(&config.store, config.session())?;
        tracing::debug!(user = %user, store = store.name(), "opened workspace");

        Ok(Self {
            config,
            user,
            store,
        })
    }

    pub async fn events(&self) -> Result<Vec<EvaluationEvent>> {
        self.store
            .list_by_user(&self.user)
            .await
            .with_context(|| format!("failed to load evaluations for {}", self.user))
    }
}

/// Parse an RFC 3339 timestamp or a bare `YYYY-MM-DD` date (midnight UTC).
pub fn parse_instant(s: &str) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    let naive = NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .with_context(|| format!("invalid date '{s}': expected RFC 3339 or YYYY-MM-DD"))?;
    Ok(Utc.from_utc_datetime(&naive))
}

pub fn as_of_or_now(as_of: Option<&str>) -> Result<DateTime<Utc>> {
    as_of.map(parse_instant).unwrap_or_else(|| Ok(Utc::now()))
}

/// Returns `true` for json, `false` for table.
pub fn wants_json(format: &str) -> Result<bool> {
    match format {
        "json" => Ok(true),
        "table" => Ok(false),
        other => anyhow::bail!("unknown format '{other}': expected table or json"),
    }
}

pub fn fmt_score(score: Option<f64>) -> String {
    match score {
        Some(s) => format!("{s:.1}"),
        None => "-".to_string(),
    }
}
