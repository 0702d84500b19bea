//! Append-only JSON-lines store, one file per user.
//!
//! Layout: `{root}/{user}.jsonl`, one serialized [`EvaluationEvent`] per
//! line. Appends write a single line. Deletes rewrite the file through a
//! temporary sibling and an atomic rename.

use std::collections::HashSet;
use std::io::{ErrorKind, SeekFrom};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tokio::sync::Mutex;
use tracing::instrument;
use uuid::Uuid;

use mastery_core::error::StoreError;
use mastery_core::model::{EvaluationEvent, EventId, NewEvaluation, UserId};
use mastery_core::traits::EventStore;

const EXTENSION: &str = "jsonl";

/// File-backed event store.
pub struct FileEventStore {
    root: PathBuf,
    /// Serializes writers within this process.
    write_lock: Mutex<()>,
}

/// Just enough of a stored line to decide whether to delete it.
#[derive(Deserialize)]
struct StoredId {
    id: EventId,
}

impl FileEventStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, user: &UserId) -> Result<PathBuf, StoreError> {
        let key = user.as_str();
        let valid = !key.is_empty()
            && !key.starts_with('.')
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
        if !valid {
            return Err(StoreError::InvalidKey(format!(
                "user id '{key}' must be non-empty, use only [A-Za-z0-9._-] and not start with '.'"
            )));
        }
        Ok(self.root.join(format!("{key}.{EXTENSION}")))
    }

    async fn read_lines(path: &Path) -> Result<String, StoreError> {
        match tokio::fs::read_to_string(path).await {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(io_error(path, e)),
        }
    }

    /// Whether the file ends in a partial line left by an interrupted write.
    async fn ends_mid_line(path: &Path) -> Result<bool, StoreError> {
        let mut file = match tokio::fs::File::open(path).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(io_error(path, e)),
        };
        let len = file.metadata().await.map_err(|e| io_error(path, e))?.len();
        if len == 0 {
            return Ok(false);
        }
        file.seek(SeekFrom::End(-1))
            .await
            .map_err(|e| io_error(path, e))?;
        let mut last = [0u8; 1];
        file.read_exact(&mut last)
            .await
            .map_err(|e| io_error(path, e))?;
        Ok(last[0] != b'\n')
    }
}

fn io_error(path: &Path, e: std::io::Error) -> StoreError {
    StoreError::Unavailable(format!("{}: {e}", path.display()))
}

#[async_trait]
impl EventStore for FileEventStore {
    fn name(&self) -> &str {
        "file"
    }

    #[instrument(skip_all, fields(user = %user))]
    async fn list_by_user(&self, user: &UserId) -> Result<Vec<EvaluationEvent>, StoreError> {
        let path = self.path_for(user)?;
        let content = Self::read_lines(&path).await?;

        let mut events = Vec::new();
        for (number, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<EvaluationEvent>(line) {
                Ok(event) => events.push(event),
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        line = number + 1,
                        "skipping undecodable event: {e}"
                    );
                }
            }
        }
        tracing::debug!(count = events.len(), "loaded events");
        Ok(events)
    }

    #[instrument(skip_all, fields(user = %user))]
    async fn append(
        &self,
        user: &UserId,
        event: NewEvaluation,
    ) -> Result<EvaluationEvent, StoreError> {
        let path = self.path_for(user)?;
        let stored = event.into_event(EventId::new(Uuid::new_v4().to_string()), Utc::now());
        let mut line = serde_json::to_string(&stored)
            .map_err(|e| StoreError::Corrupt(format!("failed to encode event: {e}")))?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| io_error(&self.root, e))?;
        if Self::ends_mid_line(&path).await? {
            tracing::warn!(path = %path.display(), "terminating torn trailing line");
            line.insert(0, '\n');
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| io_error(&path, e))?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| io_error(&path, e))?;
        file.flush().await.map_err(|e| io_error(&path, e))?;

        tracing::debug!(event_id = %stored.id, "appended event");
        Ok(stored)
    }

    #[instrument(skip_all, fields(user = %user, requested = ids.len()))]
    async fn delete_many(&self, user: &UserId, ids: &[EventId]) -> Result<usize, StoreError> {
        let path = self.path_for(user)?;
        let targets: HashSet<&EventId> = ids.iter().collect();

        let _guard = self.write_lock.lock().await;
        let content = Self::read_lines(&path).await?;
        if content.is_empty() {
            return Ok(0);
        }

        let mut kept = String::with_capacity(content.len());
        let mut deleted = 0usize;
        for line in content.lines() {
            let matches = serde_json::from_str::<StoredId>(line)
                .map(|stored| targets.contains(&stored.id))
                .unwrap_or(false);
            if matches {
                deleted += 1;
            } else if !line.trim().is_empty() {
                // Lines we cannot decode are kept verbatim.
                kept.push_str(line);
                kept.push('\n');
            }
        }

        if deleted == 0 {
            return Ok(0);
        }

        let tmp = path.with_extension(format!("{EXTENSION}.tmp"));
        tokio::fs::write(&tmp, kept)
            .await
            .map_err(|e| io_error(&tmp, e))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| io_error(&path, e))?;

        tracing::debug!(deleted, "deleted events");
        Ok(deleted)
    }
}
