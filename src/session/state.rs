use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, Utc};

use crate::foundation::error::BakeResult;

/// Environment variable redirecting the session-state directory.
pub const STATE_DIR_ENV: &str = "TEXBAKE_STATE_DIR";
const STATE_FILE: &str = "last_session.json";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SessionStatus {
    #[default]
    Started,
    Running,
    Error,
}

/// Persisted progress of the running bake. Its presence at startup means
/// the previous session never finished.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SessionRecord {
    pub status: SessionStatus,
    pub job_name: String,
    pub total_steps: usize,
    pub current_step: usize,
    pub current_object: String,
    pub current_channel: String,
    pub last_error: String,
    pub started_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Crash-recovery log: one JSON file, rewritten and synced on every change.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionStateTracker {
    path: PathBuf,
}

impl Default for SessionStateTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStateTracker {
    /// Tracker at `$TEXBAKE_STATE_DIR/last_session.json`, falling back to
    /// `<temp>/texbake/last_session.json`.
    pub fn new() -> Self {
        let dir = std::env::var_os(STATE_DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| std::env::temp_dir().join("texbake"));
        Self::at(dir.join(STATE_FILE))
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn start(&self, job_name: &str, total_steps: usize) -> BakeResult<()> {
        let now = Utc::now();
        self.write(&SessionRecord {
            status: SessionStatus::Started,
            job_name: job_name.to_string(),
            total_steps,
            started_at: Some(now),
            updated_at: Some(now),
            ..SessionRecord::default()
        })
    }

    /// Merge the current position into the record; a missing or corrupt
    /// record starts fresh.
    pub fn update_step(&self, step: usize, object: &str, channel: &str) -> BakeResult<()> {
        let mut record = self.read().unwrap_or_default();
        record.status = SessionStatus::Running;
        record.current_step = step;
        record.current_object = object.to_string();
        record.current_channel = channel.to_string();
        record.updated_at = Some(Utc::now());
        self.write(&record)
    }

    /// Flag the session as failed. The record is kept for the next startup.
    pub fn log_error(&self, message: &str) -> BakeResult<()> {
        let mut record = self.read().unwrap_or_default();
        record.status = SessionStatus::Error;
        record.last_error = message.to_string();
        record.updated_at = Some(Utc::now());
        self.write(&record)
    }

    /// Normal end of a session: the record disappears.
    pub fn finish(&self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "session record removed"),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => tracing::warn!(path = %self.path.display(), %err, "failed to remove session record"),
        }
    }

    /// The stored record, or `None` when absent or unreadable.
    pub fn read(&self) -> Option<SessionRecord> {
        let text = std::fs::read_to_string(&self.path).ok()?;
        match serde_json::from_str(&text) {
            Ok(record) => Some(record),
            Err(err) => {
                tracing::debug!(path = %self.path.display(), %err, "ignoring corrupt session record");
                None
            }
        }
    }

    pub fn has_crash_record(&self) -> bool {
        self.path.is_file()
    }

    fn write(&self, record: &SessionRecord) -> BakeResult<()> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("create session dir {}", dir.display()))?;
        }
        let text = serde_json::to_string_pretty(record)?;
        let mut file = File::create(&self.path)
            .with_context(|| format!("create session record {}", self.path.display()))?;
        file.write_all(text.as_bytes())
            .and_then(|()| file.flush())
            .and_then(|()| file.sync_all())
            .with_context(|| format!("write session record {}", self.path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/state.rs"]
mod tests;
