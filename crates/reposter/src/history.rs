//! Engagement history - the dedup window of everything already republished.
//!
//! The whole document is rewritten on every append. That is only safe with a
//! single writer (the run-loop worker); running several workers against the
//! same file needs a temp-file + rename write first.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AgentError, Result};

/// One republished item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngagementRecord {
    /// Platform id of the original item.
    pub post_id: String,
    /// Author of the original item.
    pub author: String,
    /// When it was republished (RFC 3339, UTC).
    pub timestamp: String,
}

impl EngagementRecord {
    /// Create a record stamped with the current time.
    #[must_use]
    pub fn now(post_id: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            post_id: post_id.into(),
            author: author.into(),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }
}

/// Ordered, append-only list of records as stored on disk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngagementHistory {
    #[serde(default)]
    pub posts: Vec<EngagementRecord>,
}

impl EngagementHistory {
    /// Check if an item was already republished.
    pub fn contains(&self, post_id: &str) -> bool {
        self.posts.iter().any(|r| r.post_id == post_id)
    }

    /// Ids to exclude from discovery.
    pub fn post_ids(&self) -> HashSet<String> {
        self.posts.iter().map(|r| r.post_id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }
}

/// File-backed history owned by the worker.
#[derive(Debug)]
pub struct HistoryStore {
    path: PathBuf,
    history: EngagementHistory,
}

impl HistoryStore {
    /// Load history from a JSON file.
    ///
    /// Never fails: a missing file starts an empty history, and an unreadable
    /// or corrupt one (e.g. truncated by a crash mid-write) is logged and
    /// replaced by an empty history.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let history = match Self::read(&path) {
            Ok(Some(history)) => {
                tracing::debug!(path = %path.display(), records = history.len(), "Loaded engagement history");
                history
            }
            Ok(None) => {
                tracing::info!(path = %path.display(), "No engagement history yet, starting empty");
                EngagementHistory::default()
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Engagement history unreadable, starting empty");
                EngagementHistory::default()
            }
        };

        Self { path, history }
    }

    fn read(path: &Path) -> anyhow::Result<Option<EngagementHistory>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    /// Append a record and rewrite the whole file.
    ///
    /// The in-memory history keeps the record even when the write fails.
    pub fn append(&mut self, record: EngagementRecord) -> Result<()> {
        if self.history.contains(&record.post_id) {
            tracing::warn!(post_id = %record.post_id, "Appending an id already present in history");
        }
        self.history.posts.push(record);
        self.persist()
    }

    /// Overwrite the file with the current history.
    pub fn persist(&self) -> Result<()> {
        let content = serde_json::to_string_pretty(&self.history)?;
        let to_persistence = |source| AgentError::Persistence {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(to_persistence)?;
        }
        std::fs::write(&self.path, content).map_err(to_persistence)?;
        Ok(())
    }

    pub fn history(&self) -> &EngagementHistory {
        &self.history
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
