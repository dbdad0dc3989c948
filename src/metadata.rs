//! Metadata persisted between runs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};
use crate::writer::write_if_changed;

/// What the previous run published.
///
/// `last_updated` only moves when an artifact changes, which keeps the
/// report timestamp stable across no-op runs.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct RunMetadata {
    /// When the artifacts last changed, as unix seconds
    #[serde(default, with = "chrono::serde::ts_seconds_option")]
    pub last_updated: Option<DateTime<Utc>>,
    /// Artifact file name -> SHA-256 of its content
    #[serde(default)]
    pub digests: BTreeMap<String, String>,
}

impl RunMetadata {
    /// Load metadata from a file.
    ///
    /// Returns default metadata if the file doesn't exist or can't be parsed;
    /// a corrupt file only costs a fresh timestamp.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(_) => return Self::default(),
        };
        serde_json::from_str(&content).unwrap_or_else(|e| {
            log::warn!("Ignoring unreadable metadata {:?}: {}", path, e);
            Self::default()
        })
    }

    /// Save metadata to a file, only if it changed.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<bool> {
        let content = serde_json::to_string_pretty(self).map_err(Error::Json)?;
        write_if_changed(path.as_ref(), &content)
    }

    /// Whether the recorded digests differ from `digests`.
    pub fn digests_differ(&self, digests: &BTreeMap<String, String>) -> bool {
        &self.digests != digests
    }

    /// Get the last updated time.
    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.last_updated
    }
}
