//! Time-boxed local stash of unsaved coordinate text.
//!
//! Sample mode has no server-side storage, so the text buffer is written to
//! a small JSON file and restored on the next start if it is younger than
//! the configured maximum age. The file is removed after every restore
//! attempt, fresh or not.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct StashedText {
    text: String,
    saved_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct TextStash {
    path: PathBuf,
    max_age: Duration,
}

impl TextStash {
    pub fn new(path: PathBuf, max_age_hours: i64) -> Self {
        Self {
            path,
            max_age: Duration::hours(max_age_hours),
        }
    }

    /// Stash `text`. Blank text is not stashed.
    pub fn save(&self, text: &str) -> Result<()> {
        self.save_at(text, Utc::now())
    }

    pub fn save_at(&self, text: &str, now: DateTime<Utc>) -> Result<()> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let body = serde_json::to_string(&StashedText {
            text: text.to_string(),
            saved_at: now,
        })?;
        std::fs::write(&self.path, body)
            .with_context(|| format!("Failed to write stash {}", self.path.display()))?;
        Ok(())
    }

    /// Restore and discard the stash.
    pub fn take(&self) -> Option<String> {
        self.take_at(Utc::now())
    }

    pub fn take_at(&self, now: DateTime<Utc>) -> Option<String> {
        let raw = std::fs::read_to_string(&self.path).ok()?;
        if let Err(e) = std::fs::remove_file(&self.path) {
            warn!(target: "stash", "Failed to remove stash {}: {}", self.path.display(), e);
        }

        let stashed: StashedText = match serde_json::from_str(&raw) {
            Ok(s) => s,
            Err(e) => {
                warn!(target: "stash", "Discarding unreadable stash: {}", e);
                return None;
            }
        };

        let age = now.signed_duration_since(stashed.saved_at);
        if age >= self.max_age {
            info!(target: "stash", age_minutes = age.num_minutes(), "Discarding expired stash");
            return None;
        }
        Some(stashed.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stash_in(dir: &tempfile::TempDir) -> TextStash {
        TextStash::new(dir.path().join("stash.json"), 24)
    }

    #[test]
    fn fresh_stash_is_restored_once() {
        let dir = tempfile::tempdir().unwrap();
        let stash = stash_in(&dir);
        let now = Utc::now();

        stash.save_at("  [1,2,3] home  ", now).unwrap();
        assert_eq!(
            stash.take_at(now + Duration::hours(1)).as_deref(),
            Some("[1,2,3] home")
        );
        assert_eq!(stash.take_at(now + Duration::hours(1)), None);
    }

    #[test]
    fn expired_stash_is_discarded() {
        let dir = tempfile::tempdir().unwrap();
        let stash = stash_in(&dir);
        let now = Utc::now();

        stash.save_at("[1,2,3]", now).unwrap();
        assert_eq!(stash.take_at(now + Duration::hours(24)), None);
        assert!(!dir.path().join("stash.json").exists());
    }

    #[test]
    fn blank_text_is_not_stashed() {
        let dir = tempfile::tempdir().unwrap();
        let stash = stash_in(&dir);
        stash.save("   \n").unwrap();
        assert!(!dir.path().join("stash.json").exists());
    }

    #[test]
    fn corrupt_stash_is_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let stash = stash_in(&dir);
        std::fs::write(dir.path().join("stash.json"), "{not json").unwrap();
        assert_eq!(stash.take(), None);
    }
}
