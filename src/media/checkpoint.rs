//! Resumable download checkpoint.
//!
//! The checkpoint records source URLs whose files are fully on disk. It is
//! only ever updated after the asset's final rename, so a crash can leave an
//! unrecorded complete file (re-downloaded next run, harmless) but never a
//! recorded incomplete one.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::MediaError;

/// Checkpoint file name, kept in the output directory root.
pub const CHECKPOINT_FILE: &str = ".wparchive_checkpoint.json";

#[derive(Debug, Serialize, Deserialize)]
struct CheckpointFile {
    completed: Vec<String>,
    updated_at: u64,
}

/// Set of completed source URLs, persisted as JSON.
#[derive(Debug)]
pub struct Checkpoint {
    path: PathBuf,
    completed: HashSet<String>,
}

impl Checkpoint {
    /// Loads the checkpoint for an output directory. A missing or corrupt
    /// file yields an empty checkpoint; resumption is best-effort and a bad
    /// checkpoint only costs re-downloads.
    #[must_use]
    pub fn load(out_dir: &Path) -> Self {
        let path = out_dir.join(CHECKPOINT_FILE);
        let completed = match std::fs::read_to_string(&path) {
            Ok(body) => match serde_json::from_str::<CheckpointFile>(&body) {
                Ok(file) => {
                    debug!(completed = file.completed.len(), "checkpoint loaded");
                    file.completed.into_iter().collect()
                }
                Err(error) => {
                    warn!(%error, "corrupt checkpoint, starting fresh");
                    HashSet::new()
                }
            },
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => HashSet::new(),
            Err(error) => {
                warn!(%error, "unreadable checkpoint, starting fresh");
                HashSet::new()
            }
        };
        Self { path, completed }
    }

    /// Creates an empty checkpoint, ignoring any persisted state.
    #[must_use]
    pub fn fresh(out_dir: &Path) -> Self {
        Self {
            path: out_dir.join(CHECKPOINT_FILE),
            completed: HashSet::new(),
        }
    }

    /// Whether an asset is already recorded complete.
    #[must_use]
    pub fn contains(&self, source_url: &str) -> bool {
        self.completed.contains(source_url)
    }

    /// Records an asset as complete. Call only after the final rename.
    pub fn record(&mut self, source_url: String) {
        self.completed.insert(source_url);
    }

    /// Number of recorded assets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.completed.len()
    }

    /// Whether no assets are recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.completed.is_empty()
    }

    /// Persists the checkpoint atomically via a temp file and rename.
    ///
    /// # Errors
    ///
    /// Returns [`MediaError::Io`] when the file cannot be written.
    pub fn persist(&self) -> Result<(), MediaError> {
        let mut completed: Vec<&String> = self.completed.iter().collect();
        completed.sort();
        let file = CheckpointFile {
            completed: completed.into_iter().cloned().collect(),
            updated_at: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0),
        };

        let body = serde_json::to_string_pretty(&file)
            .map_err(|e| MediaError::io(&self.path, e.into()))?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, body).map_err(|e| MediaError::io(&tmp, e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| MediaError::io(&self.path, e))?;
        Ok(())
    }
}
