use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum StateError {
    #[error("state file I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("state file encoding failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Correlation maps that outlive a single process run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrelationSnapshot {
    /// evidence group id (decimal) -> normalized item id
    #[serde(default)]
    pub evidence_groups: BTreeMap<String, String>,
    /// normalized item id -> content reference of its NewItem data
    #[serde(default)]
    pub content_refs: BTreeMap<String, String>,
}

impl CorrelationSnapshot {
    pub fn is_empty(&self) -> bool {
        self.evidence_groups.is_empty() && self.content_refs.is_empty()
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct StateFile {
    last_processed_block: i64,
    #[serde(default, skip_serializing_if = "CorrelationSnapshot::is_empty")]
    correlations: CorrelationSnapshot,
}

/// JSON file holding the last fully processed block.
///
/// Writes go to a sibling temp file that is then renamed over the real one,
/// so a crash leaves either the previous or the new state on disk.
#[derive(Debug, Clone)]
pub struct CursorStore {
    path: PathBuf,
}

impl CursorStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the persisted cursor, or `default` when the file is missing or
    /// unreadable. A persisted `-1` means nothing has been processed yet.
    pub fn load(&self, default: Option<u64>) -> Option<u64> {
        match self.read() {
            Ok(Some(state)) => u64::try_from(state.last_processed_block).ok(),
            Ok(None) => default,
            Err(e) => {
                warn!("State file {} corrupted ({}), defaulting to {:?}", self.path.display(), e, default);
                default
            }
        }
    }

    /// Persisted correlation maps; empty when the file is missing or unreadable.
    pub fn load_correlations(&self) -> CorrelationSnapshot {
        match self.read() {
            Ok(Some(state)) => state.correlations,
            Ok(None) => CorrelationSnapshot::default(),
            Err(e) => {
                warn!("Ignoring correlations in {}: {}", self.path.display(), e);
                CorrelationSnapshot::default()
            }
        }
    }

    pub fn save(&self, block_number: u64) -> Result<(), StateError> {
        self.save_with_correlations(block_number, &CorrelationSnapshot::default())
    }

    pub fn save_with_correlations(
        &self,
        block_number: u64,
        correlations: &CorrelationSnapshot,
    ) -> Result<(), StateError> {
        let state = StateFile {
            last_processed_block: i64::try_from(block_number).unwrap_or(i64::MAX),
            correlations: correlations.clone(),
        };
        let encoded = serde_json::to_string_pretty(&state)?;

        let tmp_path = self.tmp_path();
        fs::write(&tmp_path, encoded)?;
        fs::rename(&tmp_path, &self.path)?;

        debug!("Saved cursor {} to {}", block_number, self.path.display());
        Ok(())
    }

    fn read(&self) -> Result<Option<StateFile>, StateError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_str(&contents)?))
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".tmp");
        PathBuf::from(name)
    }
}
