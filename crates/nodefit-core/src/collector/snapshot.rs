//! Snapshot-file collector
//!
//! Loads a previously saved `ClusterState` from JSON. Used for offline
//! analysis, CI pipelines, and tests; the `inspect` command produces the
//! same document this collector consumes.

use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::{CollectOptions, MetricsCollector};
use crate::error::CollectError;
use crate::model::ClusterState;

/// Collector backed by a snapshot file or a pre-built state.
pub struct SnapshotCollector {
    path: Option<PathBuf>,
    state: Option<ClusterState>,
}

impl SnapshotCollector {
    /// Reads the snapshot from a JSON file at collect time.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            state: None,
        }
    }

    /// Serves a pre-built state, bypassing the filesystem.
    pub fn from_state(state: ClusterState) -> Self {
        Self {
            path: None,
            state: Some(state),
        }
    }
}

#[async_trait]
impl MetricsCollector for SnapshotCollector {
    async fn collect(&self, _opts: &CollectOptions) -> Result<ClusterState, CollectError> {
        let state = match (&self.state, &self.path) {
            (Some(state), _) => state.clone(),
            (None, Some(path)) => {
                let data = fs::read(path)?;
                serde_json::from_slice(&data)?
            }
            (None, None) => return Err(CollectError::NoMetrics),
        };

        if state.workloads.is_empty() && state.daemon_sets.is_empty() {
            return Err(CollectError::NoMetrics);
        }
        Ok(state)
    }

    async fn ping(&self) -> Result<(), CollectError> {
        if let Some(path) = &self.path {
            fs::metadata(path)?;
        }
        Ok(())
    }

    fn backend_type(&self) -> &str {
        "snapshot"
    }
}

/// Writes a cluster state as a pretty-printed JSON snapshot.
pub fn save_snapshot(state: &ClusterState, path: &Path) -> Result<(), CollectError> {
    let data = serde_json::to_vec_pretty(state)?;
    fs::write(path, data)?;
    Ok(())
}
