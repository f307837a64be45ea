//! Metrics collection
//!
//! Collectors turn a metrics backend (or a saved snapshot) into a
//! `ClusterState` ready for simulation: workload identities, declared
//! requests and limits, percentile usage, and effective sizing.

mod prometheus;
mod snapshot;

pub use prometheus::PrometheusCollector;
pub use snapshot::{save_snapshot, SnapshotCollector};

use async_trait::async_trait;

use crate::error::CollectError;
use crate::model::{ClusterState, TimeWindow};

/// Parameters for a collection run.
#[derive(Debug, Clone)]
pub struct CollectOptions {
    pub window: TimeWindow,
    /// Namespaces to include (empty = all).
    pub namespaces: Vec<String>,
    /// Namespaces to drop from the profile.
    pub exclude_namespaces: Vec<String>,
    /// Percentile for effective sizing, (0, 1].
    pub percentile: f64,
}

/// Source of pod-level resource usage profiles.
#[async_trait]
pub trait MetricsCollector: Send + Sync {
    /// Gathers workload profiles for the cluster.
    async fn collect(&self, opts: &CollectOptions) -> Result<ClusterState, CollectError>;

    /// Validates connectivity to the backend.
    async fn ping(&self) -> Result<(), CollectError>;

    /// Identifies the backend for logs and reports.
    fn backend_type(&self) -> &str;
}
