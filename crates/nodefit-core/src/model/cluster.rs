//! Cluster snapshot: the observed input to the simulation engine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::resources::ResourceQuantity;
use super::workload::{sum_effective, WorkloadProfile};

/// The time range metrics were collected over.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Query resolution in seconds.
    pub step_secs: i64,
}

impl TimeWindow {
    /// Window length in seconds.
    pub fn duration_secs(&self) -> i64 {
        (self.end - self.start).num_seconds()
    }
}

/// Cluster-wide aggregates over the full metrics window, capturing scaling
/// peaks that per-pod snapshots miss.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AggregateMetrics {
    pub p95_cpu_cores: f64,
    pub p95_memory_bytes: f64,
    pub min_node_count: u32,
    pub max_node_count: u32,
}

impl AggregateMetrics {
    /// Observed min/max node-count ratio, 1.0 when max is zero.
    pub fn scaling_ratio(&self) -> f64 {
        if self.max_node_count == 0 {
            1.0
        } else {
            f64::from(self.min_node_count) / f64::from(self.max_node_count)
        }
    }
}

/// A point-in-time snapshot of cluster workloads and configuration.
///
/// Read-only for the duration of a simulation run; workers share it behind
/// an `Arc` and never write through it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterState {
    pub collected_at: DateTime<Utc>,
    pub metrics_window: TimeWindow,

    /// Workload profiles excluding DaemonSets.
    pub workloads: Vec<WorkloadProfile>,

    /// DaemonSet workloads, charged against every node.
    #[serde(default)]
    pub daemon_sets: Vec<WorkloadProfile>,

    /// Per-node system overhead (kubelet, kube-proxy, ...).
    #[serde(default)]
    pub system_reserved: ResourceQuantity,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregate_metrics: Option<AggregateMetrics>,

    #[serde(default)]
    pub cluster_name: String,
    #[serde(default)]
    pub region: String,
}

impl ClusterState {
    pub fn workload_count(&self) -> usize {
        self.workloads.len()
    }

    /// Summed effective demand of all non-DaemonSet workloads.
    pub fn total_effective(&self) -> ResourceQuantity {
        sum_effective(&self.workloads)
    }

    /// Total DaemonSet demand charged against each node.
    pub fn daemonset_overhead(&self) -> ResourceQuantity {
        sum_effective(&self.daemon_sets)
    }

    /// Observed min/max node ratio, 1.0 when metrics are absent.
    pub fn scaling_ratio(&self) -> f64 {
        self.aggregate_metrics
            .map(|m| m.scaling_ratio())
            .unwrap_or(1.0)
    }
}
