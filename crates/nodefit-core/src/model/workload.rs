//! Workload resource profiles derived from historical metrics

use serde::{Deserialize, Serialize};

use super::node::Architecture;
use super::resources::{PercentileValues, ResourceQuantity};

/// The resource footprint of a single pod or replica group.
///
/// Built once by the sizing stage and never mutated afterwards: the
/// `effective` demand is the only quantity the packer looks at.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkloadProfile {
    pub namespace: String,
    pub name: String,
    #[serde(default)]
    pub owner_kind: String,
    #[serde(default)]
    pub owner_name: String,

    /// Requests and limits as declared in the pod spec.
    pub requested: ResourceQuantity,
    #[serde(default)]
    pub limits: ResourceQuantity,

    /// Observed usage: CPU in cores, memory in bytes.
    #[serde(default)]
    pub cpu_usage: PercentileValues,
    #[serde(default)]
    pub memory_usage: PercentileValues,

    /// Derived sizing at the configured percentile, used for bin-packing.
    pub effective: ResourceQuantity,

    /// Required CPU architecture (None = any).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_architecture: Option<Architecture>,

    /// Runs on every node; its demand is subtracted from per-node capacity.
    #[serde(default)]
    pub is_daemonset: bool,

    /// No usage was observed; the declared request was used as-is.
    #[serde(default)]
    pub no_metrics: bool,
}

/// Total effective CPU and memory across a slice of workloads.
pub fn sum_effective(workloads: &[WorkloadProfile]) -> ResourceQuantity {
    workloads
        .iter()
        .fold(ResourceQuantity::default(), |acc, w| acc + w.effective)
}
