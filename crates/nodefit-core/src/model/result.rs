//! Simulation outcomes, derived metrics, and ranked recommendations

use serde::{Deserialize, Serialize};

use super::node::NodeAllocation;
use super::scenario::Scenario;
use super::workload::WorkloadProfile;

/// Resource waste patterns across the simulated fleet.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct FragmentationReport {
    /// Idle CPU trapped on memory-saturated nodes.
    pub stranded_cpu_millis: i64,
    /// Idle memory trapped on CPU-saturated nodes.
    pub stranded_memory_bytes: i64,
    /// Fraction of nodes below 50% utilisation on either dimension.
    pub underutilized_node_fraction: f64,
    /// 1.0 = CPU and memory utilisation perfectly balanced on every node.
    pub resource_balance_score: f64,
}

/// How well a configuration handles the observed scaling range.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScalingEfficiency {
    /// Observed min/max node-count ratio.
    pub scaling_ratio: f64,
    pub observed_min_nodes: u32,
    pub observed_max_nodes: u32,
    /// max(min_nodes, ceil(peak_nodes × ratio))
    pub est_trough_nodes: u32,
    /// Estimated per-node CPU utilisation at the trough, 0.0–1.0.
    pub est_trough_cpu_util: f64,
}

/// The outcome of a single bin-packing run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationResult {
    pub scenario: Scenario,
    pub nodes: Vec<NodeAllocation>,

    pub total_nodes: usize,
    pub total_monthly_cost: f64,
    pub total_cpu_millis: i64,
    pub total_memory_bytes: i64,
    pub used_cpu_millis: i64,
    pub used_memory_bytes: i64,

    pub avg_cpu_utilization: f64,
    pub avg_mem_utilization: f64,
    pub fragmentation: FragmentationReport,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scaling_efficiency: Option<ScalingEfficiency>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unschedulable: Vec<WorkloadProfile>,

    pub duration_ms: u64,
}

/// Relative importance of the four scoring dimensions. Must sum to ≈1.0;
/// the caller validates, the scorer does not renormalise.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    pub cost: f64,
    pub utilization: f64,
    pub fragmentation: f64,
    pub resilience: f64,
}

impl ScoringWeights {
    pub fn sum(&self) -> f64 {
        self.cost + self.utilization + self.fragmentation + self.resilience
    }
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            cost: 0.40,
            utilization: 0.30,
            fragmentation: 0.15,
            resilience: 0.15,
        }
    }
}

/// A scored and ranked simulation result, the final output of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub rank: usize,
    pub result: SimulationResult,

    pub monthly_cost: f64,
    /// Percentage vs the baseline cost; negative = savings. Zero when no
    /// baseline was supplied.
    #[serde(default)]
    pub cost_vs_baseline_pct: f64,
    #[serde(default)]
    pub annual_savings: f64,

    /// Component scores, each 0–100.
    pub overall_score: f64,
    pub cost_score: f64,
    pub utilization_score: f64,
    pub fragmentation_score: f64,
    pub resilience_score: f64,

    pub rationale: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}
