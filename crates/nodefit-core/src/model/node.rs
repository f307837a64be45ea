//! Candidate instance types and realised node allocations

use serde::{Deserialize, Serialize};

use super::resources::ResourceQuantity;
use super::workload::WorkloadProfile;

/// Standard number of hours used for monthly cost estimates.
pub const HOURS_PER_MONTH: f64 = 730.0;

/// EC2 purchasing option.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CapacityType {
    #[default]
    OnDemand,
    Spot,
}

/// CPU architecture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Architecture {
    Amd64,
    Arm64,
}

impl std::fmt::Display for Architecture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Architecture::Amd64 => write!(f, "amd64"),
            Architecture::Arm64 => write!(f, "arm64"),
        }
    }
}

/// A candidate EC2 instance type for the bin-packing simulation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeTemplate {
    /// e.g. "m7g.xlarge"
    pub instance_type: String,
    /// e.g. "m7g"
    pub instance_family: String,
    /// e.g. 7
    pub generation: u32,
    /// e.g. "xlarge"
    pub size: String,
    pub architecture: Architecture,

    /// Raw hardware capacity.
    pub vcpus: u32,
    pub memory_mib: i64,

    /// Capacity left after the kubelet/system reservation.
    pub allocatable_cpu_millis: i64,
    pub allocatable_memory_bytes: i64,

    /// Pod-density cap from the ENI formula.
    pub max_pods: u32,

    /// Hourly pricing.
    pub on_demand_price_per_hour: f64,
    #[serde(default)]
    pub spot_price_per_hour: f64,
    #[serde(default)]
    pub capacity_type: CapacityType,

    #[serde(default)]
    pub current_generation: bool,
    #[serde(default)]
    pub region: String,
}

impl NodeTemplate {
    /// Allocatable capacity as a single quantity.
    pub fn allocatable(&self) -> ResourceQuantity {
        ResourceQuantity::new(self.allocatable_cpu_millis, self.allocatable_memory_bytes)
    }

    /// Hourly price under the configured capacity type.
    pub fn effective_price_per_hour(&self) -> f64 {
        if self.capacity_type == CapacityType::Spot && self.spot_price_per_hour > 0.0 {
            self.spot_price_per_hour
        } else {
            self.on_demand_price_per_hour
        }
    }

    /// Estimated monthly cost at 730 hours/month.
    pub fn monthly_cost(&self) -> f64 {
        self.effective_price_per_hour() * HOURS_PER_MONTH
    }
}

/// One provisioned node and the workloads placed on it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeAllocation {
    pub template: NodeTemplate,
    pub workloads: Vec<WorkloadProfile>,
    pub used_cpu_millis: i64,
    pub used_memory_bytes: i64,
    pub pod_count: u32,

    /// Derived: used / allocatable, 0.0–1.0. Zero capacity yields zero.
    pub cpu_utilization: f64,
    pub mem_utilization: f64,
}

impl NodeAllocation {
    /// Unused CPU millicores on this node.
    pub fn cpu_waste(&self) -> i64 {
        self.template.allocatable_cpu_millis - self.used_cpu_millis
    }

    /// Unused memory bytes on this node.
    pub fn mem_waste(&self) -> i64 {
        self.template.allocatable_memory_bytes - self.used_memory_bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template() -> NodeTemplate {
        NodeTemplate {
            instance_type: "m6i.large".to_string(),
            instance_family: "m6i".to_string(),
            generation: 6,
            size: "large".to_string(),
            architecture: Architecture::Amd64,
            vcpus: 2,
            memory_mib: 8192,
            allocatable_cpu_millis: 1930,
            allocatable_memory_bytes: 7 * 1024 * 1024 * 1024,
            max_pods: 29,
            on_demand_price_per_hour: 0.096,
            spot_price_per_hour: 0.031,
            capacity_type: CapacityType::OnDemand,
            current_generation: true,
            region: "us-east-1".to_string(),
        }
    }

    #[test]
    fn test_effective_price_respects_capacity_type() {
        let mut t = template();
        assert_eq!(t.effective_price_per_hour(), 0.096);
        t.capacity_type = CapacityType::Spot;
        assert_eq!(t.effective_price_per_hour(), 0.031);
        // Spot without a known price falls back to on-demand
        t.spot_price_per_hour = 0.0;
        assert_eq!(t.effective_price_per_hour(), 0.096);
    }

    #[test]
    fn test_monthly_cost() {
        let t = template();
        assert!((t.monthly_cost() - 0.096 * 730.0).abs() < 1e-9);
    }
}
