//! Workload classification
//!
//! Derives the dominant resource profile of a cluster from its aggregate
//! GiB-per-vCPU ratio and maps it to the instance families worth probing.

use serde::{Deserialize, Serialize};

use crate::model::ClusterState;

const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// The dominant resource profile of a cluster's workloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WorkloadClass {
    ComputeOptimized,
    GeneralPurpose,
    MemoryOptimized,
}

impl std::fmt::Display for WorkloadClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkloadClass::ComputeOptimized => write!(f, "compute-optimized"),
            WorkloadClass::GeneralPurpose => write!(f, "general-purpose"),
            WorkloadClass::MemoryOptimized => write!(f, "memory-optimized"),
        }
    }
}

/// CPU vendor line used to pick concrete instance families.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Vendor {
    #[default]
    Intel,
    Amd,
    Graviton,
}

/// Classifies the cluster by its GiB-per-vCPU ratio and returns the class
/// plus the ratio itself.
///
/// Cluster-level aggregate P95 is preferred when available: per-pod sizing
/// uses max(request, usage), which inflates CPU when pods over-request
/// relative to what they actually use. Zero CPU classifies as
/// (general-purpose, 4.0).
pub fn classify_workloads(state: &ClusterState) -> (WorkloadClass, f64) {
    let (vcpus, gib) = match state.aggregate_metrics {
        Some(m) if m.p95_cpu_cores > 0.0 && m.p95_memory_bytes > 0.0 => {
            (m.p95_cpu_cores, m.p95_memory_bytes / GIB)
        }
        _ => {
            let total = state.total_effective();
            if total.cpu_millis == 0 {
                return (WorkloadClass::GeneralPurpose, 4.0);
            }
            (
                total.cpu_millis as f64 / 1000.0,
                total.memory_bytes as f64 / GIB,
            )
        }
    };

    if vcpus == 0.0 {
        return (WorkloadClass::GeneralPurpose, 4.0);
    }

    let ratio = gib / vcpus;
    let class = if ratio < 3.0 {
        WorkloadClass::ComputeOptimized
    } else if ratio > 6.0 {
        WorkloadClass::MemoryOptimized
    } else {
        WorkloadClass::GeneralPurpose
    };
    (class, ratio)
}

/// The two most recent instance families for a class and vendor.
pub fn families_for_class(class: WorkloadClass, vendor: Vendor) -> Vec<String> {
    let families: [&str; 2] = match (class, vendor) {
        (WorkloadClass::ComputeOptimized, Vendor::Intel) => ["c7i", "c6i"],
        (WorkloadClass::ComputeOptimized, Vendor::Amd) => ["c7a", "c6a"],
        (WorkloadClass::ComputeOptimized, Vendor::Graviton) => ["c7g", "c6g"],
        (WorkloadClass::GeneralPurpose, Vendor::Intel) => ["m7i", "m6i"],
        (WorkloadClass::GeneralPurpose, Vendor::Amd) => ["m7a", "m6a"],
        (WorkloadClass::GeneralPurpose, Vendor::Graviton) => ["m7g", "m6g"],
        (WorkloadClass::MemoryOptimized, Vendor::Intel) => ["r7i", "r6i"],
        (WorkloadClass::MemoryOptimized, Vendor::Amd) => ["r7a", "r6a"],
        (WorkloadClass::MemoryOptimized, Vendor::Graviton) => ["r7g", "r6g"],
    };
    families.iter().map(|f| f.to_string()).collect()
}

/// Families to probe for a classified cluster. A non-general class gets the
/// general-purpose families of the same vendor appended as a fallback pool,
/// so a middle-ground sizing is always evaluated.
pub fn probe_families(class: WorkloadClass, vendor: Vendor) -> Vec<String> {
    let mut families = families_for_class(class, vendor);
    if class != WorkloadClass::GeneralPurpose {
        families.extend(families_for_class(WorkloadClass::GeneralPurpose, vendor));
    }
    families
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        AggregateMetrics, PercentileValues, ResourceQuantity, TimeWindow, WorkloadProfile,
    };
    use chrono::{TimeZone, Utc};

    fn state_with_effective(cpu_millis: i64, memory_bytes: i64) -> ClusterState {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        ClusterState {
            collected_at: start,
            metrics_window: TimeWindow {
                start,
                end: start + chrono::Duration::days(7),
                step_secs: 300,
            },
            workloads: vec![WorkloadProfile {
                namespace: "default".to_string(),
                name: "app".to_string(),
                requested: ResourceQuantity::new(cpu_millis, memory_bytes),
                cpu_usage: PercentileValues::default(),
                memory_usage: PercentileValues::default(),
                effective: ResourceQuantity::new(cpu_millis, memory_bytes),
                ..Default::default()
            }],
            daemon_sets: Vec::new(),
            system_reserved: ResourceQuantity::default(),
            aggregate_metrics: None,
            cluster_name: "test".to_string(),
            region: "us-east-1".to_string(),
        }
    }

    #[test]
    fn test_ratio_buckets() {
        let (class, ratio) = classify_workloads(&state_with_effective(4000, 8 * 1024 * 1024 * 1024));
        assert_eq!(class, WorkloadClass::ComputeOptimized);
        assert!((ratio - 2.0).abs() < 1e-9);

        let (class, _) = classify_workloads(&state_with_effective(2000, 8 * 1024 * 1024 * 1024));
        assert_eq!(class, WorkloadClass::GeneralPurpose);

        let (class, _) = classify_workloads(&state_with_effective(1000, 8 * 1024 * 1024 * 1024));
        assert_eq!(class, WorkloadClass::MemoryOptimized);
    }

    #[test]
    fn test_boundary_ratios_are_general() {
        // Exactly 3.0 and 6.0 GiB/vCPU are general-purpose
        let (class, _) = classify_workloads(&state_with_effective(1000, 3 * 1024 * 1024 * 1024));
        assert_eq!(class, WorkloadClass::GeneralPurpose);
        let (class, _) = classify_workloads(&state_with_effective(1000, 6 * 1024 * 1024 * 1024));
        assert_eq!(class, WorkloadClass::GeneralPurpose);
    }

    #[test]
    fn test_zero_cpu_defaults_to_general() {
        let (class, ratio) = classify_workloads(&state_with_effective(0, 8 * 1024 * 1024 * 1024));
        assert_eq!(class, WorkloadClass::GeneralPurpose);
        assert_eq!(ratio, 4.0);
    }

    #[test]
    fn test_aggregate_metrics_preferred() {
        // Effective demand says compute, aggregate P95 says memory
        let mut state = state_with_effective(4000, 8 * 1024 * 1024 * 1024);
        state.aggregate_metrics = Some(AggregateMetrics {
            p95_cpu_cores: 1.0,
            p95_memory_bytes: 8.0 * 1024.0 * 1024.0 * 1024.0,
            min_node_count: 1,
            max_node_count: 2,
        });
        let (class, ratio) = classify_workloads(&state);
        assert_eq!(class, WorkloadClass::MemoryOptimized);
        assert!((ratio - 8.0).abs() < 1e-9);
    }

    #[test]
    fn test_probe_families_appends_general_fallback() {
        let families = probe_families(WorkloadClass::ComputeOptimized, Vendor::Graviton);
        assert_eq!(families, vec!["c7g", "c6g", "m7g", "m6g"]);

        let general = probe_families(WorkloadClass::GeneralPurpose, Vendor::Intel);
        assert_eq!(general, vec!["m7i", "m6i"]);
    }
}
