//! Effective demand derivation
//!
//! Collapses a workload's declared request and percentile-indexed usage
//! into the single quantity the bin-packer operates on.

use crate::model::{ResourceQuantity, WorkloadProfile};

/// Smallest effective CPU demand, millicores.
pub const MIN_EFFECTIVE_CPU_MILLIS: i64 = 10;

/// Smallest effective memory demand, bytes (64 MiB).
pub const MIN_EFFECTIVE_MEMORY_BYTES: i64 = 64 * 1024 * 1024;

/// Derives the effective demand for one workload at the given percentile:
/// max(declared request, observed usage at the percentile), then floors.
/// A workload with no observed P95 usage on either dimension is marked
/// `no_metrics` and sized from its request alone.
pub fn apply_effective_sizing(workload: &mut WorkloadProfile, percentile: f64) {
    let cpu_at = workload.cpu_usage.at_percentile(percentile);
    let mem_at = workload.memory_usage.at_percentile(percentile);

    let mut eff_cpu = (workload.requested.cpu_millis as f64).max(cpu_at * 1000.0) as i64;
    let mut eff_mem = (workload.requested.memory_bytes as f64).max(mem_at) as i64;

    if workload.cpu_usage.p95 == 0.0 && workload.memory_usage.p95 == 0.0 {
        workload.no_metrics = true;
        eff_cpu = workload.requested.cpu_millis;
        eff_mem = workload.requested.memory_bytes;
    }

    workload.effective = ResourceQuantity::new(
        eff_cpu.max(MIN_EFFECTIVE_CPU_MILLIS),
        eff_mem.max(MIN_EFFECTIVE_MEMORY_BYTES),
    );
}

/// Sizes every profile and splits the set into (workloads, daemonsets).
/// A profile whose owner kind is `DaemonSet` is charged per node instead
/// of being packed.
pub fn size_and_partition(
    mut profiles: Vec<WorkloadProfile>,
    percentile: f64,
) -> (Vec<WorkloadProfile>, Vec<WorkloadProfile>) {
    let mut workloads = Vec::new();
    let mut daemon_sets = Vec::new();

    for profile in profiles.iter_mut() {
        apply_effective_sizing(profile, percentile);
        if profile.owner_kind == "DaemonSet" {
            profile.is_daemonset = true;
        }
    }

    for profile in profiles {
        if profile.is_daemonset {
            daemon_sets.push(profile);
        } else {
            workloads.push(profile);
        }
    }

    (workloads, daemon_sets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PercentileValues;

    fn workload(request_cpu: i64, request_mem: i64, p95_cores: f64, p95_bytes: f64) -> WorkloadProfile {
        WorkloadProfile {
            namespace: "default".to_string(),
            name: "app".to_string(),
            requested: ResourceQuantity::new(request_cpu, request_mem),
            cpu_usage: PercentileValues {
                p50: p95_cores / 2.0,
                p95: p95_cores,
                p99: p95_cores,
                max: p95_cores,
            },
            memory_usage: PercentileValues {
                p50: p95_bytes / 2.0,
                p95: p95_bytes,
                p99: p95_bytes,
                max: p95_bytes,
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_usage_wins_over_smaller_request() {
        let mut w = workload(100, 128 * 1024 * 1024, 0.5, 512.0 * 1024.0 * 1024.0);
        apply_effective_sizing(&mut w, 0.95);
        assert_eq!(w.effective.cpu_millis, 500);
        assert_eq!(w.effective.memory_bytes, 512 * 1024 * 1024);
        assert!(!w.no_metrics);
    }

    #[test]
    fn test_request_wins_over_smaller_usage() {
        let mut w = workload(2000, 4 * 1024 * 1024 * 1024, 0.5, 1024.0 * 1024.0 * 1024.0);
        apply_effective_sizing(&mut w, 0.95);
        assert_eq!(w.effective.cpu_millis, 2000);
        assert_eq!(w.effective.memory_bytes, 4 * 1024 * 1024 * 1024);
    }

    #[test]
    fn test_no_metrics_uses_request() {
        let mut w = workload(250, 256 * 1024 * 1024, 0.0, 0.0);
        apply_effective_sizing(&mut w, 0.95);
        assert!(w.no_metrics);
        assert_eq!(w.effective.cpu_millis, 250);
        assert_eq!(w.effective.memory_bytes, 256 * 1024 * 1024);
    }

    #[test]
    fn test_floors_apply_after_no_metrics_rule() {
        let mut w = workload(0, 0, 0.0, 0.0);
        apply_effective_sizing(&mut w, 0.95);
        assert!(w.no_metrics);
        assert_eq!(w.effective.cpu_millis, MIN_EFFECTIVE_CPU_MILLIS);
        assert_eq!(w.effective.memory_bytes, MIN_EFFECTIVE_MEMORY_BYTES);
    }

    #[test]
    fn test_floors_apply_to_tiny_usage() {
        let mut w = workload(1, 1024, 0.002, 2048.0);
        apply_effective_sizing(&mut w, 0.95);
        assert_eq!(w.effective.cpu_millis, MIN_EFFECTIVE_CPU_MILLIS);
        assert_eq!(w.effective.memory_bytes, MIN_EFFECTIVE_MEMORY_BYTES);
    }

    #[test]
    fn test_daemonset_routing() {
        let mut ds = workload(100, 128 * 1024 * 1024, 0.1, 64.0 * 1024.0 * 1024.0);
        ds.owner_kind = "DaemonSet".to_string();
        let app = workload(100, 128 * 1024 * 1024, 0.1, 64.0 * 1024.0 * 1024.0);

        let (workloads, daemon_sets) = size_and_partition(vec![ds, app], 0.95);
        assert_eq!(workloads.len(), 1);
        assert_eq!(daemon_sets.len(), 1);
        assert!(daemon_sets[0].is_daemonset);
    }
}
