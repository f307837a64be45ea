//! Fragmentation analysis

use crate::model::{FragmentationReport, NodeAllocation};

/// One dimension counts as nearly full above this utilisation.
const SATURATION_THRESHOLD: f64 = 0.85;

/// One dimension counts as underused below this utilisation.
const UNDERUSE_THRESHOLD: f64 = 0.50;

/// Computes fragmentation metrics over the non-empty nodes of a packing.
///
/// Stranded capacity is idle capacity on one dimension of a node whose
/// other dimension is near saturation. The balance score is the mean of
/// `1 − |cpu_util − mem_util|`; with no non-empty nodes it is 1.0 by
/// convention.
pub fn analyze_fragmentation(nodes: &[NodeAllocation]) -> FragmentationReport {
    let occupied: Vec<&NodeAllocation> = nodes.iter().filter(|n| n.pod_count > 0).collect();
    if occupied.is_empty() {
        return FragmentationReport {
            resource_balance_score: 1.0,
            ..Default::default()
        };
    }

    let mut report = FragmentationReport::default();
    let mut underutilized = 0usize;

    for node in &occupied {
        let alloc = node.template.allocatable();
        if alloc.cpu_millis == 0 || alloc.memory_bytes == 0 {
            continue;
        }

        let cpu_util = node.cpu_utilization;
        let mem_util = node.mem_utilization;

        if cpu_util > SATURATION_THRESHOLD && mem_util < UNDERUSE_THRESHOLD {
            report.stranded_memory_bytes += alloc.memory_bytes - node.used_memory_bytes;
        }
        if mem_util > SATURATION_THRESHOLD && cpu_util < UNDERUSE_THRESHOLD {
            report.stranded_cpu_millis += alloc.cpu_millis - node.used_cpu_millis;
        }

        if cpu_util < UNDERUSE_THRESHOLD || mem_util < UNDERUSE_THRESHOLD {
            underutilized += 1;
        }

        report.resource_balance_score += 1.0 - (cpu_util - mem_util).abs();
    }

    let count = occupied.len() as f64;
    report.underutilized_node_fraction = underutilized as f64 / count;
    report.resource_balance_score /= count;

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Architecture, CapacityType, NodeTemplate};

    const GIB: i64 = 1024 * 1024 * 1024;

    fn node_at(cpu_util: f64, mem_util: f64) -> NodeAllocation {
        let alloc_cpu = 4000i64;
        let alloc_mem = 16 * GIB;
        NodeAllocation {
            template: NodeTemplate {
                instance_type: "m5.xlarge".to_string(),
                instance_family: "m5".to_string(),
                generation: 5,
                size: "xlarge".to_string(),
                architecture: Architecture::Amd64,
                vcpus: 4,
                memory_mib: 16 * 1024,
                allocatable_cpu_millis: alloc_cpu,
                allocatable_memory_bytes: alloc_mem,
                max_pods: 58,
                on_demand_price_per_hour: 0.192,
                spot_price_per_hour: 0.0,
                capacity_type: CapacityType::OnDemand,
                current_generation: true,
                region: "us-east-1".to_string(),
            },
            workloads: Vec::new(),
            used_cpu_millis: (alloc_cpu as f64 * cpu_util) as i64,
            used_memory_bytes: (alloc_mem as f64 * mem_util) as i64,
            pod_count: 1,
            cpu_utilization: cpu_util,
            mem_utilization: mem_util,
        }
    }

    #[test]
    fn test_balanced_nodes_score_one() {
        let nodes = vec![node_at(0.7, 0.7), node_at(0.6, 0.6)];
        let report = analyze_fragmentation(&nodes);
        assert!((report.resource_balance_score - 1.0).abs() < 1e-9);
        assert_eq!(report.stranded_cpu_millis, 0);
        assert_eq!(report.stranded_memory_bytes, 0);
    }

    #[test]
    fn test_cpu_saturated_node_strands_memory() {
        let nodes = vec![node_at(0.95, 0.20)];
        let report = analyze_fragmentation(&nodes);
        assert!(report.stranded_memory_bytes > 0);
        assert_eq!(report.stranded_cpu_millis, 0);
        assert_eq!(report.underutilized_node_fraction, 1.0);
    }

    #[test]
    fn test_memory_saturated_node_strands_cpu() {
        let nodes = vec![node_at(0.20, 0.95)];
        let report = analyze_fragmentation(&nodes);
        assert!(report.stranded_cpu_millis > 0);
        assert_eq!(report.stranded_memory_bytes, 0);
    }

    #[test]
    fn test_empty_fleet_is_perfectly_balanced() {
        let report = analyze_fragmentation(&[]);
        assert_eq!(report.resource_balance_score, 1.0);
        assert_eq!(report.underutilized_node_fraction, 0.0);
    }

    #[test]
    fn test_padding_nodes_are_ignored() {
        let mut empty = node_at(0.0, 0.0);
        empty.pod_count = 0;
        let nodes = vec![node_at(0.8, 0.8), empty];
        let report = analyze_fragmentation(&nodes);
        assert!((report.resource_balance_score - 1.0).abs() < 1e-9);
        assert_eq!(report.underutilized_node_fraction, 0.0);
    }

    #[test]
    fn test_underutilized_fraction() {
        let nodes = vec![node_at(0.3, 0.6), node_at(0.8, 0.8)];
        let report = analyze_fragmentation(&nodes);
        assert!((report.underutilized_node_fraction - 0.5).abs() < 1e-9);
    }
}
