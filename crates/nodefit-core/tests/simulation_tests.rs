//! End-to-end packing and ranking tests

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use nodefit_core::model::{
    Architecture, CapacityType, ClusterState, NodeTemplate, PackingStrategy, PercentileValues,
    ResourceQuantity, Scenario, ScoringWeights, TimeWindow, WorkloadProfile,
};
use nodefit_core::simulation::{
    build_simulation_result, BestFitDecreasing, BinPacker, CancelFlag, Engine, PackInput, Scorer,
};

const GIB: i64 = 1024 * 1024 * 1024;
const MIB: i64 = 1024 * 1024;

fn template(instance_type: &str, cpu_millis: i64, mem_bytes: i64, max_pods: u32, price: f64) -> NodeTemplate {
    NodeTemplate {
        instance_type: instance_type.to_string(),
        instance_family: instance_type.split('.').next().unwrap_or("").to_string(),
        generation: 5,
        size: instance_type.split('.').nth(1).unwrap_or("").to_string(),
        architecture: Architecture::Amd64,
        vcpus: (cpu_millis / 1000) as u32,
        memory_mib: mem_bytes / MIB,
        allocatable_cpu_millis: cpu_millis,
        allocatable_memory_bytes: mem_bytes,
        max_pods,
        on_demand_price_per_hour: price,
        spot_price_per_hour: 0.0,
        capacity_type: CapacityType::OnDemand,
        current_generation: true,
        region: "us-east-1".to_string(),
    }
}

fn workload(name: &str, cpu_millis: i64, mem_bytes: i64) -> WorkloadProfile {
    WorkloadProfile {
        namespace: "default".to_string(),
        name: name.to_string(),
        requested: ResourceQuantity::new(cpu_millis, mem_bytes),
        cpu_usage: PercentileValues::default(),
        memory_usage: PercentileValues::default(),
        effective: ResourceQuantity::new(cpu_millis, mem_bytes),
        ..Default::default()
    }
}

fn scenario(name: &str, templates: Vec<NodeTemplate>, spot_ratio: f64, min_nodes: u32) -> Scenario {
    Scenario {
        name: name.to_string(),
        templates,
        strategy: PackingStrategy::Homogeneous,
        spot_ratio,
        min_nodes,
    }
}

fn pack(input: PackInput) -> nodefit_core::simulation::PackResult {
    BestFitDecreasing
        .pack(input, &CancelFlag::new())
        .expect("pack failed")
}

/// A workload mix with varied shapes for invariant checks.
fn varied_workloads() -> Vec<WorkloadProfile> {
    (0i64..60)
        .map(|i| {
            workload(
                &format!("w-{i}"),
                50 + (i % 11) * 310,
                (128 + (i % 7) * 900) * MIB,
            )
        })
        .collect()
}

fn varied_input() -> PackInput {
    PackInput {
        workloads: varied_workloads(),
        daemon_sets: vec![workload("node-agent", 150, 256 * MIB)],
        templates: vec![
            template("m5.large", 2000, 8 * GIB, 29, 0.096),
            template("m5.xlarge", 4000, 16 * GIB, 58, 0.192),
            template("m5.2xlarge", 8000, 32 * GIB, 58, 0.384),
        ],
        system_reserved: ResourceQuantity::new(100, 256 * MIB),
        max_nodes: 0,
        min_nodes: 3,
        spot_ratio: 0.3,
    }
}

#[test]
fn every_workload_is_placed_or_unschedulable_exactly_once() {
    let input = varied_input();
    let expected = input.workloads.len();
    let result = pack(input);

    let mut names: Vec<String> = result
        .nodes
        .iter()
        .flat_map(|n| n.workloads.iter().map(|w| w.name.clone()))
        .chain(result.unschedulable.iter().map(|w| w.name.clone()))
        .collect();
    assert_eq!(names.len(), expected);
    names.sort();
    names.dedup();
    assert_eq!(names.len(), expected, "a workload appeared twice");
}

#[test]
fn per_node_capacity_is_never_exceeded() {
    let input = varied_input();
    let overhead = ResourceQuantity::new(150, 256 * MIB) + input.system_reserved;
    let result = pack(input);

    for node in &result.nodes {
        let placed: ResourceQuantity = node
            .workloads
            .iter()
            .fold(ResourceQuantity::default(), |acc, w| acc + w.effective);
        assert_eq!(placed.cpu_millis, node.used_cpu_millis);
        assert_eq!(placed.memory_bytes, node.used_memory_bytes);

        let avail = node.template.allocatable() - overhead;
        assert!(placed.fits_in(avail), "node overcommitted: {placed:?} > {avail:?}");
        assert!(node.pod_count <= node.template.max_pods);
        assert_eq!(node.pod_count as usize, node.workloads.len());
    }
}

#[test]
fn min_and_max_node_bounds_hold() {
    let mut input = varied_input();
    input.max_nodes = 10;
    let result = pack(input);
    assert!(result.nodes.len() <= 10);
    assert!(result.nodes.len() >= 3);
}

#[test]
fn identical_inputs_serialize_identically() {
    let input = varied_input();
    let sc = scenario(
        "homogeneous-m5.large",
        input.templates.clone(),
        input.spot_ratio,
        input.min_nodes,
    );

    let r1 = build_simulation_result(pack(input.clone()), sc.clone(), 0, None);
    let r2 = build_simulation_result(pack(input), sc, 0, None);

    let j1 = serde_json::to_string(&r1).unwrap();
    let j2 = serde_json::to_string(&r2).unwrap();
    assert_eq!(j1, j2);
}

// Literal end-to-end scenarios.

#[test]
fn single_pod_lands_on_a_single_node() {
    let result = pack(PackInput {
        workloads: vec![workload("app", 1000, 2 * GIB)],
        templates: vec![template("m5.large", 2000, 8 * GIB, 29, 0.096)],
        ..Default::default()
    });
    assert_eq!(result.nodes.len(), 1);
    assert_eq!(result.unschedulable.len(), 0);
    assert_eq!(result.nodes[0].pod_count, 1);
}

#[test]
fn cpu_bound_pair_needs_two_nodes() {
    let result = pack(PackInput {
        workloads: vec![
            workload("cpu-1", 3000, GIB),
            workload("cpu-2", 3000, GIB),
        ],
        templates: vec![template("m5.xlarge", 4000, 16 * GIB, 58, 0.192)],
        ..Default::default()
    });
    assert_eq!(result.nodes.len(), 2);
    assert!(result.nodes.iter().all(|n| n.pod_count == 1));
}

#[test]
fn memory_bound_pair_needs_two_nodes() {
    let result = pack(PackInput {
        workloads: vec![
            workload("mem-1", 100, 12 * GIB),
            workload("mem-2", 100, 12 * GIB),
        ],
        templates: vec![template("m5.xlarge", 4000, 16 * GIB, 58, 0.192)],
        ..Default::default()
    });
    assert_eq!(result.nodes.len(), 2);
}

#[test]
fn pod_density_cap_drives_node_count() {
    let workloads = (0..50)
        .map(|i| workload(&format!("tiny-{i}"), 10, MIB))
        .collect();
    let result = pack(PackInput {
        workloads,
        templates: vec![template("m5.xlarge", 4000, 16 * GIB, 20, 0.192)],
        ..Default::default()
    });
    assert_eq!(result.nodes.len(), 3);
    assert_eq!(result.unschedulable.len(), 0);
}

#[test]
fn daemonset_overhead_forces_the_larger_type() {
    let result = pack(PackInput {
        workloads: vec![workload("app", 1500, 6 * GIB)],
        daemon_sets: vec![workload("log-agent", 500, 3 * GIB)],
        templates: vec![
            template("m5.large", 2000, 8 * GIB, 29, 0.096),
            template("m5.xlarge", 4000, 16 * GIB, 58, 0.192),
        ],
        ..Default::default()
    });
    assert_eq!(result.nodes.len(), 1);
    assert_eq!(result.nodes[0].template.instance_type, "m5.xlarge");
}

#[test]
fn ha_floor_pads_with_empty_nodes() {
    let result = pack(PackInput {
        workloads: vec![workload("app", 500, GIB)],
        templates: vec![template("m5.large", 2000, 8 * GIB, 29, 0.096)],
        min_nodes: 3,
        ..Default::default()
    });
    assert_eq!(result.nodes.len(), 3);
    assert_eq!(result.nodes[0].pod_count, 1);
    assert_eq!(result.nodes[1].pod_count, 0);
    assert_eq!(result.nodes[2].pod_count, 0);
    assert_eq!(result.nodes[1].cpu_utilization, 0.0);
    assert_eq!(result.nodes[1].mem_utilization, 0.0);
}

#[test]
fn spot_ratio_tags_least_loaded_nodes() {
    let workloads = (0..10)
        .map(|i| workload(&format!("app-{i}"), 1500, GIB))
        .collect();
    let result = pack(PackInput {
        workloads,
        templates: vec![template("m5.large", 2000, 8 * GIB, 29, 0.096)],
        spot_ratio: 0.7,
        ..Default::default()
    });
    assert_eq!(result.nodes.len(), 10);

    let spot: Vec<bool> = result
        .nodes
        .iter()
        .map(|n| n.template.capacity_type == CapacityType::Spot)
        .collect();
    assert_eq!(spot.iter().filter(|&&s| s).count(), 7);
    // Equal loads: ties break by insertion order, so the first 7 are spot
    assert!(spot[..7].iter().all(|&s| s));
    assert!(spot[7..].iter().all(|&s| !s));
}

// Engine-level ranking properties.

fn state_for(workloads: Vec<WorkloadProfile>) -> Arc<ClusterState> {
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    Arc::new(ClusterState {
        collected_at: start,
        metrics_window: TimeWindow {
            start,
            end: start + chrono::Duration::days(7),
            step_secs: 300,
        },
        workloads,
        daemon_sets: Vec::new(),
        system_reserved: ResourceQuantity::default(),
        aggregate_metrics: None,
        cluster_name: "test".to_string(),
        region: "us-east-1".to_string(),
    })
}

fn weight(cost: f64, utilization: f64, fragmentation: f64, resilience: f64) -> ScoringWeights {
    ScoringWeights {
        cost,
        utilization,
        fragmentation,
        resilience,
    }
}

#[tokio::test]
async fn cost_only_weights_pick_the_cheapest_fleet() {
    let scenarios = vec![
        scenario("homogeneous-m5.2xlarge", vec![template("m5.2xlarge", 8000, 32 * GIB, 58, 0.384)], 0.0, 0),
        scenario("homogeneous-m5.large", vec![template("m5.large", 2000, 8 * GIB, 29, 0.096)], 0.0, 0),
        scenario("homogeneous-m5.xlarge", vec![template("m5.xlarge", 4000, 16 * GIB, 58, 0.192)], 0.0, 0),
    ];
    let engine = Engine::new(
        Arc::new(BestFitDecreasing),
        Scorer::new(weight(1.0, 0.0, 0.0, 0.0)),
    );
    let recs = engine
        .run_all(
            scenarios,
            state_for(vec![workload("app", 1000, 2 * GIB)]),
            CancelFlag::new(),
        )
        .await
        .unwrap();

    let min_cost = recs
        .iter()
        .map(|r| r.monthly_cost)
        .fold(f64::INFINITY, f64::min);
    assert_eq!(recs[0].monthly_cost, min_cost);
}

#[tokio::test]
async fn utilization_only_weights_pick_the_fullest_fleet() {
    let scenarios = vec![
        scenario("homogeneous-m5.2xlarge", vec![template("m5.2xlarge", 8000, 32 * GIB, 58, 0.384)], 0.0, 0),
        scenario("homogeneous-m5.large", vec![template("m5.large", 2000, 8 * GIB, 29, 0.096)], 0.0, 0),
    ];
    let engine = Engine::new(
        Arc::new(BestFitDecreasing),
        Scorer::new(weight(0.0, 1.0, 0.0, 0.0)),
    );
    let recs = engine
        .run_all(
            scenarios,
            state_for(vec![workload("app", 1800, 7 * GIB)]),
            CancelFlag::new(),
        )
        .await
        .unwrap();

    let best_util = recs
        .iter()
        .map(|r| (r.result.avg_cpu_utilization + r.result.avg_mem_utilization) / 2.0)
        .fold(f64::NEG_INFINITY, f64::max);
    let top_util =
        (recs[0].result.avg_cpu_utilization + recs[0].result.avg_mem_utilization) / 2.0;
    assert_eq!(top_util, best_util);
}

#[tokio::test]
async fn component_scores_stay_in_bounds_end_to_end() {
    let scenarios = vec![
        scenario("homogeneous-m5.large", vec![template("m5.large", 2000, 8 * GIB, 29, 0.096)], 0.8, 3),
        scenario("homogeneous-m5.xlarge", vec![template("m5.xlarge", 4000, 16 * GIB, 58, 0.192)], 0.8, 3),
    ];
    let engine = Engine::new(
        Arc::new(BestFitDecreasing),
        Scorer::new(ScoringWeights::default()).with_daemonset_count(3),
    );
    let recs = engine
        .run_all(scenarios, state_for(varied_workloads()), CancelFlag::new())
        .await
        .unwrap();

    for rec in &recs {
        for score in [
            rec.cost_score,
            rec.utilization_score,
            rec.fragmentation_score,
            rec.resilience_score,
            rec.overall_score,
        ] {
            assert!((0.0..=100.0).contains(&score), "score {score} out of bounds");
        }
        assert!(!rec.rationale.is_empty());
    }
}
