//! Scenario fan-out across a bounded worker pool

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Semaphore;
use tracing::{debug, warn};

use super::{BinPacker, CancelFlag, PackInput, PackResult, Scorer};
use crate::error::SimulationError;
use crate::model::{
    AggregateMetrics, ClusterState, Recommendation, ScalingEfficiency, Scenario, SimulationResult,
};

/// Drives bin-packing simulations across scenarios in parallel and ranks
/// the outcomes.
///
/// Each worker owns one (scenario, cluster state) run; the state is shared
/// read-only and results land in disjoint slots, so no synchronisation
/// beyond the join is needed. Cancellation propagates: in-flight packers
/// observe the flag at their next placement iteration and the engine
/// returns `Cancelled` without a partial ranking. Non-cancellation
/// failures drop only the affected scenario.
pub struct Engine {
    packer: Arc<dyn BinPacker>,
    scorer: Scorer,
    parallelism: usize,
    max_nodes: u32,
}

impl Engine {
    pub fn new(packer: Arc<dyn BinPacker>, scorer: Scorer) -> Self {
        let parallelism = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);
        Self {
            packer,
            scorer,
            parallelism,
            max_nodes: 0,
        }
    }

    /// Caps the worker pool (defaults to the hardware parallelism).
    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism.max(1);
        self
    }

    /// Per-scenario node cap (0 = unlimited).
    pub fn with_max_nodes(mut self, max_nodes: u32) -> Self {
        self.max_nodes = max_nodes;
        self
    }

    /// Runs every scenario and returns ranked recommendations.
    ///
    /// Fails with `NoScenarios` on an empty list, `Cancelled` when the
    /// flag trips, and `AllScenariosFailed` when no scenario succeeded;
    /// individual failures are logged and skipped.
    pub async fn run_all(
        &self,
        scenarios: Vec<Scenario>,
        state: Arc<ClusterState>,
        cancel: CancelFlag,
    ) -> Result<Vec<Recommendation>, SimulationError> {
        if scenarios.is_empty() {
            return Err(SimulationError::NoScenarios);
        }

        debug!(
            scenarios = scenarios.len(),
            parallelism = self.parallelism,
            "starting simulation run"
        );

        let semaphore = Arc::new(Semaphore::new(self.parallelism));
        let mut handles = Vec::with_capacity(scenarios.len());

        for scenario in scenarios {
            let semaphore = Arc::clone(&semaphore);
            let state = Arc::clone(&state);
            let packer = Arc::clone(&self.packer);
            let cancel = cancel.clone();
            let max_nodes = self.max_nodes;

            handles.push(tokio::spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|_| SimulationError::Cancelled)?;
                let name = scenario.name.clone();
                tokio::task::spawn_blocking(move || {
                    run_scenario(packer.as_ref(), scenario, &state, max_nodes, &cancel)
                })
                .await
                .map_err(|err| SimulationError::ScenarioFailed {
                    name,
                    reason: err.to_string(),
                })?
            }));
        }

        // Join in spawn order so the successful list keeps the generator's
        // deterministic scenario order regardless of completion order.
        let mut successful = Vec::new();
        let mut cancelled = false;
        for handle in handles {
            match handle.await {
                Ok(Ok(result)) => successful.push(result),
                Ok(Err(SimulationError::Cancelled)) => cancelled = true,
                Ok(Err(err)) => warn!(error = %err, "scenario failed, dropping"),
                Err(err) => warn!(error = %err, "scenario worker aborted, dropping"),
            }
        }

        if cancelled || cancel.is_cancelled() {
            return Err(SimulationError::Cancelled);
        }
        if successful.is_empty() {
            return Err(SimulationError::AllScenariosFailed);
        }

        Ok(self.scorer.rank_results(successful, None))
    }
}

/// Packs one scenario and derives its aggregate metrics.
fn run_scenario(
    packer: &dyn BinPacker,
    scenario: Scenario,
    state: &ClusterState,
    max_nodes: u32,
    cancel: &CancelFlag,
) -> Result<SimulationResult, SimulationError> {
    let start = Instant::now();

    let input = PackInput {
        workloads: state.workloads.clone(),
        daemon_sets: state.daemon_sets.clone(),
        templates: scenario.templates.clone(),
        system_reserved: state.system_reserved,
        max_nodes,
        min_nodes: scenario.min_nodes,
        spot_ratio: scenario.spot_ratio,
    };

    let pack_result = packer.pack(input, cancel).map_err(|err| match err {
        SimulationError::Cancelled => SimulationError::Cancelled,
        other => SimulationError::ScenarioFailed {
            name: scenario.name.clone(),
            reason: other.to_string(),
        },
    })?;

    let duration_ms = start.elapsed().as_millis() as u64;
    Ok(build_simulation_result(
        pack_result,
        scenario,
        duration_ms,
        state.aggregate_metrics,
    ))
}

/// Derives fleet totals, averages, fragmentation, and scaling efficiency
/// from a raw packing.
pub fn build_simulation_result(
    pack_result: PackResult,
    scenario: Scenario,
    duration_ms: u64,
    aggregate: Option<AggregateMetrics>,
) -> SimulationResult {
    let nodes = pack_result.nodes;
    let total_nodes = nodes.len();

    let mut result = SimulationResult {
        scenario,
        total_nodes,
        total_monthly_cost: 0.0,
        total_cpu_millis: 0,
        total_memory_bytes: 0,
        used_cpu_millis: 0,
        used_memory_bytes: 0,
        avg_cpu_utilization: 0.0,
        avg_mem_utilization: 0.0,
        fragmentation: super::analyze_fragmentation(&nodes),
        scaling_efficiency: None,
        unschedulable: pack_result.unschedulable,
        duration_ms,
        nodes,
    };

    if total_nodes == 0 {
        return result;
    }

    let mut total_cpu_util = 0.0;
    let mut total_mem_util = 0.0;
    for node in &result.nodes {
        result.total_cpu_millis += node.template.allocatable_cpu_millis;
        result.total_memory_bytes += node.template.allocatable_memory_bytes;
        result.used_cpu_millis += node.used_cpu_millis;
        result.used_memory_bytes += node.used_memory_bytes;
        result.total_monthly_cost += node.template.monthly_cost();
        total_cpu_util += node.cpu_utilization;
        total_mem_util += node.mem_utilization;
    }
    result.avg_cpu_utilization = total_cpu_util / total_nodes as f64;
    result.avg_mem_utilization = total_mem_util / total_nodes as f64;

    // Estimate trough utilisation from the observed scaling range: at the
    // off-peak the fleet shrinks by the same ratio the real cluster did.
    if let Some(agg) = aggregate.filter(|a| a.max_node_count > 0) {
        let ratio = agg.scaling_ratio();
        let mut trough_nodes = (total_nodes as f64 * ratio).ceil() as u32;
        if result.scenario.min_nodes > 0 && trough_nodes < result.scenario.min_nodes {
            trough_nodes = result.scenario.min_nodes;
        }

        let alloc_per_node = result.nodes[0].template.allocatable_cpu_millis;
        let est_trough_cpu_util = if trough_nodes > 0 && alloc_per_node > 0 {
            let util =
                (agg.p95_cpu_cores * ratio * 1000.0) / (trough_nodes as i64 * alloc_per_node) as f64;
            util.clamp(0.0, 1.0)
        } else {
            0.0
        };

        result.scaling_efficiency = Some(ScalingEfficiency {
            scaling_ratio: ratio,
            observed_min_nodes: agg.min_node_count,
            observed_max_nodes: agg.max_node_count,
            est_trough_nodes: trough_nodes,
            est_trough_cpu_util,
        });
    }

    result
}
