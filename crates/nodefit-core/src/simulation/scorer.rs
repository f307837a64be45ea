//! Scoring and ranking of simulation results

use crate::model::{Recommendation, ScoringWeights, SimulationResult};

/// Average CPU utilisation above this leaves little burst headroom.
const HIGH_CPU_UTIL: f64 = 0.85;

/// Average memory utilisation above this risks OOM under spikes.
const CRITICAL_MEM_UTIL: f64 = 0.90;

/// Node-fraction threshold for the low-utilisation warning.
const LOW_UTIL_FRACTION: f64 = 0.50;

/// Spot ratio above this carries meaningful interruption risk.
const HIGH_SPOT_RATIO: f64 = 0.50;

/// Trough CPU utilisation below this wastes off-peak capacity.
const LOW_TROUGH_UTIL: f64 = 0.30;

/// Computes component and composite scores for simulation results and
/// ranks them.
#[derive(Debug, Clone, Default)]
pub struct Scorer {
    pub weights: ScoringWeights,
    /// Number of DaemonSets in the cluster; each one runs on every node,
    /// so large fleets pay a per-node tax.
    pub daemonset_count: usize,
}

impl Scorer {
    pub fn new(weights: ScoringWeights) -> Self {
        Self {
            weights,
            daemonset_count: 0,
        }
    }

    pub fn with_daemonset_count(mut self, count: usize) -> Self {
        self.daemonset_count = count;
        self
    }

    /// Scores every result and returns them ranked best-first. Cost is
    /// normalised against the min/max across the set; the sort is stable,
    /// so equal composite scores keep their input order. When `baseline`
    /// is given, each recommendation carries its cost delta against it.
    pub fn rank_results(
        &self,
        results: Vec<SimulationResult>,
        baseline: Option<&SimulationResult>,
    ) -> Vec<Recommendation> {
        if results.is_empty() {
            return Vec::new();
        }

        let min_cost = results
            .iter()
            .map(|r| r.total_monthly_cost)
            .fold(f64::INFINITY, f64::min);
        let max_cost = results
            .iter()
            .map(|r| r.total_monthly_cost)
            .fold(f64::NEG_INFINITY, f64::max);

        let mut recs: Vec<Recommendation> = results
            .into_iter()
            .map(|r| self.score(r, baseline, min_cost, max_cost))
            .collect();

        recs.sort_by(|a, b| {
            b.overall_score
                .partial_cmp(&a.overall_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        for (i, rec) in recs.iter_mut().enumerate() {
            rec.rank = i + 1;
        }

        recs
    }

    fn score(
        &self,
        result: SimulationResult,
        baseline: Option<&SimulationResult>,
        min_cost: f64,
        max_cost: f64,
    ) -> Recommendation {
        // Cost: 100 = cheapest in the set, 0 = most expensive; 100 when
        // every result ties.
        let cost_range = max_cost - min_cost;
        let cost_score = if cost_range > 0.0 {
            (1.0 - (result.total_monthly_cost - min_cost) / cost_range) * 100.0
        } else {
            100.0
        };

        let (cost_vs_baseline_pct, annual_savings) = match baseline {
            Some(b) if b.total_monthly_cost > 0.0 => (
                (result.total_monthly_cost - b.total_monthly_cost) / b.total_monthly_cost * 100.0,
                (b.total_monthly_cost - result.total_monthly_cost) * 12.0,
            ),
            _ => (0.0, 0.0),
        };

        let utilization_score =
            (result.avg_cpu_utilization + result.avg_mem_utilization) / 2.0 * 100.0;

        let fragmentation_score = result.fragmentation.resource_balance_score
            * 100.0
            * (1.0 - result.fragmentation.underutilized_node_fraction);

        let resilience_score = self.resilience_score(&result);

        let overall_score = self.weights.cost * cost_score
            + self.weights.utilization * utilization_score
            + self.weights.fragmentation * fragmentation_score
            + self.weights.resilience * resilience_score;

        let rationale = build_rationale(&result, cost_vs_baseline_pct);
        let warnings = build_warnings(&result);
        let monthly_cost = result.total_monthly_cost;

        Recommendation {
            rank: 0,
            result,
            monthly_cost,
            cost_vs_baseline_pct,
            annual_savings,
            overall_score,
            cost_score,
            utilization_score,
            fragmentation_score,
            resilience_score,
            rationale,
            warnings,
        }
    }

    /// Base score by node count, then penalties in order: DaemonSet
    /// overhead, unschedulable pods, low trough utilisation. Clamped at 0.
    ///
    /// Very small fleets are single points of failure; very large ones pay
    /// management overhead and a per-node DaemonSet tax.
    fn resilience_score(&self, result: &SimulationResult) -> f64 {
        let mut score: f64 = match result.total_nodes {
            0..=1 => 20.0,
            2 => 50.0,
            3..=5 => 90.0,
            6..=15 => 100.0,
            16..=30 => 85.0,
            31..=50 => 70.0,
            51..=100 => 55.0,
            _ => 40.0,
        };

        if self.daemonset_count > 0 && result.total_nodes > 5 {
            let overhead_ratio =
                self.daemonset_count as f64 * result.total_nodes as f64 / 100.0;
            score = (score - (overhead_ratio * 5.0).min(20.0)).max(0.0);
        }

        if !result.unschedulable.is_empty() {
            let penalty = (result.unschedulable.len() as f64 * 10.0).min(50.0);
            score = (score - penalty).max(0.0);
        }

        if let Some(se) = &result.scaling_efficiency {
            if se.est_trough_cpu_util < LOW_TROUGH_UTIL {
                let penalty = (LOW_TROUGH_UTIL - se.est_trough_cpu_util) / LOW_TROUGH_UTIL * 25.0;
                score = (score - penalty).max(0.0);
            }
        }

        score
    }
}

fn build_rationale(result: &SimulationResult, cost_vs_baseline_pct: f64) -> String {
    let mut rationale = format!(
        "{}: {} nodes, ${:.0}/mo, CPU {:.0}%, Mem {:.0}%",
        result.scenario.label(),
        result.total_nodes,
        result.total_monthly_cost,
        result.avg_cpu_utilization * 100.0,
        result.avg_mem_utilization * 100.0,
    );
    if cost_vs_baseline_pct < 0.0 {
        rationale.push_str(&format!(" ({:.1}% savings)", -cost_vs_baseline_pct));
    }
    rationale
}

fn build_warnings(result: &SimulationResult) -> Vec<String> {
    let mut warnings = Vec::new();

    if !result.unschedulable.is_empty() {
        warnings.push(format!(
            "{} pods could not be scheduled",
            result.unschedulable.len()
        ));
    }

    if result.avg_cpu_utilization > HIGH_CPU_UTIL {
        warnings.push("High CPU utilization leaves little headroom for bursts".to_string());
    }
    if result.avg_mem_utilization > CRITICAL_MEM_UTIL {
        warnings.push("High memory utilization risks OOM under load spikes".to_string());
    }

    if result.fragmentation.underutilized_node_fraction > LOW_UTIL_FRACTION {
        warnings.push(format!(
            "{:.0}% of nodes are underutilized (<{:.0}% on one dimension)",
            result.fragmentation.underutilized_node_fraction * 100.0,
            LOW_UTIL_FRACTION * 100.0,
        ));
    }

    if let Some(se) = &result.scaling_efficiency {
        if se.est_trough_cpu_util < LOW_TROUGH_UTIL {
            warnings.push(format!(
                "Low trough utilization ({:.0}% CPU) when cluster scales {}→{} nodes",
                se.est_trough_cpu_util * 100.0,
                se.observed_min_nodes,
                se.observed_max_nodes,
            ));
        }
    }

    if result.scenario.spot_ratio > HIGH_SPOT_RATIO {
        warnings.push("High spot ratio increases interruption risk".to_string());
    }

    warnings
}
