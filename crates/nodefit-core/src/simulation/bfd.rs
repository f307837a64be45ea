//! Best-fit-decreasing two-dimensional bin-packing

use tracing::debug;

use super::{BinPacker, CancelFlag, PackInput, PackResult};
use crate::error::SimulationError;
use crate::model::{
    CapacityType, NodeAllocation, NodeTemplate, ResourceQuantity, WorkloadProfile,
};

/// Multi-dimensional best-fit-decreasing packer.
///
/// Workloads are sorted once by dominance (largest fraction of the biggest
/// template, CPU or memory) and each is placed on the open node that would
/// be left tightest, opening the cheapest template that fits when none is
/// open. All orderings are stable, so identical inputs produce identical
/// output.
#[derive(Debug, Default)]
pub struct BestFitDecreasing;

/// Allocation state of one node while packing.
struct NodeState {
    template: NodeTemplate,
    workloads: Vec<WorkloadProfile>,
    remaining: ResourceQuantity,
    used: ResourceQuantity,
    pod_count: u32,
}

impl NodeState {
    fn open(template: NodeTemplate, overhead: ResourceQuantity) -> Self {
        let remaining = template.allocatable() - overhead;
        Self {
            template,
            workloads: Vec::new(),
            remaining,
            used: ResourceQuantity::default(),
            pod_count: 0,
        }
    }

    fn can_fit(&self, w: &WorkloadProfile) -> bool {
        w.effective.fits_in(self.remaining) && self.pod_count < self.template.max_pods
    }

    fn place(&mut self, w: WorkloadProfile) {
        self.remaining = self.remaining - w.effective;
        self.used = self.used + w.effective;
        self.pod_count += 1;
        self.workloads.push(w);
    }

    /// Euclidean norm of the remaining capacity fractions after a
    /// hypothetical placement. Lower = tighter fit = preferred.
    fn remaining_after(&self, w: &WorkloadProfile) -> f64 {
        let alloc = self.template.allocatable();
        if alloc.cpu_millis == 0 || alloc.memory_bytes == 0 {
            return f64::MAX;
        }
        let cpu_after =
            (self.remaining.cpu_millis - w.effective.cpu_millis) as f64 / alloc.cpu_millis as f64;
        let mem_after = (self.remaining.memory_bytes - w.effective.memory_bytes) as f64
            / alloc.memory_bytes as f64;
        (cpu_after * cpu_after + mem_after * mem_after).sqrt()
    }
}

impl BinPacker for BestFitDecreasing {
    fn pack(&self, input: PackInput, cancel: &CancelFlag) -> Result<PackResult, SimulationError> {
        if input.templates.is_empty() {
            return Ok(PackResult {
                nodes: Vec::new(),
                unschedulable: input.workloads,
            });
        }

        let overhead = daemonset_overhead(&input.daemon_sets) + input.system_reserved;

        let mut workloads = input.workloads;
        sort_by_dominance(&mut workloads, &input.templates);

        let mut nodes: Vec<NodeState> = Vec::new();
        let mut unschedulable: Vec<WorkloadProfile> = Vec::new();

        for w in workloads {
            if cancel.is_cancelled() {
                return Err(SimulationError::Cancelled);
            }

            // Best-fitting open node, ties to the first encountered.
            let mut best: Option<(usize, f64)> = None;
            for (idx, node) in nodes.iter().enumerate() {
                if !node.can_fit(&w) {
                    continue;
                }
                let score = node.remaining_after(&w);
                if best.map_or(true, |(_, s)| score < s) {
                    best = Some((idx, score));
                }
            }

            if let Some((idx, _)) = best {
                nodes[idx].place(w);
                continue;
            }

            // No open node fits: open a new one unless capped.
            if input.max_nodes > 0 && nodes.len() >= input.max_nodes as usize {
                unschedulable.push(w);
                continue;
            }

            match select_cheapest_fitting(&input.templates, &w, overhead) {
                Some(template) => {
                    let mut node = NodeState::open(template.clone(), overhead);
                    node.place(w);
                    nodes.push(node);
                }
                None => unschedulable.push(w),
            }
        }

        // High-availability floor: pad with empty nodes of the cheapest type.
        if input.min_nodes > 0 {
            if let Some(template) = cheapest_template(&input.templates) {
                while nodes.len() < input.min_nodes as usize {
                    nodes.push(NodeState::open(template.clone(), overhead));
                }
            }
        }

        if input.spot_ratio > 0.0 {
            apply_spot_ratio(&mut nodes, input.spot_ratio);
        }

        debug!(
            nodes = nodes.len(),
            unschedulable = unschedulable.len(),
            "packing complete"
        );

        let allocations = nodes.into_iter().map(finalize_node).collect();
        Ok(PackResult {
            nodes: allocations,
            unschedulable,
        })
    }

    fn name(&self) -> &'static str {
        "best-fit-decreasing"
    }
}

/// Total resources every node loses to DaemonSet pods.
fn daemonset_overhead(daemon_sets: &[WorkloadProfile]) -> ResourceQuantity {
    daemon_sets
        .iter()
        .fold(ResourceQuantity::default(), |acc, d| acc + d.effective)
}

/// Sorts workloads so the most demanding come first. Dominance is the
/// larger of the CPU and memory fractions relative to the biggest template
/// in the pool; ties keep their input order.
fn sort_by_dominance(workloads: &mut [WorkloadProfile], templates: &[NodeTemplate]) {
    let max_cpu = templates
        .iter()
        .map(|t| t.allocatable_cpu_millis)
        .max()
        .unwrap_or(0);
    let max_mem = templates
        .iter()
        .map(|t| t.allocatable_memory_bytes)
        .max()
        .unwrap_or(0);
    if max_cpu == 0 || max_mem == 0 {
        return;
    }

    workloads.sort_by(|a, b| {
        let da = dominance(a, max_cpu, max_mem);
        let db = dominance(b, max_cpu, max_mem);
        db.partial_cmp(&da).unwrap_or(std::cmp::Ordering::Equal)
    });
}

fn dominance(w: &WorkloadProfile, max_cpu: i64, max_mem: i64) -> f64 {
    let cpu_frac = w.effective.cpu_millis as f64 / max_cpu as f64;
    let mem_frac = w.effective.memory_bytes as f64 / max_mem as f64;
    cpu_frac.max(mem_frac)
}

/// The cheapest template whose first-node capacity (after overhead) admits
/// the workload.
fn select_cheapest_fitting<'a>(
    templates: &'a [NodeTemplate],
    w: &WorkloadProfile,
    overhead: ResourceQuantity,
) -> Option<&'a NodeTemplate> {
    let mut best: Option<&NodeTemplate> = None;
    for template in templates {
        let avail = template.allocatable() - overhead;
        if !w.effective.fits_in(avail) {
            continue;
        }
        if best.map_or(true, |b| {
            template.on_demand_price_per_hour < b.on_demand_price_per_hour
        }) {
            best = Some(template);
        }
    }
    best
}

/// The cheapest template overall, ties to the first listed.
fn cheapest_template(templates: &[NodeTemplate]) -> Option<&NodeTemplate> {
    let mut best: Option<&NodeTemplate> = None;
    for template in templates {
        if best.map_or(true, |b| {
            template.on_demand_price_per_hour < b.on_demand_price_per_hour
        }) {
            best = Some(template);
        }
    }
    best
}

/// Assigns `round(total × ratio)` nodes as spot, preferring the least
/// loaded (by consumed CPU) so the cheaper, interruptible capacity carries
/// the least work. Rounding is half away from zero; ties in load keep
/// insertion order.
fn apply_spot_ratio(nodes: &mut [NodeState], spot_ratio: f64) {
    let spot_count = ((nodes.len() as f64 * spot_ratio).round() as usize).min(nodes.len());
    if spot_count == 0 {
        return;
    }

    let mut indices: Vec<usize> = (0..nodes.len()).collect();
    indices.sort_by_key(|&i| nodes[i].used.cpu_millis);

    for (pos, &idx) in indices.iter().enumerate() {
        nodes[idx].template.capacity_type = if pos < spot_count {
            CapacityType::Spot
        } else {
            CapacityType::OnDemand
        };
    }
}

fn finalize_node(node: NodeState) -> NodeAllocation {
    let alloc = node.template.allocatable();
    let cpu_utilization = if alloc.cpu_millis > 0 {
        node.used.cpu_millis as f64 / alloc.cpu_millis as f64
    } else {
        0.0
    };
    let mem_utilization = if alloc.memory_bytes > 0 {
        node.used.memory_bytes as f64 / alloc.memory_bytes as f64
    } else {
        0.0
    };

    NodeAllocation {
        template: node.template,
        workloads: node.workloads,
        used_cpu_millis: node.used.cpu_millis,
        used_memory_bytes: node.used.memory_bytes,
        pod_count: node.pod_count,
        cpu_utilization,
        mem_utilization,
    }
}
