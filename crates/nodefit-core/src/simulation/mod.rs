//! Bin-packing simulation
//!
//! A `BinPacker` places workloads onto nodes for one scenario; the
//! `Engine` fans scenarios out across a worker pool and hands the results
//! to the `Scorer` for ranking.

mod bfd;
mod engine;
mod fragmentation;
mod scenarios;
mod scorer;

pub use bfd::BestFitDecreasing;
pub use engine::{build_simulation_result, Engine};
pub use fragmentation::analyze_fragmentation;
pub use scenarios::generate_scenarios;
pub use scorer::Scorer;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::SimulationError;
use crate::model::{NodeAllocation, NodeTemplate, ResourceQuantity, WorkloadProfile};

/// Input to a single bin-packing run.
#[derive(Debug, Clone, Default)]
pub struct PackInput {
    pub workloads: Vec<WorkloadProfile>,
    pub daemon_sets: Vec<WorkloadProfile>,
    pub templates: Vec<NodeTemplate>,
    /// Per-node system overhead subtracted from every node.
    pub system_reserved: ResourceQuantity,
    /// Node cap (0 = unlimited).
    pub max_nodes: u32,
    /// High-availability floor (0 = disabled).
    pub min_nodes: u32,
    /// Fraction of nodes to assign as spot, 0.0–1.0.
    pub spot_ratio: f64,
}

/// Output of a bin-packing run.
#[derive(Debug, Clone, Default)]
pub struct PackResult {
    pub nodes: Vec<NodeAllocation>,
    pub unschedulable: Vec<WorkloadProfile>,
}

/// A strategy for placing workloads onto nodes.
///
/// Implementations must be deterministic: identical inputs produce
/// identical node counts, node order, and per-node workload sets. The
/// cancel flag is checked between placement iterations; on cancellation
/// the packer returns `SimulationError::Cancelled` rather than a partial
/// result.
pub trait BinPacker: Send + Sync {
    fn pack(&self, input: PackInput, cancel: &CancelFlag) -> Result<PackResult, SimulationError>;

    fn name(&self) -> &'static str;
}

/// Shared cancellation signal, observable from synchronous packing loops.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}
