//! Core data model
//!
//! Entities flow through the pipeline in one direction: the sizing stage
//! builds `WorkloadProfile`s, the scenario generator builds `Scenario`s,
//! the packer builds `NodeAllocation`s, and the scorer turns
//! `SimulationResult`s into `Recommendation`s. Nothing is mutated after
//! being handed to the next stage.

mod cluster;
mod node;
mod resources;
mod result;
mod scenario;
mod workload;

pub use cluster::{AggregateMetrics, ClusterState, TimeWindow};
pub use node::{Architecture, CapacityType, NodeAllocation, NodeTemplate, HOURS_PER_MONTH};
pub use resources::{PercentileValues, ResourceQuantity};
pub use result::{
    FragmentationReport, Recommendation, ScalingEfficiency, ScoringWeights, SimulationResult,
};
pub use scenario::{PackingStrategy, Scenario};
pub use workload::{sum_effective, WorkloadProfile};
