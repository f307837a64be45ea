//! Capacity-planning recommender for Kubernetes clusters on EC2
//!
//! This crate provides the core functionality for:
//! - Sizing workloads from percentile-indexed usage telemetry
//! - Classifying the aggregate workload profile
//! - Bin-packing simulation across candidate instance fleets
//! - Fragmentation and scaling-efficiency analysis
//! - Weighted scoring and deterministic ranking
//! - Instance catalogs, pricing, and metrics collection

pub mod catalog;
pub mod classifier;
pub mod collector;
pub mod config;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod simulation;
pub mod sizing;

pub use error::{CatalogError, CollectError, ConfigError, SimulationError};
pub use model::*;
pub use pipeline::{Analysis, Pipeline};
