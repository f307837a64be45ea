//! Error taxonomy
//!
//! Typed errors for the core stages; IO-facing boundaries (pipeline, CLI)
//! wrap these in `anyhow` with context. Unschedulable workloads and
//! expensive outcomes are data, never errors.

use thiserror::Error;

/// Caller-supplied configuration out of range. Fatal at entry.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("loading configuration: {0}")]
    Load(#[from] config::ConfigError),
}

/// Failures of the simulation engine and its workers.
#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("no simulation scenarios could be generated")]
    NoScenarios,

    #[error("all simulation scenarios failed")]
    AllScenariosFailed,

    #[error("scenario {name} failed: {reason}")]
    ScenarioFailed { name: String, reason: String },

    #[error("simulation cancelled")]
    Cancelled,
}

/// Failures of a metrics collector.
#[derive(Debug, Error)]
pub enum CollectError {
    #[error("metrics backend unreachable: {0}")]
    Unreachable(String),

    #[error("no pod metrics found for the specified criteria")]
    NoMetrics,

    #[error("query failed: {0}")]
    Query(String),

    #[error("reading snapshot: {0}")]
    Io(#[from] std::io::Error),

    #[error("parsing snapshot: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Failures of an instance catalog provider.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("no instance types match the requested filter")]
    NoInstanceTypes,

    #[error("pricing lookup failed: {0}")]
    Pricing(String),

    #[error("cache io: {0}")]
    Io(#[from] std::io::Error),

    #[error("cache decode: {0}")]
    Parse(#[from] serde_json::Error),
}
