//! Simulation scenarios: candidate instance configurations to evaluate

use serde::{Deserialize, Serialize};

use super::node::NodeTemplate;

/// How a scenario draws node templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackingStrategy {
    /// A single instance type for the whole fleet.
    Homogeneous,
    /// Every size of one instance family.
    Mixed,
}

/// One simulation run configuration, built by the scenario generator and
/// handed to the engine by value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub templates: Vec<NodeTemplate>,
    pub strategy: PackingStrategy,
    /// Fraction of nodes to run as spot, 0.0–1.0.
    pub spot_ratio: f64,
    /// High-availability floor: minimum nodes to provision (0 = disabled).
    pub min_nodes: u32,
}

impl Scenario {
    /// Human-readable label for reports.
    pub fn label(&self) -> String {
        if self.strategy == PackingStrategy::Homogeneous && self.templates.len() == 1 {
            return self.templates[0].instance_type.clone();
        }
        let types: Vec<&str> = self
            .templates
            .iter()
            .map(|t| t.instance_type.as_str())
            .collect();
        format!("{} (mixed)", types.join(" + "))
    }
}
