//! Scenario enumeration

use std::collections::BTreeMap;

use crate::config::Strategy;
use crate::model::{NodeTemplate, PackingStrategy, Scenario};

/// Enumerates the scenarios to simulate for a template pool.
///
/// Homogeneous: one scenario per instance type. Mixed: one scenario per
/// family owning at least two sizes, carrying every size of that family.
/// Families iterate in sorted order so the scenario list is reproducible.
/// Total: an empty pool yields no scenarios.
pub fn generate_scenarios(
    templates: &[NodeTemplate],
    strategy: Strategy,
    spot_ratio: f64,
    min_nodes: u32,
) -> Vec<Scenario> {
    let mut scenarios = Vec::new();

    if matches!(strategy, Strategy::Homogeneous | Strategy::Both) {
        for template in templates {
            scenarios.push(Scenario {
                name: format!("homogeneous-{}", template.instance_type),
                templates: vec![template.clone()],
                strategy: PackingStrategy::Homogeneous,
                spot_ratio,
                min_nodes,
            });
        }
    }

    if matches!(strategy, Strategy::Mixed | Strategy::Both) {
        let mut families: BTreeMap<&str, Vec<&NodeTemplate>> = BTreeMap::new();
        for template in templates {
            families
                .entry(template.instance_family.as_str())
                .or_default()
                .push(template);
        }

        for (family, members) in families {
            if members.len() < 2 {
                continue;
            }
            scenarios.push(Scenario {
                name: format!("mixed-{family}"),
                templates: members.into_iter().cloned().collect(),
                strategy: PackingStrategy::Mixed,
                spot_ratio,
                min_nodes,
            });
        }
    }

    scenarios
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Architecture, CapacityType};

    fn template(instance_type: &str, family: &str) -> NodeTemplate {
        NodeTemplate {
            instance_type: instance_type.to_string(),
            instance_family: family.to_string(),
            generation: 6,
            size: "large".to_string(),
            architecture: Architecture::Amd64,
            vcpus: 2,
            memory_mib: 8192,
            allocatable_cpu_millis: 1930,
            allocatable_memory_bytes: 7 * 1024 * 1024 * 1024,
            max_pods: 29,
            on_demand_price_per_hour: 0.096,
            spot_price_per_hour: 0.0,
            capacity_type: CapacityType::OnDemand,
            current_generation: true,
            region: "us-east-1".to_string(),
        }
    }

    #[test]
    fn test_homogeneous_one_per_type() {
        let templates = vec![
            template("m6i.large", "m6i"),
            template("m6i.xlarge", "m6i"),
            template("c6i.large", "c6i"),
        ];
        let scenarios = generate_scenarios(&templates, Strategy::Homogeneous, 0.0, 0);
        assert_eq!(scenarios.len(), 3);
        assert_eq!(scenarios[0].name, "homogeneous-m6i.large");
        assert!(scenarios
            .iter()
            .all(|s| s.templates.len() == 1 && s.strategy == PackingStrategy::Homogeneous));
    }

    #[test]
    fn test_mixed_needs_two_sizes() {
        let templates = vec![
            template("m6i.large", "m6i"),
            template("m6i.xlarge", "m6i"),
            template("c6i.large", "c6i"),
        ];
        let scenarios = generate_scenarios(&templates, Strategy::Mixed, 0.0, 0);
        assert_eq!(scenarios.len(), 1);
        assert_eq!(scenarios[0].name, "mixed-m6i");
        assert_eq!(scenarios[0].templates.len(), 2);
    }

    #[test]
    fn test_both_unions_and_orders_families() {
        let templates = vec![
            template("r6i.large", "r6i"),
            template("r6i.xlarge", "r6i"),
            template("c6i.large", "c6i"),
            template("c6i.xlarge", "c6i"),
        ];
        let scenarios = generate_scenarios(&templates, Strategy::Both, 0.25, 3);
        assert_eq!(scenarios.len(), 6);
        // Mixed scenarios come after homogeneous, in sorted family order
        assert_eq!(scenarios[4].name, "mixed-c6i");
        assert_eq!(scenarios[5].name, "mixed-r6i");
        assert!(scenarios.iter().all(|s| s.spot_ratio == 0.25));
        assert!(scenarios.iter().all(|s| s.min_nodes == 3));
    }

    #[test]
    fn test_empty_input_yields_nothing() {
        assert!(generate_scenarios(&[], Strategy::Both, 0.0, 0).is_empty());
    }
}
