//! Bundled instance-type dataset and capacity formulas
//!
//! Ships shapes and on-demand prices for the current-generation compute,
//! general, and memory families across the Intel, AMD, and Graviton lines,
//! so the recommender works without cloud API access. Allocatable capacity
//! follows the EKS kubelet reservation formulas; pod density follows the
//! ENI formula.

use async_trait::async_trait;

use super::{InstanceFilter, InstanceProvider};
use crate::error::CatalogError;
use crate::model::{Architecture, CapacityType, NodeTemplate};

const MIB: i64 = 1024 * 1024;

/// Raw shape of one instance type before Kubernetes adjustments.
#[derive(Debug, Clone)]
struct InstanceShape {
    instance_type: String,
    vcpus: u32,
    memory_mib: i64,
    max_enis: u32,
    ipv4_per_eni: u32,
    architecture: Architecture,
    burstable: bool,
    bare_metal: bool,
    current_generation: bool,
    on_demand_price_per_hour: f64,
}

/// (size suffix, vCPUs, max ENIs, IPv4 per ENI, price multiple of .large)
const SIZES: [(&str, u32, u32, u32, f64); 4] = [
    ("large", 2, 3, 10, 1.0),
    ("xlarge", 4, 4, 15, 2.0),
    ("2xlarge", 8, 4, 15, 4.0),
    ("4xlarge", 16, 8, 30, 8.0),
];

/// (family, architecture, memory MiB per vCPU, .large on-demand $/h)
const FAMILIES: [(&str, Architecture, i64, f64); 18] = [
    ("c6i", Architecture::Amd64, 2048, 0.0850),
    ("c7i", Architecture::Amd64, 2048, 0.08925),
    ("c6a", Architecture::Amd64, 2048, 0.0765),
    ("c7a", Architecture::Amd64, 2048, 0.10264),
    ("c6g", Architecture::Arm64, 2048, 0.0680),
    ("c7g", Architecture::Arm64, 2048, 0.0725),
    ("m6i", Architecture::Amd64, 4096, 0.0960),
    ("m7i", Architecture::Amd64, 4096, 0.1008),
    ("m6a", Architecture::Amd64, 4096, 0.0864),
    ("m7a", Architecture::Amd64, 4096, 0.11592),
    ("m6g", Architecture::Arm64, 4096, 0.0770),
    ("m7g", Architecture::Arm64, 4096, 0.0816),
    ("r6i", Architecture::Amd64, 8192, 0.1260),
    ("r7i", Architecture::Amd64, 8192, 0.1323),
    ("r6a", Architecture::Amd64, 8192, 0.1134),
    ("r7a", Architecture::Amd64, 8192, 0.15225),
    ("r6g", Architecture::Arm64, 8192, 0.1008),
    ("r7g", Architecture::Arm64, 8192, 0.1071),
];

fn builtin_shapes() -> Vec<InstanceShape> {
    let mut shapes = Vec::new();

    for (family, architecture, mib_per_vcpu, large_price) in FAMILIES {
        for (size, vcpus, max_enis, ipv4_per_eni, multiple) in SIZES {
            shapes.push(InstanceShape {
                instance_type: format!("{family}.{size}"),
                vcpus,
                memory_mib: i64::from(vcpus) * mib_per_vcpu,
                max_enis,
                ipv4_per_eni,
                architecture,
                burstable: false,
                bare_metal: false,
                current_generation: true,
                on_demand_price_per_hour: large_price * multiple,
            });
        }
    }

    // Burstable types, excluded by default configuration.
    for (instance_type, vcpus, memory_mib, price, architecture) in [
        ("t3.large", 2u32, 8192i64, 0.0832, Architecture::Amd64),
        ("t3.xlarge", 4, 16384, 0.1664, Architecture::Amd64),
        ("t4g.large", 2, 8192, 0.0672, Architecture::Arm64),
    ] {
        shapes.push(InstanceShape {
            instance_type: instance_type.to_string(),
            vcpus,
            memory_mib,
            max_enis: 3,
            ipv4_per_eni: 12,
            architecture,
            burstable: true,
            bare_metal: false,
            current_generation: true,
            on_demand_price_per_hour: price,
        });
    }

    // A bare-metal and a previous-generation shape for completeness.
    shapes.push(InstanceShape {
        instance_type: "m6i.metal".to_string(),
        vcpus: 128,
        memory_mib: 512 * 1024,
        max_enis: 15,
        ipv4_per_eni: 50,
        architecture: Architecture::Amd64,
        burstable: false,
        bare_metal: true,
        current_generation: true,
        on_demand_price_per_hour: 6.144,
    });
    shapes.push(InstanceShape {
        instance_type: "m4.large".to_string(),
        vcpus: 2,
        memory_mib: 8192,
        max_enis: 2,
        ipv4_per_eni: 10,
        architecture: Architecture::Amd64,
        burstable: false,
        bare_metal: false,
        current_generation: false,
        on_demand_price_per_hour: 0.1000,
    });

    shapes
}

/// Offline instance catalog backed by the bundled dataset.
#[derive(Debug, Clone)]
pub struct BuiltinCatalog {
    region: String,
}

impl BuiltinCatalog {
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
        }
    }
}

#[async_trait]
impl InstanceProvider for BuiltinCatalog {
    async fn instance_types(&self, filter: &InstanceFilter) -> Result<Vec<NodeTemplate>, CatalogError> {
        let templates: Vec<NodeTemplate> = builtin_shapes()
            .into_iter()
            .filter(|shape| matches_filter(shape, filter))
            .map(|shape| to_template(shape, &self.region))
            .collect();

        if templates.is_empty() {
            return Err(CatalogError::NoInstanceTypes);
        }
        Ok(templates)
    }
}

fn matches_filter(shape: &InstanceShape, filter: &InstanceFilter) -> bool {
    let (family, _, _) = parse_instance_type(&shape.instance_type);

    if !filter.families.is_empty() && !filter.families.iter().any(|f| f == &family) {
        return false;
    }
    if !filter.architectures.is_empty() && !filter.architectures.contains(&shape.architecture) {
        return false;
    }
    if filter.min_vcpus > 0 && shape.vcpus < filter.min_vcpus {
        return false;
    }
    if filter.max_vcpus > 0 && shape.vcpus > filter.max_vcpus {
        return false;
    }
    if filter.current_generation_only && !shape.current_generation {
        return false;
    }
    if filter.exclude_bare_metal && shape.bare_metal {
        return false;
    }
    if filter.exclude_burstable && shape.burstable {
        return false;
    }
    true
}

fn to_template(shape: InstanceShape, region: &str) -> NodeTemplate {
    let (family, generation, size) = parse_instance_type(&shape.instance_type);

    NodeTemplate {
        instance_family: family,
        generation,
        size,
        architecture: shape.architecture,
        vcpus: shape.vcpus,
        memory_mib: shape.memory_mib,
        allocatable_cpu_millis: allocatable_cpu_millis(shape.vcpus),
        allocatable_memory_bytes: allocatable_memory_bytes(shape.memory_mib),
        max_pods: compute_max_pods(shape.max_enis, shape.ipv4_per_eni),
        on_demand_price_per_hour: shape.on_demand_price_per_hour,
        spot_price_per_hour: 0.0,
        capacity_type: CapacityType::OnDemand,
        current_generation: shape.current_generation,
        region: region.to_string(),
        instance_type: shape.instance_type,
    }
}

/// Maximum pods per node from the ENI formula: (ENIs × IPv4 per ENI) − 1,
/// clamped to [1, 250]. Unknown networking data falls back to the
/// Kubernetes default of 110.
pub fn compute_max_pods(max_enis: u32, ipv4_per_eni: u32) -> u32 {
    if max_enis == 0 || ipv4_per_eni == 0 {
        return 110;
    }
    (max_enis * ipv4_per_eni - 1).clamp(1, 250)
}

/// Kubelet CPU reservation ladder: 60m for the first core, 10m for the
/// second, 5m for the next two, 2m per core beyond.
pub fn allocatable_cpu_millis(vcpus: u32) -> i64 {
    let total = i64::from(vcpus) * 1000;
    let mut reserved = 0i64;
    let mut remaining = i64::from(vcpus);

    if remaining > 0 {
        reserved += 60;
        remaining -= 1;
    }
    if remaining > 0 {
        reserved += 10;
        remaining -= 1;
    }
    if remaining > 0 {
        let cores = remaining.min(2);
        reserved += cores * 5;
        remaining -= cores;
    }
    if remaining > 0 {
        reserved += remaining * 2;
    }

    total - reserved
}

/// Kubelet memory reservation tiers: 255 MiB base, then 25% of the first
/// 4 GiB, 20% of the next 4 GiB, 10% of the next 8 GiB, 6% of the next
/// 112 GiB, and 2% beyond.
pub fn allocatable_memory_bytes(memory_mib: i64) -> i64 {
    let total = memory_mib * MIB;
    let mut reserved = 255 * MIB;
    let mut remaining_mib = memory_mib;

    for (tier_mib, percent) in [(4096i64, 25i64), (4096, 20), (8192, 10), (112 * 1024, 6)] {
        let chunk = remaining_mib.min(tier_mib);
        reserved += chunk * MIB * percent / 100;
        remaining_mib -= chunk;
    }
    if remaining_mib > 0 {
        reserved += remaining_mib * MIB * 2 / 100;
    }

    (total - reserved).max(0)
}

/// Splits an instance type name into (family, generation, size),
/// e.g. "m7g.xlarge" → ("m7g", 7, "xlarge").
pub fn parse_instance_type(instance_type: &str) -> (String, u32, String) {
    let Some((family, size)) = instance_type.split_once('.') else {
        return (instance_type.to_string(), 0, String::new());
    };

    let digits: String = family
        .chars()
        .skip_while(|c| c.is_ascii_alphabetic())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    let generation = digits.parse().unwrap_or(0);

    (family.to_string(), generation, size.to_string())
}
