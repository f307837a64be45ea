//! Instance-type catalog
//!
//! Providers turn a filter into candidate `NodeTemplate`s with allocatable
//! capacity and pricing attached.

mod builtin;
mod cache;
mod pricing;

pub use builtin::{
    allocatable_cpu_millis, allocatable_memory_bytes, compute_max_pods, parse_instance_type,
    BuiltinCatalog,
};
pub(crate) use cache::default_cache_dir;
pub use cache::FileCache;
pub use pricing::{enrich_spot_prices, HttpPricingSource, PricingSource};

use async_trait::async_trait;

use crate::error::CatalogError;
use crate::model::{Architecture, NodeTemplate};

/// Server- and client-side filters for instance selection.
#[derive(Debug, Clone, Default)]
pub struct InstanceFilter {
    /// Instance families to include (empty = all).
    pub families: Vec<String>,
    /// Architectures to include (empty = all).
    pub architectures: Vec<Architecture>,
    /// vCPU range (0 = unbounded on that side).
    pub min_vcpus: u32,
    pub max_vcpus: u32,
    pub current_generation_only: bool,
    pub exclude_bare_metal: bool,
    pub exclude_burstable: bool,
}

/// Source of candidate instance types.
#[async_trait]
pub trait InstanceProvider: Send + Sync {
    /// Returns the templates matching the filter, with allocatable
    /// capacity and on-demand pricing filled in. Fails with
    /// `NoInstanceTypes` when nothing matches.
    async fn instance_types(&self, filter: &InstanceFilter) -> Result<Vec<NodeTemplate>, CatalogError>;
}
