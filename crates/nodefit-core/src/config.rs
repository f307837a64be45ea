//! Configuration
//!
//! Settings load from an optional file plus `NODEFIT_`-prefixed
//! environment variables, with serde defaults for everything. Validation
//! happens once at entry; the pipeline trusts validated settings.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::catalog::{default_cache_dir, InstanceFilter};
use crate::classifier::Vendor;
use crate::error::ConfigError;
use crate::model::{Architecture, ResourceQuantity, ScoringWeights};

/// Scenario generation mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    Homogeneous,
    Mixed,
    #[default]
    Both,
}

impl std::str::FromStr for Strategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "homogeneous" => Ok(Strategy::Homogeneous),
            "mixed" => Ok(Strategy::Mixed),
            "both" => Ok(Strategy::Both),
            other => Err(ConfigError::Invalid(format!(
                "strategy must be homogeneous, mixed, or both, got {other:?}"
            ))),
        }
    }
}

/// Top-level settings tree.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub cluster: ClusterSettings,
    #[serde(default)]
    pub prometheus: PrometheusSettings,
    #[serde(default)]
    pub metrics: MetricsSettings,
    #[serde(default)]
    pub instances: InstanceSettings,
    #[serde(default)]
    pub simulation: SimulationSettings,
    #[serde(default)]
    pub scoring: ScoringSettings,
    #[serde(default)]
    pub output: OutputSettings,
    #[serde(default)]
    pub cache: CacheSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClusterSettings {
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_region")]
    pub region: String,
}

impl Default for ClusterSettings {
    fn default() -> Self {
        Self {
            name: String::new(),
            region: default_region(),
        }
    }
}

fn default_region() -> String {
    std::env::var("AWS_REGION")
        .or_else(|_| std::env::var("AWS_DEFAULT_REGION"))
        .unwrap_or_else(|_| "us-east-1".to_string())
}

#[derive(Debug, Clone, Deserialize)]
pub struct PrometheusSettings {
    #[serde(default = "default_prometheus_url")]
    pub url: String,
    #[serde(default = "default_prometheus_timeout")]
    pub timeout_secs: u64,
}

impl Default for PrometheusSettings {
    fn default() -> Self {
        Self {
            url: default_prometheus_url(),
            timeout_secs: default_prometheus_timeout(),
        }
    }
}

fn default_prometheus_url() -> String {
    "http://localhost:9090".to_string()
}

fn default_prometheus_timeout() -> u64 {
    60
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsSettings {
    /// Lookback window in hours.
    #[serde(default = "default_window_hours")]
    pub window_hours: u64,
    /// Query resolution in seconds.
    #[serde(default = "default_step_secs")]
    pub step_secs: i64,
    /// Sizing percentile, (0, 1].
    #[serde(default = "default_percentile")]
    pub percentile: f64,
    #[serde(default = "default_exclude_namespaces")]
    pub exclude_namespaces: Vec<String>,
}

impl Default for MetricsSettings {
    fn default() -> Self {
        Self {
            window_hours: default_window_hours(),
            step_secs: default_step_secs(),
            percentile: default_percentile(),
            exclude_namespaces: default_exclude_namespaces(),
        }
    }
}

fn default_window_hours() -> u64 {
    7 * 24
}

fn default_step_secs() -> i64 {
    300
}

fn default_percentile() -> f64 {
    0.95
}

fn default_exclude_namespaces() -> Vec<String> {
    vec![
        "kube-system".to_string(),
        "kube-node-lease".to_string(),
        "karpenter".to_string(),
    ]
}

#[derive(Debug, Clone, Deserialize)]
pub struct InstanceSettings {
    /// Families to consider; empty = derive from workload classification.
    #[serde(default)]
    pub families: Vec<String>,
    #[serde(default = "default_architectures")]
    pub architectures: Vec<Architecture>,
    /// Vendor line used when families are auto-derived.
    #[serde(default)]
    pub vendor: Vendor,
    #[serde(default = "default_true")]
    pub exclude_burstable: bool,
    #[serde(default = "default_true")]
    pub exclude_bare_metal: bool,
    #[serde(default = "default_true")]
    pub current_generation_only: bool,
    #[serde(default = "default_min_vcpus")]
    pub min_vcpus: u32,
    #[serde(default = "default_max_vcpus")]
    pub max_vcpus: u32,
}

impl InstanceSettings {
    /// The provider filter these settings describe, with families
    /// resolved by the caller.
    pub fn filter_with_families(&self, families: Vec<String>) -> InstanceFilter {
        InstanceFilter {
            families,
            architectures: self.architectures.clone(),
            min_vcpus: self.min_vcpus,
            max_vcpus: self.max_vcpus,
            current_generation_only: self.current_generation_only,
            exclude_bare_metal: self.exclude_bare_metal,
            exclude_burstable: self.exclude_burstable,
        }
    }
}

impl Default for InstanceSettings {
    fn default() -> Self {
        Self {
            families: Vec::new(),
            architectures: default_architectures(),
            vendor: Vendor::default(),
            exclude_burstable: true,
            exclude_bare_metal: true,
            current_generation_only: true,
            min_vcpus: default_min_vcpus(),
            max_vcpus: default_max_vcpus(),
        }
    }
}

fn default_architectures() -> Vec<Architecture> {
    vec![Architecture::Amd64]
}

fn default_true() -> bool {
    true
}

fn default_min_vcpus() -> u32 {
    2
}

fn default_max_vcpus() -> u32 {
    96
}

#[derive(Debug, Clone, Deserialize)]
pub struct SimulationSettings {
    #[serde(default)]
    pub strategy: Strategy,
    /// Fraction of nodes to run as spot, 0.0–1.0.
    #[serde(default)]
    pub spot_ratio: f64,
    /// High-availability floor (0 = disabled).
    #[serde(default = "default_min_nodes")]
    pub min_nodes: u32,
    /// Node cap per scenario (0 = unlimited).
    #[serde(default = "default_max_nodes")]
    pub max_nodes: u32,
    #[serde(default)]
    pub system_reserved: SystemReservedSettings,
}

impl SimulationSettings {
    pub fn system_reserved(&self) -> ResourceQuantity {
        ResourceQuantity::new(
            self.system_reserved.cpu_millis,
            self.system_reserved.memory_mib * 1024 * 1024,
        )
    }
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            strategy: Strategy::default(),
            spot_ratio: 0.0,
            min_nodes: default_min_nodes(),
            max_nodes: default_max_nodes(),
            system_reserved: SystemReservedSettings::default(),
        }
    }
}

fn default_min_nodes() -> u32 {
    3
}

fn default_max_nodes() -> u32 {
    500
}

#[derive(Debug, Clone, Deserialize)]
pub struct SystemReservedSettings {
    #[serde(default = "default_reserved_cpu")]
    pub cpu_millis: i64,
    #[serde(default = "default_reserved_memory")]
    pub memory_mib: i64,
}

impl Default for SystemReservedSettings {
    fn default() -> Self {
        Self {
            cpu_millis: default_reserved_cpu(),
            memory_mib: default_reserved_memory(),
        }
    }
}

fn default_reserved_cpu() -> i64 {
    100
}

fn default_reserved_memory() -> i64 {
    256
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScoringSettings {
    #[serde(default)]
    pub weights: ScoringWeights,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputSettings {
    /// Number of recommendations to report.
    #[serde(default = "default_top_n")]
    pub top_n: usize,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            top_n: default_top_n(),
        }
    }
}

fn default_top_n() -> usize {
    5
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

impl CacheSettings {
    /// The cache directory to use, if caching is enabled and a location
    /// can be determined.
    pub fn resolve_dir(&self) -> Option<PathBuf> {
        if !self.enabled {
            return None;
        }
        self.dir.clone().or_else(default_cache_dir)
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: None,
        }
    }
}

impl Settings {
    /// Loads settings from an optional file plus the environment
    /// (`NODEFIT_SIMULATION__SPOT_RATIO=0.5` style overrides).
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }
        builder = builder.add_source(config::Environment::with_prefix("NODEFIT").separator("__"));

        let settings: Settings = builder.build()?.try_deserialize()?;
        Ok(settings)
    }

    /// Checks ranges and cross-field consistency. Call once at entry.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.metrics.percentile <= 0.0 || self.metrics.percentile > 1.0 {
            return Err(ConfigError::Invalid(format!(
                "percentile must be in (0, 1], got {}",
                self.metrics.percentile
            )));
        }
        if self.metrics.window_hours == 0 {
            return Err(ConfigError::Invalid(
                "metrics window must be positive".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.simulation.spot_ratio) {
            return Err(ConfigError::Invalid(format!(
                "spot_ratio must be between 0 and 1, got {}",
                self.simulation.spot_ratio
            )));
        }

        let w = &self.scoring.weights;
        for (name, value) in [
            ("cost", w.cost),
            ("utilization", w.utilization),
            ("fragmentation", w.fragmentation),
            ("resilience", w.resilience),
        ] {
            if value < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "scoring weight {name} must be non-negative, got {value}"
                )));
            }
        }
        if (w.sum() - 1.0).abs() > 0.01 {
            return Err(ConfigError::Invalid(format!(
                "scoring weights must sum to 1.0, got {:.3}",
                w.sum()
            )));
        }

        if self.output.top_n == 0 {
            return Err(ConfigError::Invalid("top_n must be positive".to_string()));
        }
        if self.instances.max_vcpus > 0 && self.instances.max_vcpus < self.instances.min_vcpus {
            return Err(ConfigError::Invalid(format!(
                "max_vcpus ({}) must be at least min_vcpus ({})",
                self.instances.max_vcpus, self.instances.min_vcpus
            )));
        }
        Ok(())
    }
}
