//! End-to-end recommendation pipeline
//!
//! Wires the collaborators together: collect → classify → fetch templates
//! → generate scenarios → simulate → rank → truncate to top-N.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::catalog::{enrich_spot_prices, FileCache, InstanceProvider, PricingSource};
use crate::classifier::{classify_workloads, probe_families, WorkloadClass};
use crate::collector::{CollectOptions, MetricsCollector};
use crate::config::Settings;
use crate::model::{ClusterState, Recommendation, TimeWindow};
use crate::simulation::{generate_scenarios, BestFitDecreasing, CancelFlag, Engine, Scorer};

/// The outcome of a pipeline run: the analysed state, how it was
/// classified, and the ranked recommendations.
pub struct Analysis {
    pub state: ClusterState,
    /// Present when families were auto-derived.
    pub workload_class: Option<WorkloadClass>,
    pub gib_per_vcpu: Option<f64>,
    pub families: Vec<String>,
    pub recommendations: Vec<Recommendation>,
}

/// Coordinates the recommendation flow across the collector, the instance
/// provider, and the simulation engine.
pub struct Pipeline {
    collector: Arc<dyn MetricsCollector>,
    provider: Arc<dyn InstanceProvider>,
    pricing: Option<Arc<dyn PricingSource>>,
    settings: Settings,
}

impl Pipeline {
    pub fn new(
        collector: Arc<dyn MetricsCollector>,
        provider: Arc<dyn InstanceProvider>,
        settings: Settings,
    ) -> Self {
        Self {
            collector,
            provider,
            pricing: None,
            settings,
        }
    }

    /// Enables spot-price enrichment of fetched templates.
    pub fn with_pricing_source(mut self, pricing: Arc<dyn PricingSource>) -> Self {
        self.pricing = Some(pricing);
        self
    }

    /// The collection options the configured metrics settings describe.
    pub fn collect_options(&self) -> CollectOptions {
        let metrics = &self.settings.metrics;
        let end = chrono::Utc::now();
        let start = end - chrono::Duration::hours(metrics.window_hours as i64);
        CollectOptions {
            window: TimeWindow {
                start,
                end,
                step_secs: metrics.step_secs,
            },
            namespaces: Vec::new(),
            exclude_namespaces: metrics.exclude_namespaces.clone(),
            percentile: metrics.percentile,
        }
    }

    /// Full pipeline: collect from the metrics backend, then simulate.
    pub async fn recommend(&self, cancel: CancelFlag) -> Result<Analysis> {
        info!(backend = self.collector.backend_type(), "collecting metrics");

        let opts = self.collect_options();
        let mut state = self
            .collector
            .collect(&opts)
            .await
            .context("collecting metrics")?;

        state.cluster_name = self.settings.cluster.name.clone();
        state.region = self.settings.cluster.region.clone();
        state.system_reserved = self.settings.simulation.system_reserved();

        info!(
            workloads = state.workload_count(),
            daemon_sets = state.daemon_sets.len(),
            "collected workload profiles"
        );

        self.simulate(state, cancel).await
    }

    /// Simulation-only pipeline for a pre-collected cluster state.
    pub async fn simulate(&self, state: ClusterState, cancel: CancelFlag) -> Result<Analysis> {
        let instances = &self.settings.instances;

        let (families, classification) = if instances.families.is_empty() {
            let (class, ratio) = classify_workloads(&state);
            let families = probe_families(class, instances.vendor);
            info!(
                class = %class,
                gib_per_vcpu = format!("{ratio:.1}"),
                ?families,
                "classified workload profile"
            );
            (families, Some((class, ratio)))
        } else {
            (instances.families.clone(), None)
        };

        let filter = instances.filter_with_families(families.clone());
        let mut templates = self
            .provider
            .instance_types(&filter)
            .await
            .context("fetching instance types")?;

        if self.settings.simulation.spot_ratio > 0.0 {
            if let Some(pricing) = &self.pricing {
                let cache = self.settings.cache.resolve_dir().map(FileCache::new);
                match enrich_spot_prices(&mut templates, pricing.as_ref(), cache.as_ref()).await {
                    Ok(enriched) => info!(enriched, "applied spot pricing"),
                    // Missing spot prices only mean cost falls back to
                    // on-demand; never fail the run over them.
                    Err(err) => warn!(error = %err, "spot pricing unavailable"),
                }
            }
        }

        let simulation = &self.settings.simulation;
        let scenarios = generate_scenarios(
            &templates,
            simulation.strategy,
            simulation.spot_ratio,
            simulation.min_nodes,
        );
        info!(
            scenarios = scenarios.len(),
            instance_types = templates.len(),
            "simulating"
        );

        let scorer = Scorer::new(self.settings.scoring.weights)
            .with_daemonset_count(state.daemon_sets.len());
        let engine = Engine::new(Arc::new(BestFitDecreasing), scorer)
            .with_max_nodes(simulation.max_nodes);

        let mut recommendations = engine
            .run_all(scenarios, Arc::new(state.clone()), cancel)
            .await
            .context("running simulations")?;
        recommendations.truncate(self.settings.output.top_n);

        let (workload_class, gib_per_vcpu) = match classification {
            Some((class, ratio)) => (Some(class), Some(ratio)),
            None => (None, None),
        };

        Ok(Analysis {
            state,
            workload_class,
            gib_per_vcpu,
            families,
            recommendations,
        })
    }
}
