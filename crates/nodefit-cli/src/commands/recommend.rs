//! The `recommend` command: live collection plus simulation

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use nodefit_core::catalog::BuiltinCatalog;
use nodefit_core::collector::{MetricsCollector, PrometheusCollector};
use nodefit_core::config::Strategy;
use nodefit_core::pipeline::Pipeline;
use nodefit_core::simulation::CancelFlag;

use crate::output::{self, OutputFormat};
use crate::RecommendArgs;

pub async fn run(
    config_path: Option<&Path>,
    format: OutputFormat,
    args: RecommendArgs,
    cancel: CancelFlag,
) -> Result<()> {
    let mut settings = super::load_settings(config_path)?;

    if let Some(window_hours) = args.window_hours {
        settings.metrics.window_hours = window_hours;
    }
    if let Some(percentile) = args.percentile {
        settings.metrics.percentile = percentile;
    }
    if !args.families.is_empty() {
        settings.instances.families = args.families;
    }
    if let Some(spot_ratio) = args.spot_ratio {
        settings.simulation.spot_ratio = spot_ratio;
    }
    if let Some(strategy) = args.strategy.as_deref() {
        settings.simulation.strategy = strategy.parse::<Strategy>()?;
    }
    if let Some(min_nodes) = args.min_nodes {
        settings.simulation.min_nodes = min_nodes;
    }
    if let Some(max_nodes) = args.max_nodes {
        settings.simulation.max_nodes = max_nodes;
    }
    if let Some(top) = args.top {
        settings.output.top_n = top;
    }
    if let Some(url) = args.prometheus_url {
        settings.prometheus.url = url;
    }
    if args.no_cache {
        settings.cache.enabled = false;
    }
    settings.validate()?;

    let collector = Arc::new(PrometheusCollector::new(
        &settings.prometheus.url,
        Duration::from_secs(settings.prometheus.timeout_secs),
    )?);
    collector
        .ping()
        .await
        .with_context(|| format!("metrics backend at {}", settings.prometheus.url))?;

    let provider = Arc::new(BuiltinCatalog::new(settings.cluster.region.clone()));
    let pipeline = Pipeline::new(collector, provider, settings.clone());

    let analysis = pipeline.recommend(cancel).await?;
    output::render_analysis(&analysis, &settings, format)
}
