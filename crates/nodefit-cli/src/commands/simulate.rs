//! The `simulate` command: offline simulation from a saved snapshot

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use nodefit_core::catalog::BuiltinCatalog;
use nodefit_core::collector::{MetricsCollector, SnapshotCollector};
use nodefit_core::config::Strategy;
use nodefit_core::pipeline::Pipeline;
use nodefit_core::simulation::CancelFlag;

use crate::output::{self, OutputFormat};
use crate::SimulateArgs;

pub async fn run(
    config_path: Option<&Path>,
    format: OutputFormat,
    args: SimulateArgs,
    cancel: CancelFlag,
) -> Result<()> {
    let mut settings = super::load_settings(config_path)?;

    if !args.families.is_empty() {
        settings.instances.families = args.families;
    }
    if let Some(strategy) = args.strategy.as_deref() {
        settings.simulation.strategy = strategy.parse::<Strategy>()?;
    }
    if let Some(spot_ratio) = args.spot_ratio {
        settings.simulation.spot_ratio = spot_ratio;
    }
    if let Some(min_nodes) = args.min_nodes {
        settings.simulation.min_nodes = min_nodes;
    }
    if let Some(top) = args.top {
        settings.output.top_n = top;
    }
    settings.validate()?;

    let collector = SnapshotCollector::from_path(&args.input);
    let pipeline = Pipeline::new(
        Arc::new(SnapshotCollector::from_path(&args.input)),
        Arc::new(BuiltinCatalog::new(settings.cluster.region.clone())),
        settings.clone(),
    );

    let state = collector
        .collect(&pipeline.collect_options())
        .await
        .with_context(|| format!("loading snapshot {}", args.input.display()))?;

    let analysis = pipeline.simulate(state, cancel).await?;
    output::render_analysis(&analysis, &settings, format)
}
