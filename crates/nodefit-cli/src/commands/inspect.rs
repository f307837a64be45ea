//! The `inspect` command: collect and display the workload profile

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tabled::{settings::Style, Table, Tabled};

use nodefit_core::collector::{save_snapshot, MetricsCollector, PrometheusCollector};
use nodefit_core::model::{ClusterState, WorkloadProfile};
use nodefit_core::pipeline::Pipeline;

use crate::output::{format_bytes, format_cpu, print_info, print_success, OutputFormat};
use crate::InspectArgs;

#[derive(Tabled)]
struct WorkloadRow {
    #[tabled(rename = "Namespace")]
    namespace: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Owner")]
    owner: String,
    #[tabled(rename = "Req CPU")]
    request_cpu: String,
    #[tabled(rename = "Req Mem")]
    request_mem: String,
    #[tabled(rename = "P95 CPU")]
    p95_cpu: String,
    #[tabled(rename = "P95 Mem")]
    p95_mem: String,
    #[tabled(rename = "Eff CPU")]
    effective_cpu: String,
    #[tabled(rename = "Eff Mem")]
    effective_mem: String,
}

pub async fn run(config_path: Option<&Path>, format: OutputFormat, args: InspectArgs) -> Result<()> {
    let mut settings = super::load_settings(config_path)?;

    if let Some(window_hours) = args.window_hours {
        settings.metrics.window_hours = window_hours;
    }
    if let Some(percentile) = args.percentile {
        settings.metrics.percentile = percentile;
    }
    if let Some(url) = args.prometheus_url {
        settings.prometheus.url = url;
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

    // The pipeline only supplies the collect options here; no simulation.
    let pipeline = Pipeline::new(
        collector.clone(),
        Arc::new(nodefit_core::catalog::BuiltinCatalog::new(
            settings.cluster.region.clone(),
        )),
        settings.clone(),
    );
    let mut state = collector
        .collect(&pipeline.collect_options())
        .await
        .context("collecting metrics")?;
    state.cluster_name = settings.cluster.name.clone();
    state.region = settings.cluster.region.clone();
    state.system_reserved = settings.simulation.system_reserved();

    sort_workloads(&mut state, &args.sort_by);

    if let Some(path) = &args.output {
        save_snapshot(&state, path)
            .with_context(|| format!("writing snapshot {}", path.display()))?;
        print_success(&format!("Snapshot written to {}", path.display()));
        return Ok(());
    }

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&state)?);
        }
        OutputFormat::Table => {
            render_workloads(&state);
        }
    }
    Ok(())
}

fn sort_workloads(state: &mut ClusterState, sort_by: &str) {
    let key = |w: &WorkloadProfile| (w.namespace.clone(), w.name.clone());
    match sort_by {
        "memory" => state
            .workloads
            .sort_by(|a, b| b.effective.memory_bytes.cmp(&a.effective.memory_bytes)),
        "name" => state.workloads.sort_by_key(key),
        _ => state
            .workloads
            .sort_by(|a, b| b.effective.cpu_millis.cmp(&a.effective.cpu_millis)),
    }
}

fn render_workloads(state: &ClusterState) {
    let total = state.total_effective();
    print_info(&format!(
        "{} workloads, {} DaemonSets — effective demand {} CPU / {}",
        state.workload_count(),
        state.daemon_sets.len(),
        format_cpu(total.cpu_millis),
        format_bytes(total.memory_bytes),
    ));

    let rows: Vec<WorkloadRow> = state
        .workloads
        .iter()
        .chain(state.daemon_sets.iter())
        .map(|w| WorkloadRow {
            namespace: w.namespace.clone(),
            name: w.name.clone(),
            owner: if w.owner_kind.is_empty() {
                "-".to_string()
            } else {
                w.owner_kind.clone()
            },
            request_cpu: format_cpu(w.requested.cpu_millis),
            request_mem: format_bytes(w.requested.memory_bytes),
            p95_cpu: format!("{:.2}", w.cpu_usage.p95),
            p95_mem: format_bytes(w.memory_usage.p95 as i64),
            effective_cpu: format_cpu(w.effective.cpu_millis),
            effective_mem: format_bytes(w.effective.memory_bytes),
        })
        .collect();

    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{table}");
}
