//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
use nodefit_core::model::{CapacityType, Recommendation};
use nodefit_core::pipeline::Analysis;
use nodefit_core::config::Settings;
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Format bytes as human-readable string
pub fn format_bytes(bytes: i64) -> String {
    const KB: i64 = 1024;
    const MB: i64 = KB * 1024;
    const GB: i64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2}Gi", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2}Mi", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2}Ki", bytes as f64 / KB as f64)
    } else {
        format!("{bytes}B")
    }
}

/// Format millicores as human-readable string
pub fn format_cpu(millicores: i64) -> String {
    if millicores >= 1000 {
        format!("{:.1}", millicores as f64 / 1000.0)
    } else {
        format!("{millicores}m")
    }
}

/// Format a utilisation fraction as a percentage
pub fn format_percent(fraction: f64) -> String {
    format!("{:.1}%", fraction * 100.0)
}

/// Row for the recommendations table
#[derive(Tabled)]
struct RecommendationRow {
    #[tabled(rename = "Rank")]
    rank: usize,
    #[tabled(rename = "Configuration")]
    configuration: String,
    #[tabled(rename = "Nodes")]
    nodes: usize,
    #[tabled(rename = "CPU")]
    cpu: String,
    #[tabled(rename = "Memory")]
    memory: String,
    #[tabled(rename = "Score")]
    score: String,
    #[tabled(rename = "$/month")]
    monthly_cost: String,
    #[tabled(rename = "Notes")]
    notes: String,
}

fn truncate_label(label: &str) -> String {
    if label.len() > 34 {
        format!("{}...", &label[..31])
    } else {
        label.to_string()
    }
}

fn notes_for(rec: &Recommendation) -> String {
    let mut notes = Vec::new();
    if rec.cost_vs_baseline_pct < 0.0 {
        notes.push(format!("{:.1}% savings", -rec.cost_vs_baseline_pct));
    }
    if !rec.result.unschedulable.is_empty() {
        notes.push(format!("{} unschedulable", rec.result.unschedulable.len()));
    }
    let spot_nodes = rec
        .result
        .nodes
        .iter()
        .filter(|n| n.template.capacity_type == CapacityType::Spot)
        .count();
    if spot_nodes > 0 {
        notes.push(format!("{spot_nodes} spot"));
    }
    notes.join(", ")
}

/// Render a full analysis in the requested format.
pub fn render_analysis(
    analysis: &Analysis,
    settings: &Settings,
    format: OutputFormat,
) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&analysis.recommendations)?);
            Ok(())
        }
        OutputFormat::Table => {
            render_table(analysis, settings);
            Ok(())
        }
    }
}

fn render_table(analysis: &Analysis, settings: &Settings) {
    let state = &analysis.state;

    println!();
    println!("{}", "Instance Recommendations".bold());
    if !state.cluster_name.is_empty() {
        println!("Cluster:     {}", state.cluster_name);
    }
    if !state.region.is_empty() {
        println!("Region:      {}", state.region);
    }
    println!(
        "Pods:        {} (+ {} DaemonSets)",
        state.workload_count(),
        state.daemon_sets.len()
    );
    println!("Percentile:  p{:.0}", settings.metrics.percentile * 100.0);
    println!(
        "Window:      {} to {}",
        state.metrics_window.start.format("%Y-%m-%d"),
        state.metrics_window.end.format("%Y-%m-%d")
    );
    if let (Some(class), Some(ratio)) = (analysis.workload_class, analysis.gib_per_vcpu) {
        println!(
            "Profile:     {} ({:.1} GiB/vCPU) → families {}",
            class,
            ratio,
            analysis.families.join(", ")
        );
    }
    println!();

    if analysis.recommendations.is_empty() {
        print_warning("No recommendations available");
        return;
    }

    let rows: Vec<RecommendationRow> = analysis
        .recommendations
        .iter()
        .map(|rec| RecommendationRow {
            rank: rec.rank,
            configuration: truncate_label(&rec.result.scenario.label()),
            nodes: rec.result.total_nodes,
            cpu: format_percent(rec.result.avg_cpu_utilization),
            memory: format_percent(rec.result.avg_mem_utilization),
            score: format!("{:.1}", rec.overall_score),
            monthly_cost: format!("{:.0}", rec.monthly_cost),
            notes: notes_for(rec),
        })
        .collect();

    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{table}");

    // Top pick detail
    let top = &analysis.recommendations[0];
    println!();
    print_success(&format!("Recommended: {}", top.result.scenario.label()));
    println!("  Nodes:          {}", top.result.total_nodes);
    println!("  Monthly cost:   ${:.0}", top.monthly_cost);
    println!("  CPU util:       {}", format_percent(top.result.avg_cpu_utilization));
    println!("  Memory util:    {}", format_percent(top.result.avg_mem_utilization));
    println!(
        "  Balance score:  {:.2}",
        top.result.fragmentation.resource_balance_score
    );
    if top.annual_savings > 0.0 {
        println!("  Annual savings: ${:.0}", top.annual_savings);
    }

    if !top.warnings.is_empty() {
        println!();
        for warning in &top.warnings {
            print_warning(warning);
        }
    }
    println!();
}
