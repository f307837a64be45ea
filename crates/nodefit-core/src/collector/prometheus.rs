//! Prometheus collector
//!
//! Queries the Prometheus HTTP API for cAdvisor usage series and
//! kube-state-metrics requests/limits/ownership, then derives sized
//! workload profiles. Works against plain Prometheus as well as
//! Thanos/Cortex-compatible endpoints.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use tracing::{debug, info};
use url::Url;

use super::{CollectOptions, MetricsCollector};
use crate::error::CollectError;
use crate::model::{AggregateMetrics, ClusterState, PercentileValues, ResourceQuantity, WorkloadProfile};
use crate::sizing;

/// Collector backed by the Prometheus query API.
#[derive(Debug)]
pub struct PrometheusCollector {
    client: reqwest::Client,
    base_url: Url,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    status: String,
    #[serde(default)]
    data: QueryData,
}

#[derive(Debug, Default, Deserialize)]
struct QueryData {
    #[serde(default)]
    result: Vec<Sample>,
}

#[derive(Debug, Deserialize)]
struct Sample {
    metric: HashMap<String, String>,
    /// Prometheus instant vectors carry `[timestamp, "value"]`.
    value: (f64, String),
}

impl Sample {
    fn value(&self) -> f64 {
        self.value.1.parse().unwrap_or(0.0)
    }
}

/// (namespace, pod) identity of a sample.
type PodKey = (String, String);

impl PrometheusCollector {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, CollectError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| CollectError::Unreachable(err.to_string()))?;
        let base_url = Url::parse(endpoint)
            .map_err(|err| CollectError::Unreachable(format!("invalid endpoint: {err}")))?;
        Ok(Self { client, base_url })
    }

    async fn query(&self, promql: &str) -> Result<Vec<Sample>, CollectError> {
        let url = self
            .base_url
            .join("api/v1/query")
            .map_err(|err| CollectError::Query(err.to_string()))?;

        let response = self
            .client
            .get(url)
            .query(&[("query", promql)])
            .send()
            .await
            .map_err(|err| CollectError::Unreachable(err.to_string()))?;

        if !response.status().is_success() {
            return Err(CollectError::Query(format!(
                "prometheus returned {}",
                response.status()
            )));
        }

        let parsed: QueryResponse = response
            .json()
            .await
            .map_err(|err| CollectError::Query(err.to_string()))?;
        if parsed.status != "success" {
            return Err(CollectError::Query(format!(
                "query status {}",
                parsed.status
            )));
        }
        Ok(parsed.data.result)
    }

    /// Runs a query and maps results by (namespace, pod).
    async fn query_by_pod(&self, promql: &str) -> Result<HashMap<PodKey, f64>, CollectError> {
        let samples = self.query(promql).await?;
        Ok(samples
            .iter()
            .filter_map(|s| {
                let namespace = s.metric.get("namespace")?.clone();
                let pod = s.metric.get("pod")?.clone();
                Some(((namespace, pod), s.value()))
            })
            .collect())
    }

    /// Runs a query expected to yield a single scalar-like sample.
    async fn query_scalar(&self, promql: &str) -> Result<Option<f64>, CollectError> {
        let samples = self.query(promql).await?;
        Ok(samples.first().map(Sample::value))
    }
}

#[async_trait]
impl MetricsCollector for PrometheusCollector {
    async fn collect(&self, opts: &CollectOptions) -> Result<ClusterState, CollectError> {
        let window = format!("{}s", opts.window.duration_secs().max(1));
        let step = format!("{}s", opts.window.step_secs.max(1));
        let percentile = if opts.percentile > 0.0 {
            opts.percentile
        } else {
            0.95
        };

        let cpu_p50 = self.query_by_pod(&cpu_percentile_query(0.50, &window, &step)).await?;
        let cpu_p95 = self.query_by_pod(&cpu_percentile_query(0.95, &window, &step)).await?;
        let cpu_p99 = self.query_by_pod(&cpu_percentile_query(0.99, &window, &step)).await?;
        let cpu_max = self.query_by_pod(&cpu_percentile_query(1.0, &window, &step)).await?;
        let mem_p50 = self.query_by_pod(&memory_percentile_query(0.50, &window, &step)).await?;
        let mem_p95 = self.query_by_pod(&memory_percentile_query(0.95, &window, &step)).await?;
        let mem_p99 = self.query_by_pod(&memory_percentile_query(0.99, &window, &step)).await?;
        let mem_max = self.query_by_pod(&memory_percentile_query(1.0, &window, &step)).await?;
        let cpu_requests = self.query_by_pod(&requests_query("cpu")).await?;
        let mem_requests = self.query_by_pod(&requests_query("memory")).await?;
        let cpu_limits = self.query_by_pod(&limits_query("cpu")).await?;
        let mem_limits = self.query_by_pod(&limits_query("memory")).await?;
        let owners = self.query(owner_query()).await?;

        let mut owner_by_pod: HashMap<PodKey, (String, String)> = HashMap::new();
        for sample in &owners {
            let (Some(namespace), Some(pod)) =
                (sample.metric.get("namespace"), sample.metric.get("pod"))
            else {
                continue;
            };
            let kind = sample.metric.get("owner_kind").cloned().unwrap_or_default();
            let name = sample.metric.get("owner_name").cloned().unwrap_or_default();
            owner_by_pod.insert((namespace.clone(), pod.clone()), (kind, name));
        }

        // Every pod seen by any of the usage or request queries.
        let mut pods: HashSet<PodKey> = HashSet::new();
        pods.extend(cpu_p95.keys().cloned());
        pods.extend(mem_p95.keys().cloned());
        pods.extend(cpu_requests.keys().cloned());

        let mut pod_keys: Vec<PodKey> = pods
            .into_iter()
            .filter(|(namespace, _)| {
                if opts.exclude_namespaces.iter().any(|ns| ns == namespace) {
                    return false;
                }
                opts.namespaces.is_empty() || opts.namespaces.iter().any(|ns| ns == namespace)
            })
            .collect();
        pod_keys.sort();

        let lookup = |map: &HashMap<PodKey, f64>, key: &PodKey| map.get(key).copied().unwrap_or(0.0);

        let profiles: Vec<WorkloadProfile> = pod_keys
            .into_iter()
            .map(|key| {
                let (owner_kind, owner_name) =
                    owner_by_pod.get(&key).cloned().unwrap_or_default();
                let (namespace, name) = key.clone();
                WorkloadProfile {
                    namespace,
                    name,
                    owner_kind,
                    owner_name,
                    requested: ResourceQuantity::new(
                        (lookup(&cpu_requests, &key) * 1000.0) as i64,
                        lookup(&mem_requests, &key) as i64,
                    ),
                    limits: ResourceQuantity::new(
                        (lookup(&cpu_limits, &key) * 1000.0) as i64,
                        lookup(&mem_limits, &key) as i64,
                    ),
                    cpu_usage: PercentileValues {
                        p50: lookup(&cpu_p50, &key),
                        p95: lookup(&cpu_p95, &key),
                        p99: lookup(&cpu_p99, &key),
                        max: lookup(&cpu_max, &key),
                    },
                    memory_usage: PercentileValues {
                        p50: lookup(&mem_p50, &key),
                        p95: lookup(&mem_p95, &key),
                        p99: lookup(&mem_p99, &key),
                        max: lookup(&mem_max, &key),
                    },
                    ..Default::default()
                }
            })
            .collect();

        if profiles.is_empty() {
            return Err(CollectError::NoMetrics);
        }

        let (workloads, daemon_sets) = sizing::size_and_partition(profiles, percentile);

        let aggregate_metrics = self.collect_aggregates(&window, &step).await?;

        info!(
            workloads = workloads.len(),
            daemon_sets = daemon_sets.len(),
            "collected cluster state"
        );

        Ok(ClusterState {
            collected_at: Utc::now(),
            metrics_window: opts.window,
            workloads,
            daemon_sets,
            system_reserved: ResourceQuantity::default(),
            aggregate_metrics,
            cluster_name: String::new(),
            region: String::new(),
        })
    }

    async fn ping(&self) -> Result<(), CollectError> {
        self.query("up").await.map(|_| ())
    }

    fn backend_type(&self) -> &str {
        "prometheus"
    }
}

impl PrometheusCollector {
    /// Cluster-wide P95 usage and node-count range over the window.
    /// Absent series (e.g. no kube-state-metrics) yield `None` rather than
    /// an error; scaling efficiency is then simply not scored.
    async fn collect_aggregates(
        &self,
        window: &str,
        step: &str,
    ) -> Result<Option<AggregateMetrics>, CollectError> {
        let p95_cpu_cores = self
            .query_scalar(&cluster_cpu_p95_query(window, step))
            .await?
            .unwrap_or(0.0);
        let p95_memory_bytes = self
            .query_scalar(&cluster_memory_p95_query(window, step))
            .await?
            .unwrap_or(0.0);
        let min_nodes = self
            .query_scalar(&node_count_query("min_over_time", window, step))
            .await?
            .unwrap_or(0.0);
        let max_nodes = self
            .query_scalar(&node_count_query("max_over_time", window, step))
            .await?
            .unwrap_or(0.0);

        if max_nodes <= 0.0 {
            debug!("no node-count series; skipping aggregate metrics");
            return Ok(None);
        }

        Ok(Some(AggregateMetrics {
            p95_cpu_cores,
            p95_memory_bytes,
            min_node_count: min_nodes as u32,
            max_node_count: max_nodes as u32,
        }))
    }
}

// PromQL builders. Designed for standard cAdvisor metrics
// (container_cpu_usage_seconds_total, container_memory_working_set_bytes)
// plus kube-state-metrics (kube_pod_container_resource_*, kube_pod_owner).

fn cpu_percentile_query(percentile: f64, window: &str, step: &str) -> String {
    format!(
        "quantile_over_time({percentile}, sum by (namespace, pod) (\
rate(container_cpu_usage_seconds_total{{container!=\"\",container!=\"POD\",image!=\"\"}}[5m])\
)[{window}:{step}])"
    )
}

fn memory_percentile_query(percentile: f64, window: &str, step: &str) -> String {
    format!(
        "quantile_over_time({percentile}, sum by (namespace, pod) (\
container_memory_working_set_bytes{{container!=\"\",container!=\"POD\",image!=\"\"}}\
)[{window}:{step}])"
    )
}

fn requests_query(resource: &str) -> String {
    format!(
        "sum by (namespace, pod) (kube_pod_container_resource_requests{{resource=\"{resource}\"}})"
    )
}

fn limits_query(resource: &str) -> String {
    format!(
        "sum by (namespace, pod) (kube_pod_container_resource_limits{{resource=\"{resource}\"}})"
    )
}

fn owner_query() -> &'static str {
    "kube_pod_owner{}"
}

fn cluster_cpu_p95_query(window: &str, step: &str) -> String {
    format!(
        "quantile_over_time(0.95, sum(\
rate(container_cpu_usage_seconds_total{{container!=\"\",container!=\"POD\",image!=\"\"}}[5m])\
)[{window}:{step}])"
    )
}

fn cluster_memory_p95_query(window: &str, step: &str) -> String {
    format!(
        "quantile_over_time(0.95, sum(\
container_memory_working_set_bytes{{container!=\"\",container!=\"POD\",image!=\"\"}}\
)[{window}:{step}])"
    )
}

fn node_count_query(range_fn: &str, window: &str, step: &str) -> String {
    format!("{range_fn}(count(kube_node_info)[{window}:{step}])")
}
