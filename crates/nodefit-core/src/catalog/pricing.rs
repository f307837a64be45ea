//! Spot-price enrichment

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use super::FileCache;
use crate::error::CatalogError;
use crate::model::NodeTemplate;

/// Cached spot prices stay valid for a day; spot markets move slowly
/// relative to capacity-planning horizons.
const SPOT_PRICE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Source of current spot prices per instance type.
#[async_trait]
pub trait PricingSource: Send + Sync {
    /// Hourly spot price per instance type for the region.
    async fn spot_prices(&self, region: &str) -> Result<HashMap<String, f64>, CatalogError>;
}

#[derive(Debug, Serialize, Deserialize)]
struct SpotPriceEntry {
    instance_type: String,
    price_per_hour: f64,
}

#[derive(Debug, Serialize, Deserialize)]
struct SpotPriceDocument {
    prices: Vec<SpotPriceEntry>,
}

/// Fetches spot prices from a JSON endpoint
/// (`GET {base}/spot-prices?region=...`).
pub struct HttpPricingSource {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpPricingSource {
    pub fn new(base_url: &str) -> Result<Self, CatalogError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|err| CatalogError::Pricing(err.to_string()))?;
        let base_url = Url::parse(base_url)
            .map_err(|err| CatalogError::Pricing(format!("invalid pricing URL: {err}")))?;
        Ok(Self { client, base_url })
    }
}

#[async_trait]
impl PricingSource for HttpPricingSource {
    async fn spot_prices(&self, region: &str) -> Result<HashMap<String, f64>, CatalogError> {
        let url = self
            .base_url
            .join("spot-prices")
            .map_err(|err| CatalogError::Pricing(err.to_string()))?;

        let response = self
            .client
            .get(url)
            .query(&[("region", region)])
            .send()
            .await
            .map_err(|err| CatalogError::Pricing(err.to_string()))?;

        if !response.status().is_success() {
            return Err(CatalogError::Pricing(format!(
                "pricing endpoint returned {}",
                response.status()
            )));
        }

        let document: SpotPriceDocument = response
            .json()
            .await
            .map_err(|err| CatalogError::Pricing(err.to_string()))?;

        Ok(document
            .prices
            .into_iter()
            .map(|e| (e.instance_type, e.price_per_hour))
            .collect())
    }
}

/// Fills `spot_price_per_hour` on every template with a known price and
/// returns how many were enriched. Prices come from the cache when fresh;
/// types without a price keep 0.0 and fall back to on-demand pricing.
pub async fn enrich_spot_prices(
    templates: &mut [NodeTemplate],
    source: &dyn PricingSource,
    cache: Option<&FileCache>,
) -> Result<usize, CatalogError> {
    let region = templates
        .first()
        .map(|t| t.region.clone())
        .unwrap_or_default();
    let cache_key = format!("spot-prices-{region}");

    let prices: HashMap<String, f64> = match cache
        .and_then(|c| c.get::<HashMap<String, f64>>(&cache_key, SPOT_PRICE_TTL))
    {
        Some(cached) => {
            debug!(region, "using cached spot prices");
            cached
        }
        None => {
            let fetched = source.spot_prices(&region).await?;
            if let Some(cache) = cache {
                if let Err(err) = cache.set(&cache_key, &fetched) {
                    warn!(error = %err, "failed to cache spot prices");
                }
            }
            fetched
        }
    };

    let mut enriched = 0;
    for template in templates.iter_mut() {
        if let Some(&price) = prices.get(&template.instance_type) {
            template.spot_price_per_hour = price;
            enriched += 1;
        }
    }
    Ok(enriched)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Architecture, CapacityType};

    struct StaticPricing(HashMap<String, f64>);

    #[async_trait]
    impl PricingSource for StaticPricing {
        async fn spot_prices(&self, _region: &str) -> Result<HashMap<String, f64>, CatalogError> {
            Ok(self.0.clone())
        }
    }

    struct FailingPricing;

    #[async_trait]
    impl PricingSource for FailingPricing {
        async fn spot_prices(&self, _region: &str) -> Result<HashMap<String, f64>, CatalogError> {
            Err(CatalogError::Pricing("endpoint down".to_string()))
        }
    }

    fn template(instance_type: &str) -> NodeTemplate {
        NodeTemplate {
            instance_type: instance_type.to_string(),
            instance_family: "m6i".to_string(),
            generation: 6,
            size: "large".to_string(),
            architecture: Architecture::Amd64,
            vcpus: 2,
            memory_mib: 8192,
            allocatable_cpu_millis: 1930,
            allocatable_memory_bytes: 6 * 1024 * 1024 * 1024,
            max_pods: 29,
            on_demand_price_per_hour: 0.096,
            spot_price_per_hour: 0.0,
            capacity_type: CapacityType::OnDemand,
            current_generation: true,
            region: "us-east-1".to_string(),
        }
    }

    #[tokio::test]
    async fn test_enrich_sets_known_prices() {
        let mut templates = vec![template("m6i.large"), template("m6i.xlarge")];
        let source = StaticPricing(HashMap::from([("m6i.large".to_string(), 0.031)]));

        let enriched = enrich_spot_prices(&mut templates, &source, None)
            .await
            .unwrap();
        assert_eq!(enriched, 1);
        assert_eq!(templates[0].spot_price_per_hour, 0.031);
        assert_eq!(templates[1].spot_price_per_hour, 0.0);
    }

    #[tokio::test]
    async fn test_enrich_uses_cache() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::new(dir.path());
        cache
            .set(
                "spot-prices-us-east-1",
                &HashMap::from([("m6i.large".to_string(), 0.029)]),
            )
            .unwrap();

        // A failing source proves the cached value is used.
        let mut templates = vec![template("m6i.large")];
        let enriched = enrich_spot_prices(&mut templates, &FailingPricing, Some(&cache))
            .await
            .unwrap();
        assert_eq!(enriched, 1);
        assert_eq!(templates[0].spot_price_per_hour, 0.029);
    }

    #[tokio::test]
    async fn test_enrich_propagates_source_failure() {
        let mut templates = vec![template("m6i.large")];
        let err = enrich_spot_prices(&mut templates, &FailingPricing, None)
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::Pricing(_)));
    }
}
