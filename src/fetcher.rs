//! Raw price feeds
//!
//! Two public feeds are consumed:
//! - the metered-unit price map per service (`ecs`, `lambda`), keyed by region display name
//!   and then by price item name ("perCPU per hour", "Lambda Requests", ...)
//! - the Fargate Spot price snapshot, a flat list of unit prices across all regions
//!
//! Prices stay strings here. They are parsed into exact decimals when the calculators
//! shape them into price tables.

use crate::config::PricingConfig;
use crate::error::{PricingError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info};

/// Price items for one region, keyed by item name
pub type RegionPrices = HashMap<String, RawPriceItem>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawPriceItem {
    pub price: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Metered-unit price map for one service
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawPriceTable {
    pub regions: HashMap<String, RegionPrices>,
}

impl RawPriceTable {
    /// Price items for a region display name
    pub fn region(&self, region_name: &str) -> Result<&RegionPrices> {
        self.regions
            .get(region_name)
            .ok_or_else(|| PricingError::UnknownRegion(region_name.to_string()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotPriceEntry {
    pub attributes: SpotAttributes,
    pub unit: String,
    pub price: SpotPrice,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotAttributes {
    #[serde(rename = "aws:region", alias = "region")]
    pub region: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotPrice {
    #[serde(rename = "USD")]
    pub usd: String,
}

/// Spot prices across all regions at the time of the fetch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotPriceSnapshot {
    pub prices: Vec<SpotPriceEntry>,
    #[serde(skip, default = "Utc::now")]
    pub fetched_at: DateTime<Utc>,
}

impl SpotPriceSnapshot {
    /// First entry for `region_code` priced in `unit`
    pub fn find(&self, region_code: &str, unit: &str) -> Option<&SpotPriceEntry> {
        self.prices
            .iter()
            .find(|entry| entry.attributes.region == region_code && entry.unit == unit)
    }
}

/// Fetches the metered-unit price map of a service
#[async_trait]
pub trait PriceTableFetcher: Send + Sync {
    async fn fetch(&self, service_name: &str) -> Result<RawPriceTable>;
}

/// Fetches the Fargate Spot price snapshot
#[async_trait]
pub trait SpotPriceFetcher: Send + Sync {
    async fn fetch(&self) -> Result<SpotPriceSnapshot>;
}

fn build_http_client(pricing: &PricingConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(pricing.request_timeout_secs))
        .build()
        .map_err(|e| PricingError::upstream("http", "Failed to build HTTP client", e))
}

async fn get_json<T: DeserializeOwned>(
    client: &reqwest::Client,
    source_name: &str,
    url: &str,
) -> Result<T> {
    debug!("GET {}", url);
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| PricingError::upstream(source_name, format!("GET {} failed", url), e))?
        .error_for_status()
        .map_err(|e| PricingError::upstream(source_name, format!("GET {} returned an error status", url), e))?;

    response
        .json::<T>()
        .await
        .map_err(|e| PricingError::upstream(source_name, format!("Invalid JSON from {}", url), e))
}

/// Price table fetcher over the public metered-unit price maps
pub struct HttpPriceTableFetcher {
    client: reqwest::Client,
    pricing: PricingConfig,
}

impl HttpPriceTableFetcher {
    pub fn new(pricing: &PricingConfig) -> Result<Self> {
        Ok(Self {
            client: build_http_client(pricing)?,
            pricing: pricing.clone(),
        })
    }
}

#[async_trait]
impl PriceTableFetcher for HttpPriceTableFetcher {
    async fn fetch(&self, service_name: &str) -> Result<RawPriceTable> {
        let url = self.pricing.service_price_url(service_name);
        info!("Fetching {} price list", service_name);
        let table: RawPriceTable = get_json(&self.client, "price-list", &url).await?;
        info!(
            "Fetched {} price list ({} regions)",
            service_name,
            table.regions.len()
        );
        Ok(table)
    }
}

/// Spot price fetcher over the public Fargate Spot snapshot
pub struct HttpSpotPriceFetcher {
    client: reqwest::Client,
    url: String,
}

impl HttpSpotPriceFetcher {
    pub fn new(pricing: &PricingConfig) -> Result<Self> {
        Ok(Self {
            client: build_http_client(pricing)?,
            url: pricing.spot_price_url.clone(),
        })
    }
}

#[async_trait]
impl SpotPriceFetcher for HttpSpotPriceFetcher {
    async fn fetch(&self) -> Result<SpotPriceSnapshot> {
        info!("Fetching Fargate Spot prices");
        let snapshot: SpotPriceSnapshot = get_json(&self.client, "spot-prices", &self.url).await?;
        info!("Fetched {} spot price entries", snapshot.prices.len());
        Ok(snapshot)
    }
}
