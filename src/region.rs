//! Region directory: short region codes to the display names used by the price lists
//!
//! The metered-unit price maps are keyed by region display name
//! ("US East (N. Virginia)"), while callers speak in region codes ("us-east-1").
//! AWS publishes the mapping as public SSM parameters under
//! `/aws/service/global-infrastructure/regions`.

use crate::config::AwsConfig;
use crate::error::{PricingError, Result};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_ssm::Client as SsmClient;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, info};

const REGIONS_PARAMETER_PATH: &str = "/aws/service/global-infrastructure/regions";

/// A region code with its display name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub code: String,
    pub name: String,
}

/// Resolves region codes to price-list region names
#[async_trait]
pub trait RegionDirectory: Send + Sync {
    /// Display name for `region_code`, exactly as it appears in the price lists
    async fn resolve(&self, region_code: &str) -> Result<String>;

    /// All known regions, sorted by display name
    async fn list_regions(&self) -> Result<Vec<Region>>;
}

/// Region directory backed by the public SSM global-infrastructure parameters
pub struct SsmRegionDirectory {
    client: SsmClient,
}

impl SsmRegionDirectory {
    pub fn new(client: SsmClient) -> Self {
        Self { client }
    }

    /// Build an SSM client for the configured lookup region
    pub async fn from_config(aws: &AwsConfig) -> Self {
        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(aws_sdk_ssm::config::Region::new(aws.ssm_region.clone()))
            .load()
            .await;
        Self::new(SsmClient::new(&sdk_config))
    }

    async fn fetch_region_codes(&self) -> Result<BTreeSet<String>> {
        let mut codes = BTreeSet::new();
        let mut pages = self
            .client
            .get_parameters_by_path()
            .path(REGIONS_PARAMETER_PATH)
            .into_paginator()
            .send();

        while let Some(page) = pages.next().await {
            let page = page
                .map_err(|e| PricingError::upstream("ssm", "Failed to list region codes", e))?;
            codes.extend(page.parameters().iter().filter_map(|p| p.value().map(str::to_string)));
        }

        debug!("SSM returned {} region codes", codes.len());
        Ok(codes)
    }
}

#[async_trait]
impl RegionDirectory for SsmRegionDirectory {
    async fn resolve(&self, region_code: &str) -> Result<String> {
        let parameter_name = format!("{}/{}/longName", REGIONS_PARAMETER_PATH, region_code);
        let response = self
            .client
            .get_parameters()
            .names(&parameter_name)
            .send()
            .await
            .map_err(|e| {
                PricingError::upstream("ssm", format!("Failed to read {}", parameter_name), e)
            })?;

        response
            .parameters()
            .first()
            .and_then(|p| p.value())
            .map(str::to_string)
            .ok_or_else(|| PricingError::UnknownRegion(region_code.to_string()))
    }

    async fn list_regions(&self) -> Result<Vec<Region>> {
        let codes = self.fetch_region_codes().await?;
        info!("Resolving display names for {} regions", codes.len());

        let mut regions = Vec::with_capacity(codes.len());
        for code in codes {
            let name = self.resolve(&code).await?;
            regions.push(Region { code, name });
        }
        regions.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(regions)
    }
}

/// Fixed in-memory region directory
#[derive(Debug, Clone, Default)]
pub struct StaticRegionDirectory {
    names: HashMap<String, String>,
}

impl StaticRegionDirectory {
    pub fn new<I, C, N>(regions: I) -> Self
    where
        I: IntoIterator<Item = (C, N)>,
        C: Into<String>,
        N: Into<String>,
    {
        Self {
            names: regions
                .into_iter()
                .map(|(code, name)| (code.into(), name.into()))
                .collect(),
        }
    }
}

#[async_trait]
impl RegionDirectory for StaticRegionDirectory {
    async fn resolve(&self, region_code: &str) -> Result<String> {
        self.names
            .get(region_code)
            .cloned()
            .ok_or_else(|| PricingError::UnknownRegion(region_code.to_string()))
    }

    async fn list_regions(&self) -> Result<Vec<Region>> {
        let mut regions: Vec<Region> = self
            .names
            .iter()
            .map(|(code, name)| Region {
                code: code.clone(),
                name: name.clone(),
            })
            .collect();
        regions.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(regions)
    }
}
