//! Shared fixtures for integration tests
//!
//! Price data mirrors the shape of the public feeds with round-ish prices so expected
//! costs can be written down exactly.

#![allow(dead_code)]

use async_trait::async_trait;
use serverless_cost::fetcher::{
    PriceTableFetcher, RawPriceTable, RegionPrices, SpotPriceFetcher, SpotPriceSnapshot,
};
use serverless_cost::region::StaticRegionDirectory;
use serverless_cost::{FargatePriceCalculator, LambdaPriceCalculator, PricingError, Result};
use std::collections::HashMap;

pub const REGION_CODE: &str = "us-east-1";
pub const REGION_NAME: &str = "US East (N. Virginia)";

pub const ECS_PRICES_JSON: &str = r#"{
    "manifest": {"serviceId": "ecs", "currencyCode": "USD"},
    "regions": {
        "US East (N. Virginia)": {
            "perCPU per hour": {"price": "0.04048", "rateCode": "R1"},
            "perGB per hour": {"price": "0.004445", "rateCode": "R2"},
            "ARM perCPU per hour": {"price": "0.03238", "rateCode": "R3"},
            "ARM perGB per hour": {"price": "0.00356", "rateCode": "R4"},
            "perCPU per hour Windows": {"price": "0.09148", "rateCode": "R5"},
            "perGB per hour Windows": {"price": "0.01005", "rateCode": "R6"},
            "perCPU OS License Fee per hour Windows": {"price": "0.046", "rateCode": "R7"},
            "Storage per GB-Hours": {"price": "0.000111", "rateCode": "R8"}
        },
        "EU (Ireland)": {
            "perCPU per hour": {"price": "0.04456"}
        }
    }
}"#;

pub const SPOT_PRICES_JSON: &str = r#"{
    "prices": [
        {"price": {"USD": "0.013"}, "unit": "vCPU-Hours", "attributes": {"aws:region": "eu-west-1"}},
        {"price": {"USD": "0.01291653"}, "unit": "vCPU-Hours", "attributes": {"aws:region": "us-east-1"}},
        {"price": {"USD": "0.00141739"}, "unit": "GB-Hours", "attributes": {"aws:region": "us-east-1"}},
        {"price": {"USD": "0.99"}, "unit": "GB-Hours", "attributes": {"aws:region": "us-east-1"}}
    ]
}"#;

pub const LAMBDA_PRICES_JSON: &str = r#"{
    "regions": {
        "US East (N. Virginia)": {
            "Lambda Duration": {"price": "0.0000166667"},
            "Lambda Duration-Provisioned": {"price": "0.0000097222"},
            "Lambda Provisioned-Concurrency": {"price": "0.0000041667"},
            "Lambda Requests": {"price": "0.0000002"},
            "Lambda Duration-ARM": {"price": "0.0000133334"},
            "Lambda Duration-Provisioned-ARM": {"price": "0.0000077778"},
            "Lambda Provisioned-Concurrency-ARM": {"price": "0.0000033334"},
            "Lambda Requests-ARM": {"price": "0.0000002"},
            "Lambda Edge-Duration": {"price": "0.00005001"},
            "Lambda Edge-Requests": {"price": "0.0000006"}
        }
    }
}"#;

pub fn ecs_table() -> RawPriceTable {
    serde_json::from_str(ECS_PRICES_JSON).unwrap()
}

pub fn lambda_table() -> RawPriceTable {
    serde_json::from_str(LAMBDA_PRICES_JSON).unwrap()
}

pub fn spot_snapshot() -> SpotPriceSnapshot {
    serde_json::from_str(SPOT_PRICES_JSON).unwrap()
}

pub fn ecs_items() -> RegionPrices {
    ecs_table().region(REGION_NAME).unwrap().clone()
}

pub fn lambda_items() -> RegionPrices {
    lambda_table().region(REGION_NAME).unwrap().clone()
}

/// Lambda items for a region without Graviton prices
pub fn lambda_items_without_arm() -> RegionPrices {
    lambda_items()
        .into_iter()
        .filter(|(name, _)| !name.ends_with("-ARM"))
        .collect()
}

pub fn regions() -> StaticRegionDirectory {
    StaticRegionDirectory::new([(REGION_CODE, REGION_NAME), ("eu-west-1", "EU (Ireland)")])
}

pub fn fargate() -> FargatePriceCalculator {
    FargatePriceCalculator::from_parts(REGION_CODE, REGION_NAME, ecs_items(), spot_snapshot())
        .unwrap()
}

pub fn lambda() -> LambdaPriceCalculator {
    LambdaPriceCalculator::from_parts(REGION_CODE, REGION_NAME, lambda_items()).unwrap()
}

/// In-memory price list per service
#[derive(Default)]
pub struct FixedPriceTables {
    tables: HashMap<String, RawPriceTable>,
}

impl FixedPriceTables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, service: &str, table: RawPriceTable) -> Self {
        self.tables.insert(service.to_string(), table);
        self
    }
}

#[async_trait]
impl PriceTableFetcher for FixedPriceTables {
    async fn fetch(&self, service_name: &str) -> Result<RawPriceTable> {
        self.tables
            .get(service_name)
            .cloned()
            .ok_or_else(|| PricingError::Upstream {
                source_name: "fixed".to_string(),
                message: format!("no price list for {}", service_name),
                source: None,
            })
    }
}

pub struct FixedSpotPrices(pub SpotPriceSnapshot);

#[async_trait]
impl SpotPriceFetcher for FixedSpotPrices {
    async fn fetch(&self) -> Result<SpotPriceSnapshot> {
        Ok(self.0.clone())
    }
}
