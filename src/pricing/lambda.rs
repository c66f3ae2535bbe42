//! AWS Lambda (serverless function) cost calculator
//!
//! Compute is billed in 1 ms increments scaled by configured memory. Durations are
//! carried in "GB-milliseconds": memory (GB) x total run time / 1 ms. Duration prices
//! in the price list are per GB-second and are scaled down to the same unit when shaped.

use super::{ensure_non_negative, lookup_price, OsType, UnitPrice};
use crate::error::{PricingError, Result};
use crate::fetcher::{PriceTableFetcher, RegionPrices};
use crate::region::RegionDirectory;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

const SERVICE: &str = "Lambda";
const PRICE_LIST_SERVICE: &str = "lambda";

/// Billing granularity of function run time, in seconds
pub const DURATION_UNIT_SECONDS: Decimal = dec!(0.001);

/// Provisioned concurrency is billed in blocks of this many seconds
pub const CONCURRENCY_BLOCK_SECONDS: Decimal = dec!(300);

/// Monthly free requests
pub const FREE_REQUESTS: Decimal = dec!(1000000);

/// Monthly free compute: 400,000 GB-seconds in GB-milliseconds
pub const FREE_COMPUTE_GB_MS: Decimal = dec!(400000000);

const MEMORY_RANGE_MB: (u32, u32) = (128, 10_240);

static SUPPORTED_OS_TYPES: [OsType; 2] = [OsType::LinuxX86, OsType::LinuxArm];

const ARM_MARKER_ITEM: &str = "Lambda Duration-ARM";

/// Unit prices of one Lambda architecture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FunctionPrices {
    /// Per GB-millisecond
    pub duration: UnitPrice,
    /// Per GB-millisecond, with provisioned concurrency enabled
    pub duration_provisioned: UnitPrice,
    /// Per GB-second of provisioned capacity, billed in 5 minute blocks
    pub provisioned_concurrency: UnitPrice,
    pub requests: UnitPrice,
}

/// Unit prices of Lambda@Edge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgePrices {
    pub duration: UnitPrice,
    pub requests: UnitPrice,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LambdaPriceTable {
    pub linux_x86: FunctionPrices,
    /// Not every region publishes Graviton prices
    pub linux_arm: Option<FunctionPrices>,
    pub edge: EdgePrices,
}

impl LambdaPriceTable {
    pub fn for_os(&self, os_type: OsType) -> Result<&FunctionPrices> {
        match os_type {
            OsType::LinuxX86 => Ok(&self.linux_x86),
            OsType::LinuxArm => self.linux_arm.as_ref().ok_or_else(|| {
                PricingError::unsupported(SERVICE, "linux-arm is not priced in this region")
            }),
            OsType::Windows => Err(PricingError::unsupported(
                SERVICE,
                format!("OS type {} is not supported", os_type),
            )),
        }
    }
}

/// Shape the Lambda price table from a region's raw `lambda` price items
pub fn shape_function_prices(region: &str, items: &RegionPrices) -> Result<LambdaPriceTable> {
    let per_gb_ms = |item: &str| -> Result<UnitPrice> {
        Ok(UnitPrice::per_period(
            lookup_price(region, items, item)? * DURATION_UNIT_SECONDS,
            DURATION_UNIT_SECONDS,
        ))
    };
    let per_block = |item: &str| -> Result<UnitPrice> {
        Ok(UnitPrice::per_period(
            lookup_price(region, items, item)?,
            CONCURRENCY_BLOCK_SECONDS,
        ))
    };
    let per_request = |item: &str| -> Result<UnitPrice> {
        Ok(UnitPrice::flat(lookup_price(region, items, item)?))
    };

    let linux_arm = if items.contains_key(ARM_MARKER_ITEM) {
        Some(FunctionPrices {
            duration: per_gb_ms(ARM_MARKER_ITEM)?,
            duration_provisioned: per_gb_ms("Lambda Duration-Provisioned-ARM")?,
            provisioned_concurrency: per_block("Lambda Provisioned-Concurrency-ARM")?,
            requests: per_request("Lambda Requests-ARM")?,
        })
    } else {
        None
    };

    Ok(LambdaPriceTable {
        linux_x86: FunctionPrices {
            duration: per_gb_ms("Lambda Duration")?,
            duration_provisioned: per_gb_ms("Lambda Duration-Provisioned")?,
            provisioned_concurrency: per_block("Lambda Provisioned-Concurrency")?,
            requests: per_request("Lambda Requests")?,
        },
        linux_arm,
        edge: EdgePrices {
            duration: per_gb_ms("Lambda Edge-Duration")?,
            requests: per_request("Lambda Edge-Requests")?,
        },
    })
}

/// Seconds of provisioned concurrency actually billed: partial 5 minute blocks count in full
pub fn billed_concurrency_window(window_seconds: Decimal) -> Decimal {
    (window_seconds / CONCURRENCY_BLOCK_SECONDS).ceil() * CONCURRENCY_BLOCK_SECONDS
}

/// A function configuration and its invocations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FunctionUsage {
    pub os_type: OsType,
    pub memory_gb: Decimal,
    /// Run time of a single invocation
    pub duration_seconds: Decimal,
    pub requests: u64,
    /// Subtract the monthly free allowance before billing
    pub free_tier: bool,
}

impl FunctionUsage {
    fn compute_gb_ms(&self, unit: &UnitPrice) -> Decimal {
        let total_seconds = Decimal::from(self.requests) * self.duration_seconds;
        let unit_time = unit.unit_time.unwrap_or(DURATION_UNIT_SECONDS);
        self.memory_gb * (total_seconds / unit_time)
    }

    fn billed_requests(&self) -> Decimal {
        let requests = Decimal::from(self.requests);
        if self.free_tier {
            (requests - FREE_REQUESTS).max(Decimal::ZERO)
        } else {
            requests
        }
    }
}

/// Provisioned concurrency kept warm alongside the invocations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProvisionedConcurrency {
    pub concurrency: u64,
    pub window_seconds: Decimal,
}

/// Cost of a Lambda workload, in USD
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct FunctionCost {
    pub total_cost: Decimal,
    pub duration_cost: Decimal,
    pub requests_cost: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concurrency_cost: Option<Decimal>,
}

impl FunctionCost {
    /// Named components that make up `total_cost`
    pub fn components(&self) -> Vec<(&'static str, Decimal)> {
        let mut components = vec![
            ("duration-cost", self.duration_cost),
            ("requests-cost", self.requests_cost),
        ];
        if let Some(concurrency_cost) = self.concurrency_cost {
            components.push(("concurrency-cost", concurrency_cost));
        }
        components
    }
}

/// Lambda cost calculator bound to one region
pub struct LambdaPriceCalculator {
    region_code: String,
    region_name: String,
    items: RegionPrices,
}

impl LambdaPriceCalculator {
    /// Resolve the region and fetch the Lambda price list
    pub async fn new(
        region_code: &str,
        regions: &dyn RegionDirectory,
        price_fetcher: &dyn PriceTableFetcher,
    ) -> Result<Self> {
        let region_name = regions.resolve(region_code).await?;
        let mut table = price_fetcher.fetch(PRICE_LIST_SERVICE).await?;
        let items = table
            .regions
            .remove(&region_name)
            .ok_or_else(|| PricingError::UnknownRegion(region_name.clone()))?;

        let calculator = Self::from_parts(region_code, &region_name, items)?;
        info!("Lambda calculator ready for {} ({})", region_code, region_name);
        Ok(calculator)
    }

    /// Build from already-fetched price data
    pub fn from_parts(region_code: &str, region_name: &str, items: RegionPrices) -> Result<Self> {
        let table = shape_function_prices(region_name, &items)?;
        if table.linux_arm.is_none() {
            warn!("No linux-arm Lambda prices for {}", region_code);
        }

        Ok(Self {
            region_code: region_code.to_string(),
            region_name: region_name.to_string(),
            items,
        })
    }

    pub fn region_code(&self) -> &str {
        &self.region_code
    }

    pub fn region_name(&self) -> &str {
        &self.region_name
    }

    pub fn supported_os_types() -> &'static [OsType] {
        &SUPPORTED_OS_TYPES
    }

    /// Inclusive memory bounds in MB
    pub fn supported_memory_range_mb() -> (u32, u32) {
        MEMORY_RANGE_MB
    }

    /// Price table shaped fresh from the fetched price data
    pub fn prices(&self) -> Result<LambdaPriceTable> {
        shape_function_prices(&self.region_name, &self.items)
    }

    fn validate_memory(memory_gb: Decimal) -> Result<()> {
        let memory_mb = (memory_gb * dec!(1024)).trunc();
        let (min, max) = MEMORY_RANGE_MB;
        if memory_mb < Decimal::from(min) || memory_mb > Decimal::from(max) {
            return Err(PricingError::unsupported(
                SERVICE,
                format!(
                    "GB RAM = {} ({} MB, allowed {}..={} MB)",
                    memory_gb, memory_mb, min, max
                ),
            ));
        }
        Ok(())
    }

    fn validate(usage: &FunctionUsage) -> Result<()> {
        if !SUPPORTED_OS_TYPES.contains(&usage.os_type) {
            return Err(PricingError::unsupported(
                SERVICE,
                format!("OS Type: {}, GB RAM = {}", usage.os_type, usage.memory_gb),
            ));
        }
        Self::validate_memory(usage.memory_gb)?;
        ensure_non_negative(SERVICE, "duration", usage.duration_seconds)
    }

    /// Whether Lambda accepts this configuration; ARM availability is checked at pricing time
    pub fn is_supported(usage: &FunctionUsage) -> bool {
        Self::validate(usage).is_ok()
    }

    pub fn calculate_simple_cost(&self, usage: &FunctionUsage) -> Result<FunctionCost> {
        Self::validate(usage)?;
        let table = self.prices()?;
        let prices = table.for_os(usage.os_type)?;

        let compute = usage.compute_gb_ms(&prices.duration);
        let billed_compute = if usage.free_tier {
            (compute - FREE_COMPUTE_GB_MS).max(Decimal::ZERO)
        } else {
            compute
        };

        let duration_cost = billed_compute * prices.duration.price;
        let requests_cost = usage.billed_requests() * prices.requests.price;

        let cost = FunctionCost {
            total_cost: duration_cost + requests_cost,
            duration_cost,
            requests_cost,
            concurrency_cost: None,
        };
        debug!("Lambda cost in {}: {:?}", self.region_code, cost);
        Ok(cost)
    }

    /// Cost with provisioned concurrency
    ///
    /// The free tier only covers requests here; provisioned duration is always billed.
    pub fn calculate_concurrent_cost(
        &self,
        usage: &FunctionUsage,
        provisioned: &ProvisionedConcurrency,
    ) -> Result<FunctionCost> {
        Self::validate(usage)?;
        ensure_non_negative(SERVICE, "concurrency window", provisioned.window_seconds)?;
        let table = self.prices()?;
        let prices = table.for_os(usage.os_type)?;

        let duration_cost =
            usage.compute_gb_ms(&prices.duration_provisioned) * prices.duration_provisioned.price;
        let requests_cost = usage.billed_requests() * prices.requests.price;

        let billed_window = billed_concurrency_window(provisioned.window_seconds);
        let concurrency_cost = usage.memory_gb
            * Decimal::from(provisioned.concurrency)
            * billed_window
            * prices.provisioned_concurrency.price;

        let cost = FunctionCost {
            total_cost: duration_cost + requests_cost + concurrency_cost,
            duration_cost,
            requests_cost,
            concurrency_cost: Some(concurrency_cost),
        };
        debug!(
            "Lambda provisioned cost in {} ({}s billed window): {:?}",
            self.region_code, billed_window, cost
        );
        Ok(cost)
    }

    /// Lambda@Edge cost; no free tier applies
    pub fn calculate_edge_cost(
        &self,
        memory_gb: Decimal,
        duration_seconds: Decimal,
        requests: u64,
    ) -> Result<FunctionCost> {
        Self::validate_memory(memory_gb)?;
        ensure_non_negative(SERVICE, "duration", duration_seconds)?;
        let edge = self.prices()?.edge;

        let total_seconds = Decimal::from(requests) * duration_seconds;
        let compute = memory_gb * (total_seconds / DURATION_UNIT_SECONDS);
        let duration_cost = compute * edge.duration.price;
        let requests_cost = Decimal::from(requests) * edge.requests.price;

        let cost = FunctionCost {
            total_cost: duration_cost + requests_cost,
            duration_cost,
            requests_cost,
            concurrency_cost: None,
        };
        debug!("Lambda@Edge cost in {}: {:?}", self.region_code, cost);
        Ok(cost)
    }
}
