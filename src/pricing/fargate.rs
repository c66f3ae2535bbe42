//! AWS Fargate (serverless container) cost calculator
//!
//! On-demand prices come from the `ecs` metered-unit price map. Fargate Spot prices for
//! vCPU and memory come from the spot snapshot; Spot storage is billed at the on-demand
//! storage rate and Spot has no Windows license fee.

use super::{ensure_non_negative, lookup_price, parse_price, OsType, SavingsPercent, UnitPrice};
use crate::error::{PricingError, Result};
use crate::fetcher::{PriceTableFetcher, RegionPrices, SpotPriceFetcher, SpotPriceSnapshot};
use crate::region::RegionDirectory;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

const SERVICE: &str = "Fargate";
const PRICE_LIST_SERVICE: &str = "ecs";

/// Ephemeral storage every task gets without charge
pub const FREE_STORAGE_GB: Decimal = dec!(20);

const HOUR_SECONDS: Decimal = dec!(3600);

const SPOT_VCPU_UNIT: &str = "vCPU-Hours";
const SPOT_MEMORY_UNIT: &str = "GB-Hours";

static SUPPORTED_OS_TYPES: [OsType; 3] = [OsType::LinuxX86, OsType::LinuxArm, OsType::Windows];

enum MemoryOptions {
    Listed(&'static [Decimal]),
    /// Every whole GB in `min..=max`
    WholeGb { min: u32, max: u32 },
}

impl MemoryOptions {
    fn contains(&self, memory_gb: Decimal) -> bool {
        match self {
            MemoryOptions::Listed(values) => values.contains(&memory_gb),
            MemoryOptions::WholeGb { min, max } => {
                memory_gb.fract().is_zero()
                    && memory_gb >= Decimal::from(*min)
                    && memory_gb <= Decimal::from(*max)
            }
        }
    }

    fn values(&self) -> Vec<Decimal> {
        match self {
            MemoryOptions::Listed(values) => values.to_vec(),
            MemoryOptions::WholeGb { min, max } => (*min..=*max).map(Decimal::from).collect(),
        }
    }
}

struct VcpuTier {
    vcpu: Decimal,
    memory_gb: MemoryOptions,
}

const QUARTER_VCPU_MEMORY_GB: [Decimal; 3] = [dec!(0.5), dec!(1), dec!(2)];

// Task sizes Fargate accepts
static VCPU_TIERS: [VcpuTier; 5] = [
    VcpuTier {
        vcpu: dec!(0.25),
        memory_gb: MemoryOptions::Listed(&QUARTER_VCPU_MEMORY_GB),
    },
    VcpuTier {
        vcpu: dec!(0.5),
        memory_gb: MemoryOptions::WholeGb { min: 1, max: 4 },
    },
    VcpuTier {
        vcpu: dec!(1),
        memory_gb: MemoryOptions::WholeGb { min: 2, max: 8 },
    },
    VcpuTier {
        vcpu: dec!(2),
        memory_gb: MemoryOptions::WholeGb { min: 4, max: 16 },
    },
    VcpuTier {
        vcpu: dec!(4),
        memory_gb: MemoryOptions::WholeGb { min: 8, max: 30 },
    },
];

fn tier_for(vcpu: Decimal) -> Option<&'static VcpuTier> {
    VCPU_TIERS.iter().find(|tier| tier.vcpu == vcpu)
}

/// Which Fargate rate card to bill against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContainerBilling {
    OnDemand,
    Spot,
}

/// A task size and how long it runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerUsage {
    pub os_type: OsType,
    pub vcpu: Decimal,
    pub memory_gb: Decimal,
    pub storage_gb: Decimal,
    pub duration_seconds: Decimal,
    /// Subtract the free ephemeral storage allowance before billing
    pub free_tier: bool,
}

impl ContainerUsage {
    fn billed_storage_gb(&self) -> Decimal {
        if self.free_tier {
            (self.storage_gb - FREE_STORAGE_GB).max(Decimal::ZERO)
        } else {
            self.storage_gb
        }
    }
}

/// Unit prices of one Fargate rate card
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerPrices {
    pub cpu: UnitPrice,
    pub memory: UnitPrice,
    pub os_license_fee: UnitPrice,
    pub storage: UnitPrice,
}

/// On-demand rate cards per OS type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FargatePriceTable {
    pub linux_x86: ContainerPrices,
    pub linux_arm: ContainerPrices,
    pub windows: ContainerPrices,
}

impl FargatePriceTable {
    pub fn for_os(&self, os_type: OsType) -> &ContainerPrices {
        match os_type {
            OsType::LinuxX86 => &self.linux_x86,
            OsType::LinuxArm => &self.linux_arm,
            OsType::Windows => &self.windows,
        }
    }
}

/// Shape the on-demand rate cards from a region's raw `ecs` price items
pub fn shape_on_demand_prices(region: &str, items: &RegionPrices) -> Result<FargatePriceTable> {
    let hourly = |item: &str| -> Result<UnitPrice> {
        Ok(UnitPrice::per_period(lookup_price(region, items, item)?, HOUR_SECONDS))
    };
    let no_license_fee = UnitPrice::per_period(Decimal::ZERO, HOUR_SECONDS);
    let storage = hourly("Storage per GB-Hours")?;

    Ok(FargatePriceTable {
        linux_x86: ContainerPrices {
            cpu: hourly("perCPU per hour")?,
            memory: hourly("perGB per hour")?,
            os_license_fee: no_license_fee,
            storage,
        },
        linux_arm: ContainerPrices {
            cpu: hourly("ARM perCPU per hour")?,
            memory: hourly("ARM perGB per hour")?,
            os_license_fee: no_license_fee,
            storage,
        },
        windows: ContainerPrices {
            cpu: hourly("perCPU per hour Windows")?,
            memory: hourly("perGB per hour Windows")?,
            os_license_fee: hourly("perCPU OS License Fee per hour Windows")?,
            storage,
        },
    })
}

/// Shape the Spot rate card for `region_code` from the spot snapshot
///
/// Storage is billed at the on-demand rate from `items`.
pub fn shape_spot_prices(
    region_code: &str,
    snapshot: &SpotPriceSnapshot,
    region: &str,
    items: &RegionPrices,
) -> Result<ContainerPrices> {
    let spot_hourly = |unit: &str| -> Result<UnitPrice> {
        let entry = snapshot
            .find(region_code, unit)
            .ok_or_else(|| PricingError::MissingPriceItem {
                region: region_code.to_string(),
                item: format!("Fargate Spot {}", unit),
            })?;
        let price = parse_price(&format!("Fargate Spot {}", unit), &entry.price.usd)?;
        Ok(UnitPrice::per_period(price, HOUR_SECONDS))
    };

    Ok(ContainerPrices {
        cpu: spot_hourly(SPOT_VCPU_UNIT)?,
        memory: spot_hourly(SPOT_MEMORY_UNIT)?,
        os_license_fee: UnitPrice::per_period(Decimal::ZERO, HOUR_SECONDS),
        storage: UnitPrice::per_period(
            lookup_price(region, items, "Storage per GB-Hours")?,
            HOUR_SECONDS,
        ),
    })
}

/// Cost of a Fargate task, in USD
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ContainerCost {
    pub total_cost: Decimal,
    pub cpu_cost: Decimal,
    pub memory_cost: Decimal,
    pub os_license_cost: Decimal,
    pub storage_cost: Decimal,
}

impl ContainerCost {
    /// Named components that make up `total_cost`
    pub fn components(&self) -> [(&'static str, Decimal); 4] {
        [
            ("cpu-cost", self.cpu_cost),
            ("memory-cost", self.memory_cost),
            ("os-license-cost", self.os_license_cost),
            ("storage-cost", self.storage_cost),
        ]
    }
}

/// Percentage saved by Spot against on-demand, per component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ContainerSavings {
    pub total_cost: SavingsPercent,
    pub cpu_cost: SavingsPercent,
    pub memory_cost: SavingsPercent,
    pub os_license_cost: SavingsPercent,
    pub storage_cost: SavingsPercent,
}

impl ContainerSavings {
    pub fn between(on_demand: &ContainerCost, spot: &ContainerCost) -> Self {
        Self {
            total_cost: SavingsPercent::between(on_demand.total_cost, spot.total_cost),
            cpu_cost: SavingsPercent::between(on_demand.cpu_cost, spot.cpu_cost),
            memory_cost: SavingsPercent::between(on_demand.memory_cost, spot.memory_cost),
            os_license_cost: SavingsPercent::between(
                on_demand.os_license_cost,
                spot.os_license_cost,
            ),
            storage_cost: SavingsPercent::between(on_demand.storage_cost, spot.storage_cost),
        }
    }

    pub fn components(&self) -> [(&'static str, SavingsPercent); 5] {
        [
            ("total-cost", self.total_cost),
            ("cpu-cost", self.cpu_cost),
            ("memory-cost", self.memory_cost),
            ("os-license-cost", self.os_license_cost),
            ("storage-cost", self.storage_cost),
        ]
    }
}

/// Fargate cost calculator bound to one region
pub struct FargatePriceCalculator {
    region_code: String,
    region_name: String,
    on_demand_items: RegionPrices,
    spot_snapshot: SpotPriceSnapshot,
}

impl FargatePriceCalculator {
    /// Resolve the region and fetch the on-demand price list and the Spot snapshot
    pub async fn new(
        region_code: &str,
        regions: &dyn RegionDirectory,
        price_fetcher: &dyn PriceTableFetcher,
        spot_fetcher: &dyn SpotPriceFetcher,
    ) -> Result<Self> {
        let region_name = regions.resolve(region_code).await?;
        let mut table = price_fetcher.fetch(PRICE_LIST_SERVICE).await?;
        let on_demand_items = table
            .regions
            .remove(&region_name)
            .ok_or_else(|| PricingError::UnknownRegion(region_name.clone()))?;
        let spot_snapshot = spot_fetcher.fetch().await?;

        let calculator =
            Self::from_parts(region_code, &region_name, on_demand_items, spot_snapshot)?;
        info!(
            "Fargate calculator ready for {} ({})",
            region_code, region_name
        );
        Ok(calculator)
    }

    /// Build from already-fetched price data
    ///
    /// Fails if the on-demand rate cards cannot be shaped. Spot prices are only required
    /// when pricing Spot, so regions without Fargate Spot still price on-demand.
    pub fn from_parts(
        region_code: &str,
        region_name: &str,
        on_demand_items: RegionPrices,
        spot_snapshot: SpotPriceSnapshot,
    ) -> Result<Self> {
        shape_on_demand_prices(region_name, &on_demand_items)?;
        if spot_snapshot.find(region_code, SPOT_VCPU_UNIT).is_none() {
            warn!("No Fargate Spot prices for {}", region_code);
        }

        Ok(Self {
            region_code: region_code.to_string(),
            region_name: region_name.to_string(),
            on_demand_items,
            spot_snapshot,
        })
    }

    pub fn region_code(&self) -> &str {
        &self.region_code
    }

    pub fn region_name(&self) -> &str {
        &self.region_name
    }

    pub fn spot_snapshot(&self) -> &SpotPriceSnapshot {
        &self.spot_snapshot
    }

    pub fn supported_os_types() -> &'static [OsType] {
        &SUPPORTED_OS_TYPES
    }

    pub fn supported_vcpus() -> Vec<Decimal> {
        VCPU_TIERS.iter().map(|tier| tier.vcpu).collect()
    }

    /// Memory sizes (GB) allowed with `vcpu`, or `None` for an unsupported vCPU count
    pub fn supported_memory(vcpu: Decimal) -> Option<Vec<Decimal>> {
        tier_for(vcpu).map(|tier| tier.memory_gb.values())
    }

    /// Every memory size (GB) allowed with any vCPU count, ascending
    pub fn all_supported_memory() -> Vec<Decimal> {
        let mut all: Vec<Decimal> = VCPU_TIERS
            .iter()
            .flat_map(|tier| tier.memory_gb.values())
            .collect();
        all.sort();
        all.dedup();
        all
    }

    /// Whether Fargate accepts this task size under `billing`
    pub fn is_supported(usage: &ContainerUsage, billing: ContainerBilling) -> bool {
        Self::validate(usage, billing).is_ok()
    }

    fn validate(usage: &ContainerUsage, billing: ContainerBilling) -> Result<()> {
        let valid_os = match billing {
            ContainerBilling::OnDemand => SUPPORTED_OS_TYPES.contains(&usage.os_type),
            ContainerBilling::Spot => true,
        };
        let valid_size = tier_for(usage.vcpu)
            .map(|tier| tier.memory_gb.contains(usage.memory_gb))
            .unwrap_or(false);
        let valid_storage = usage.storage_gb > Decimal::ZERO;

        if !(valid_os && valid_size && valid_storage) {
            let reason = match billing {
                ContainerBilling::OnDemand => format!(
                    "On-Demand (OS Type: {}, vCPUs = {}, GB RAM = {}, GB Storage = {})",
                    usage.os_type, usage.vcpu, usage.memory_gb, usage.storage_gb
                ),
                ContainerBilling::Spot => format!(
                    "Spot (vCPUs = {}, GB RAM = {}, GB Storage = {})",
                    usage.vcpu, usage.memory_gb, usage.storage_gb
                ),
            };
            return Err(PricingError::unsupported(SERVICE, reason));
        }

        ensure_non_negative(SERVICE, "duration", usage.duration_seconds)
    }

    /// Rate card for `billing`, shaped fresh from the fetched price data
    pub fn prices(&self, os_type: OsType, billing: ContainerBilling) -> Result<ContainerPrices> {
        match billing {
            ContainerBilling::OnDemand => {
                let table = shape_on_demand_prices(&self.region_name, &self.on_demand_items)?;
                Ok(*table.for_os(os_type))
            }
            ContainerBilling::Spot => shape_spot_prices(
                &self.region_code,
                &self.spot_snapshot,
                &self.region_name,
                &self.on_demand_items,
            ),
        }
    }

    pub fn calculate_cost(
        &self,
        usage: &ContainerUsage,
        billing: ContainerBilling,
    ) -> Result<ContainerCost> {
        Self::validate(usage, billing)?;
        let prices = self.prices(usage.os_type, billing)?;
        let duration = usage.duration_seconds;

        let cpu_cost = prices.cpu.cost_over(usage.vcpu, duration);
        let memory_cost = prices.memory.cost_over(usage.memory_gb, duration);
        let os_license_cost = match billing {
            ContainerBilling::OnDemand => prices.os_license_fee.cost_over(usage.vcpu, duration),
            ContainerBilling::Spot => Decimal::ZERO,
        };
        let storage_cost = prices.storage.cost_over(usage.billed_storage_gb(), duration);

        let cost = ContainerCost {
            total_cost: cpu_cost + memory_cost + os_license_cost + storage_cost,
            cpu_cost,
            memory_cost,
            os_license_cost,
            storage_cost,
        };
        debug!(
            "Fargate {:?} cost in {}: {:?}",
            billing, self.region_code, cost
        );
        Ok(cost)
    }

    /// Percentage saved by running the same task on Spot instead of on-demand
    pub fn calculate_savings(&self, usage: &ContainerUsage) -> Result<ContainerSavings> {
        let on_demand = self.calculate_cost(usage, ContainerBilling::OnDemand)?;
        let spot = self.calculate_cost(usage, ContainerBilling::Spot)?;
        Ok(ContainerSavings::between(&on_demand, &spot))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supported_memory_per_tier() {
        assert_eq!(
            FargatePriceCalculator::supported_memory(dec!(0.25)).unwrap(),
            vec![dec!(0.5), dec!(1), dec!(2)]
        );
        assert_eq!(
            FargatePriceCalculator::supported_memory(dec!(0.5)).unwrap(),
            vec![dec!(1), dec!(2), dec!(3), dec!(4)]
        );
        assert_eq!(
            FargatePriceCalculator::supported_memory(dec!(4)).unwrap().len(),
            23
        );
        assert!(FargatePriceCalculator::supported_memory(dec!(3)).is_none());
    }

    #[test]
    fn test_all_supported_memory_sorted_unique() {
        let all = FargatePriceCalculator::all_supported_memory();
        assert_eq!(all.first(), Some(&dec!(0.5)));
        assert_eq!(all.last(), Some(&dec!(30)));
        // 0.5 plus every whole GB from 1 to 30
        assert_eq!(all.len(), 31);
        assert!(all.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_memory_options_require_whole_gb() {
        let tier = tier_for(dec!(1)).unwrap();
        assert!(tier.memory_gb.contains(dec!(2)));
        assert!(tier.memory_gb.contains(dec!(8.0)));
        assert!(!tier.memory_gb.contains(dec!(2.5)));
        assert!(!tier.memory_gb.contains(dec!(9)));
    }

    fn snapshot(entries: &str) -> SpotPriceSnapshot {
        serde_json::from_str(&format!(r#"{{"prices": [{}]}}"#, entries)).unwrap()
    }

    fn storage_item() -> RegionPrices {
        let mut items = RegionPrices::new();
        items.insert(
            "Storage per GB-Hours".to_string(),
            crate::fetcher::RawPriceItem {
                price: "0.000111".to_string(),
                description: None,
            },
        );
        items
    }

    #[test]
    fn test_spot_prices_accept_exponent_notation() {
        let snapshot = snapshot(
            r#"{"price": {"USD": "1.2E-2"}, "unit": "vCPU-Hours", "attributes": {"aws:region": "us-east-1"}},
               {"price": {"USD": "0.0014"}, "unit": "GB-Hours", "attributes": {"aws:region": "us-east-1"}}"#,
        );
        let prices =
            shape_spot_prices("us-east-1", &snapshot, "US East (N. Virginia)", &storage_item())
                .unwrap();
        assert_eq!(prices.cpu.price, dec!(0.012));
        assert_eq!(prices.memory.price, dec!(0.0014));
        assert_eq!(prices.os_license_fee.price, Decimal::ZERO);
    }

    #[test]
    fn test_spot_prices_reject_garbage() {
        let snapshot = snapshot(
            r#"{"price": {"USD": "n/a"}, "unit": "vCPU-Hours", "attributes": {"aws:region": "us-east-1"}},
               {"price": {"USD": "0.0014"}, "unit": "GB-Hours", "attributes": {"aws:region": "us-east-1"}}"#,
        );
        let err =
            shape_spot_prices("us-east-1", &snapshot, "US East (N. Virginia)", &storage_item())
                .unwrap_err();
        assert!(matches!(err, PricingError::InvalidPrice { ref value, .. } if value == "n/a"));
    }

    #[test]
    fn test_billed_storage_free_tier() {
        let mut usage = ContainerUsage {
            os_type: OsType::LinuxX86,
            vcpu: dec!(1),
            memory_gb: dec!(2),
            storage_gb: dec!(25),
            duration_seconds: dec!(3600),
            free_tier: true,
        };
        assert_eq!(usage.billed_storage_gb(), dec!(5));
        usage.storage_gb = dec!(15);
        assert_eq!(usage.billed_storage_gb(), dec!(0));
        usage.free_tier = false;
        assert_eq!(usage.billed_storage_gb(), dec!(15));
    }
}
