//! Cost calculators for AWS Fargate and AWS Lambda
//!
//! Every amount is a `rust_decimal::Decimal`. Prices come in as decimal strings from the
//! price feeds and never pass through binary floating point.
//!
//! Calculators fetch raw price data once at construction. Each cost call shapes a typed
//! price table from that raw data with a pure function and applies the cost formula,
//! so cost calls do no I/O and can be shared across threads.

pub mod fargate;
pub mod lambda;

use crate::error::{PricingError, Result};
use crate::fetcher::RegionPrices;
use clap::ValueEnum;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub use fargate::{ContainerCost, ContainerSavings, FargatePriceCalculator};
pub use lambda::{FunctionCost, LambdaPriceCalculator};

/// Operating system / architecture of the workload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum OsType {
    #[value(name = "linux-x86")]
    LinuxX86,
    #[value(name = "linux-arm")]
    LinuxArm,
    #[value(name = "windows")]
    Windows,
}

impl OsType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OsType::LinuxX86 => "linux-x86",
            OsType::LinuxArm => "linux-arm",
            OsType::Windows => "windows",
        }
    }
}

impl fmt::Display for OsType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OsType {
    type Err = PricingError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "linux-x86" => Ok(OsType::LinuxX86),
            "linux-arm" => Ok(OsType::LinuxArm),
            "windows" => Ok(OsType::Windows),
            other => Err(PricingError::unsupported(
                "OS",
                format!("unknown OS type {:?} (expected linux-x86, linux-arm or windows)", other),
            )),
        }
    }
}

/// Price per unit of a billing dimension
///
/// `unit_time` is the period the price covers, in seconds. A flat per-occurrence price
/// (per request) has no unit time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitPrice {
    pub price: Decimal,
    pub unit_time: Option<Decimal>,
}

impl UnitPrice {
    pub fn per_period(price: Decimal, unit_time: Decimal) -> Self {
        Self {
            price,
            unit_time: Some(unit_time),
        }
    }

    pub fn flat(price: Decimal) -> Self {
        Self {
            price,
            unit_time: None,
        }
    }

    /// `quantity` units held for `seconds`
    pub fn cost_over(&self, quantity: Decimal, seconds: Decimal) -> Decimal {
        match self.unit_time {
            Some(unit_time) => quantity * self.price * (seconds / unit_time),
            None => quantity * self.price,
        }
    }
}

/// Relative saving of a discounted cost against its on-demand baseline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SavingsPercent {
    Percent(Decimal),
    /// The on-demand baseline is zero, so a percentage change has no meaning
    Undefined,
}

impl SavingsPercent {
    pub fn between(on_demand: Decimal, discounted: Decimal) -> Self {
        if on_demand.is_zero() {
            SavingsPercent::Undefined
        } else {
            SavingsPercent::Percent((on_demand - discounted) / on_demand * Decimal::ONE_HUNDRED)
        }
    }

    pub fn percent(&self) -> Option<Decimal> {
        match self {
            SavingsPercent::Percent(p) => Some(*p),
            SavingsPercent::Undefined => None,
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, SavingsPercent::Undefined)
    }
}

impl fmt::Display for SavingsPercent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SavingsPercent::Percent(p) => write!(f, "{:.2}%", p),
            SavingsPercent::Undefined => f.write_str("n/a"),
        }
    }
}

/// Parse one price item of a region into an exact decimal
pub(crate) fn lookup_price(region: &str, items: &RegionPrices, item: &str) -> Result<Decimal> {
    let raw = items.get(item).ok_or_else(|| PricingError::MissingPriceItem {
        region: region.to_string(),
        item: item.to_string(),
    })?;
    parse_price(item, &raw.price)
}

/// Parse a price string from either feed into an exact decimal
pub(crate) fn parse_price(item: &str, value: &str) -> Result<Decimal> {
    // Feeds occasionally use exponent notation for tiny prices
    Decimal::from_str(value.trim())
        .or_else(|_| Decimal::from_scientific(value.trim()))
        .map_err(|_| PricingError::InvalidPrice {
            item: item.to_string(),
            value: value.to_string(),
        })
}

pub(crate) fn ensure_non_negative(service: &str, field: &str, value: Decimal) -> Result<()> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(PricingError::unsupported(
            service,
            format!("{} must not be negative, got {}", field, value),
        ));
    }
    Ok(())
}
