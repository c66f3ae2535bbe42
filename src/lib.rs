//! serverless-cost library
//!
//! Cost estimates for AWS Fargate (on-demand and Spot) and AWS Lambda (simple,
//! provisioned concurrency and Lambda@Edge) from the public per-region price lists.

pub mod config;
pub mod error;
pub mod fetcher;
pub mod pricing;
pub mod region;
pub mod report;
pub mod utils;

// Re-export commonly used types
pub use error::{PricingError, Result};
pub use pricing::fargate::{ContainerBilling, ContainerUsage};
pub use pricing::lambda::{FunctionUsage, ProvisionedConcurrency};
pub use pricing::{
    ContainerCost, ContainerSavings, FargatePriceCalculator, FunctionCost, LambdaPriceCalculator,
    OsType, SavingsPercent,
};
