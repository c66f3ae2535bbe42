//! Error types for serverless-cost
//!
//! This module defines the error handling strategy for the pricing library. There are
//! two error types: `PricingError` (main error enum) and `ConfigError` (configuration-specific).
//!
//! ## Error Handling Philosophy
//!
//! Library code uses `crate::error::Result<T>` which returns `PricingError`.
//! CLI code uses `anyhow::Result<T>` for top-level error handling. The conversion
//! happens at the CLI boundary using `anyhow::Error::from` to preserve error chains.
//!
//! ## Error Families
//!
//! - Configuration errors: the requested hardware/OS/memory/storage combination is not
//!   offered by the service. Raised before any price arithmetic.
//!   - `UnsupportedConfiguration`
//!
//! - Upstream errors: a collaborator (region directory, price list, spot feed) failed
//!   or returned data without a price item the calculators need.
//!   - `Upstream`, `UnknownRegion`, `MissingPriceItem`, `InvalidPrice`
//!
//! `Config` and `Io` cover loading and saving the config file.
//!
//! Nothing here is retried. An upstream failure surfaces on the first attempt.
//!
//! An undefined savings ratio is not an error; see `pricing::SavingsPercent::Undefined`.

use thiserror::Error;

/// Main error type for serverless-cost
#[derive(Error, Debug)]
pub enum PricingError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Unsupported {service} configuration: {reason}")]
    UnsupportedConfiguration { service: String, reason: String },

    #[error("Upstream error: {source_name} - {message}")]
    Upstream {
        source_name: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Unknown region: {0}")]
    UnknownRegion(String),

    #[error("Price item missing for {region}: {item}")]
    MissingPriceItem { region: String, item: String },

    #[error("Invalid price for {item}: {value:?}")]
    InvalidPrice { item: String, value: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Failed to parse config: {0}")]
    ParseError(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, PricingError>;

impl PricingError {
    pub(crate) fn unsupported(service: &str, reason: impl Into<String>) -> Self {
        PricingError::UnsupportedConfiguration {
            service: service.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn upstream(
        source_name: &str,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        PricingError::Upstream {
            source_name: source_name.to_string(),
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// True when the request itself is invalid and retrying with the same inputs cannot help.
    pub fn is_configuration_error(&self) -> bool {
        matches!(self, PricingError::UnsupportedConfiguration { .. })
    }

    /// True when a collaborator failed or returned incomplete price data.
    pub fn is_upstream_error(&self) -> bool {
        matches!(
            self,
            PricingError::Upstream { .. }
                | PricingError::UnknownRegion(_)
                | PricingError::MissingPriceItem { .. }
                | PricingError::InvalidPrice { .. }
        )
    }
}
