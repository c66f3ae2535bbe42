use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub aws: AwsConfig,
    #[serde(default)]
    pub pricing: PricingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AwsConfig {
    /// Region priced when `--region` is not given
    pub region: String,
    /// Region the SSM client talks to for region-name lookups
    pub ssm_region: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingConfig {
    pub price_list_base_url: String,
    pub spot_price_url: String,
    pub request_timeout_secs: u64,
}

impl Default for AwsConfig {
    fn default() -> Self {
        Self {
            region: "us-east-1".to_string(),
            // Global-infrastructure parameters are readable from any region
            ssm_region: "us-east-1".to_string(),
        }
    }
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            price_list_base_url: "https://b0.p.awsstatic.com/pricing/2.0/meteredUnitMaps"
                .to_string(),
            spot_price_url: "https://dftu77xade0tc.cloudfront.net/fargate-spot-prices.json"
                .to_string(),
            request_timeout_secs: 30,
        }
    }
}

impl AwsConfig {
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.region.trim().is_empty() {
            return Err(ConfigError::MissingField("aws.region".to_string()));
        }
        if self.ssm_region.trim().is_empty() {
            return Err(ConfigError::MissingField("aws.ssm_region".to_string()));
        }
        Ok(())
    }
}

impl PricingConfig {
    /// URL of the metered-unit price map for one service ("ecs", "lambda")
    pub fn service_price_url(&self, service: &str) -> String {
        format!(
            "{}/{service}/USD/current/{service}.json",
            self.price_list_base_url.trim_end_matches('/')
        )
    }

    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.price_list_base_url.trim().is_empty() {
            return Err(ConfigError::MissingField(
                "pricing.price_list_base_url".to_string(),
            ));
        }
        if self.spot_price_url.trim().is_empty() {
            return Err(ConfigError::MissingField("pricing.spot_price_url".to_string()));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "pricing.request_timeout_secs".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

impl Config {
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        self.aws.validate()?;
        self.pricing.validate()
    }

    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = if let Some(p) = path {
            p.to_path_buf()
        } else {
            // Try .serverless-cost.toml in current dir, then ~/.config/serverless-cost/config.toml
            let local = PathBuf::from(".serverless-cost.toml");
            if local.exists() {
                local
            } else {
                dirs::config_dir()
                    .map(|d| d.join("serverless-cost").join("config.toml"))
                    .unwrap_or_else(|| PathBuf::from(".serverless-cost.toml"))
            }
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = toml::from_str(&content).map_err(|e| {
                ConfigError::ParseError(format!(
                    "{}: {}\n  Tip: Run 'serverless-cost init' to create a new config file",
                    config_path.display(),
                    e
                ))
            })?;
            config.validate()?;
            Ok(config)
        } else {
            // Use defaults but warn if user explicitly provided a path
            if path.is_some() {
                warn!(
                    "Config file not found: {}. Using default configuration; run 'serverless-cost init' to create one.",
                    config_path.display()
                );
            }
            Ok(Config::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::InvalidValue {
            field: "config".to_string(),
            reason: format!("cannot be written as TOML: {}", e),
        })?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

pub fn init_config(output: &Path) -> Result<()> {
    let config = Config::default();
    config.save(output)?;
    println!("Created config file: {}", output.display());
    Ok(())
}
