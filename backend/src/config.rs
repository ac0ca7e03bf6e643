//! Configuration management for the VMI proposal server
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (development.toml, production.toml)
//! 3. Environment variable overrides with VMI_ prefix

use config::{ConfigError, Environment, File};
use serde::Deserialize;
use shared::{EditPolicy, InventoryThresholds};

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Server configuration
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// JWT verification configuration
    pub jwt: JwtConfig,

    /// Proposal negotiation rules
    pub proposals: ProposalConfig,

    /// Storefront catalog settings
    pub catalog: CatalogConfig,

    /// Log output settings
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server port
    pub port: u16,

    /// Server host
    pub host: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,

    /// Seconds to wait for a pooled connection before failing
    pub acquire_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct JwtConfig {
    /// Secret key the access tokens are signed with
    pub secret: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProposalConfig {
    /// Whether an accepted or rejected proposal can still receive versions
    pub allow_edit_after_decision: bool,
}

impl ProposalConfig {
    pub fn edit_policy(&self) -> EditPolicy {
        EditPolicy {
            allow_edit_after_decision: self.allow_edit_after_decision,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct CatalogConfig {
    /// Threshold used when application_settings has no value for a brand
    pub default_inventory_threshold: i32,
}

impl CatalogConfig {
    pub fn default_thresholds(&self) -> InventoryThresholds {
        InventoryThresholds::uniform(self.default_inventory_threshold)
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct LoggingConfig {
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment = std::env::var("VMI_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("database.acquire_timeout_secs", 30)?
            .set_default("proposals.allow_edit_after_decision", true)?
            .set_default("catalog.default_inventory_threshold", 5)?
            .set_default("logging.json", false)?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (VMI_ prefix)
            .add_source(
                Environment::with_prefix("VMI")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            host: "0.0.0.0".to_string(),
        }
    }
}

impl Default for ProposalConfig {
    fn default() -> Self {
        Self {
            allow_edit_after_decision: true,
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            default_inventory_threshold: 5,
        }
    }
}
