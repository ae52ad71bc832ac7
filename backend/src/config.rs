//! Configuration management for the Mango Surveillance Platform
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (development.toml, production.toml)
//! 3. Environment variable overrides (`MANGO__SECTION__KEY`)
//!
//! `MANGO_ENVIRONMENT` selects the file, defaulting to development.

use config::{ConfigError, Environment, File};
use rust_decimal::Decimal;
use serde::Deserialize;
use shared::{validate_margin_of_error, validate_staleness_hours, ComplianceSchedule, ConfidenceLevel};

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Server configuration
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Surveillance rules
    pub surveillance: SurveillanceConfig,
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
    /// PostgreSQL connection URL. Without one the server keeps data in memory.
    pub url: Option<String>,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SurveillanceConfig {
    /// In-progress sessions older than this are swept
    pub staleness_hours: i64,

    /// How often the background sweep runs
    pub sweep_interval_minutes: u64,

    /// Confidence level used when none is given
    pub default_confidence: i64,

    /// Margin of error d for the sample-size formula
    pub margin_of_error: Decimal,

    /// Days between required surveillance rounds
    pub cycle_days: i64,

    /// Days after which a farm is flagged as due soon
    pub due_soon_days: i64,

    /// Window for "recent sessions" statistics
    pub recent_window_days: i64,

    /// Minutes per observation when re-deriving a broken end time
    pub repair_minutes_per_observation: i64,

    /// Minimum minutes when re-deriving a broken end time
    pub repair_minimum_minutes: i64,
}

impl SurveillanceConfig {
    pub fn default_confidence(&self) -> ConfidenceLevel {
        ConfidenceLevel::from_percent(self.default_confidence)
    }

    pub fn schedule(&self) -> ComplianceSchedule {
        ComplianceSchedule {
            cycle_days: self.cycle_days,
            due_soon_days: self.due_soon_days,
        }
    }

    pub fn staleness(&self) -> chrono::Duration {
        chrono::Duration::hours(self.staleness_hours)
    }
}

impl Default for SurveillanceConfig {
    fn default() -> Self {
        Self {
            staleness_hours: 2,
            sweep_interval_minutes: 15,
            default_confidence: 95,
            margin_of_error: shared::DEFAULT_MARGIN_OF_ERROR,
            cycle_days: 14,
            due_soon_days: 10,
            recent_window_days: 30,
            repair_minutes_per_observation: 2,
            repair_minimum_minutes: 10,
        }
    }
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment = std::env::var("MANGO_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("surveillance.staleness_hours", 2)?
            .set_default("surveillance.sweep_interval_minutes", 15)?
            .set_default("surveillance.default_confidence", 95)?
            .set_default("surveillance.margin_of_error", "0.05")?
            .set_default("surveillance.cycle_days", 14)?
            .set_default("surveillance.due_soon_days", 10)?
            .set_default("surveillance.recent_window_days", 30)?
            .set_default("surveillance.repair_minutes_per_observation", 2)?
            .set_default("surveillance.repair_minimum_minutes", 10)?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (MANGO_ prefix)
            .add_source(
                Environment::with_prefix("MANGO")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Config = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        validate_margin_of_error(self.surveillance.margin_of_error)
            .map_err(|msg| ConfigError::Message(format!("surveillance.margin_of_error: {}", msg)))?;
        validate_staleness_hours(self.surveillance.staleness_hours)
            .map_err(|msg| ConfigError::Message(format!("surveillance.staleness_hours: {}", msg)))?;
        if self.surveillance.sweep_interval_minutes == 0 {
            return Err(ConfigError::Message(
                "surveillance.sweep_interval_minutes must be positive".to_string(),
            ));
        }
        Ok(())
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
