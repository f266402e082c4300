//! Service configuration management

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use league_engine::{PrizeConfig, SeasonConfig};
use league_store::StoreConfig;

use crate::error::RecalcError;

/// Prefix of environment overrides, e.g. `LEAGUE__STORE__DATA_DIR`
pub const ENV_PREFIX: &str = "LEAGUE";

/// Main service configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Document store configuration
    pub store: StoreConfig,

    /// Orchestrator settings
    pub recalculation: RecalcSettings,

    /// Prize fund parameters
    pub prizes: PrizeConfig,

    /// Award calendar and prior-season baseline
    pub season: SeasonConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecalcSettings {
    /// Preferred operations per batch; the store's own limit still applies
    pub batch_size: usize,

    /// Whole-run time limit in seconds
    pub run_timeout_secs: u64,

    /// Emit a progress message every this many committed batches
    pub progress_every_batches: usize,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (json, pretty, compact)
    pub format: String,

    /// Log file path (if None, logs to stdout only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

impl Default for RecalcSettings {
    fn default() -> Self {
        Self { batch_size: 400, run_timeout_secs: 300, progress_every_batches: 5 }
    }
}

impl RecalcSettings {
    pub fn run_timeout(&self) -> Duration {
        Duration::from_secs(self.run_timeout_secs)
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), format: "pretty".to_string(), file: None }
    }
}

/// Load configuration from an optional TOML file and `LEAGUE__*` environment variables
pub fn load_config(path: Option<&Path>) -> Result<ServiceConfig> {
    // A missing .env is fine.
    let _ = dotenv::dotenv();

    let mut builder = Config::builder();
    if let Some(path) = path {
        tracing::debug!("Loading configuration from file: {:?}", path);
        builder = builder.add_source(File::from(path).required(true));
    }
    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX).prefix_separator("__").separator("__").try_parsing(true),
    );

    let config: ServiceConfig = builder
        .build()
        .context("Failed to read configuration sources")?
        .try_deserialize()
        .context("Failed to deserialize configuration")?;

    validate_config(&config)?;

    Ok(config)
}

/// Validate configuration
pub fn validate_config(config: &ServiceConfig) -> crate::error::Result<()> {
    config.store.validate().map_err(RecalcError::configuration)?;
    config.season.validate()?;
    config.prizes.validate()?;
    config.prizes.check_fund(config.season.award_periods.len())?;

    if config.recalculation.batch_size == 0 {
        return Err(RecalcError::configuration("recalculation.batch_size must be greater than 0"));
    }

    if config.recalculation.run_timeout_secs == 0 {
        return Err(RecalcError::configuration("recalculation.run_timeout_secs must be greater than 0"));
    }

    match config.logging.level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => {}
        other => return Err(RecalcError::configuration(format!("Invalid log level: {other}"))),
    }

    match config.logging.format.as_str() {
        "json" | "pretty" | "compact" => {}
        other => return Err(RecalcError::configuration(format!("Invalid log format: {other}"))),
    }

    Ok(())
}

/// Save configuration to a TOML file
pub fn save_config(config: &ServiceConfig, path: &Path) -> Result<()> {
    let contents = toml::to_string_pretty(config).context("Failed to encode configuration")?;
    std::fs::write(path, contents)
        .with_context(|| format!("Failed to write configuration file: {:?}", path))?;
    Ok(())
}
