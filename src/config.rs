use config::{Config, ConfigError, Environment, File};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::domain::DEFAULT_YIELD_RATE;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub broker: BrokerConfig,
    #[serde(default)]
    pub plan: PlanConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,
    /// Maximum connections in pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    5
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Redis URL; the in-memory cache is used when unset
    #[serde(default)]
    pub redis_url: Option<String>,
    /// Lifetime of a cached balance in seconds
    #[serde(default = "default_balance_ttl")]
    pub balance_ttl_secs: u64,
}

fn default_balance_ttl() -> u64 {
    60
}

impl CacheConfig {
    pub fn balance_ttl(&self) -> Duration {
        Duration::from_secs(self.balance_ttl_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            redis_url: None,
            balance_ttl_secs: default_balance_ttl(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BrokerConfig {
    /// Buffered messages per topic before publishers wait
    pub channel_capacity: usize,
    /// Redeliveries of a retryable failure before dead-lettering
    pub max_redeliveries: u32,
    pub base_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 1024,
            max_redeliveries: 5,
            base_backoff_ms: 200,
            max_backoff_ms: 10_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlanConfig {
    /// Yield applied to every contribution (e.g., 0.20 = 20%)
    pub yield_rate: Decimal,
}

impl Default for PlanConfig {
    fn default() -> Self {
        Self {
            yield_rate: DEFAULT_YIELD_RATE,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Enable JSON formatted logs
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from a specific directory
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();
        let defaults = BrokerConfig::default();

        let builder = Config::builder()
            .set_default("server.host", default_host())?
            .set_default("server.port", default_port())?
            .set_default("database.url", "postgres://localhost/pension")?
            .set_default("database.max_connections", default_max_connections())?
            .set_default("cache.balance_ttl_secs", default_balance_ttl())?
            .set_default("broker.channel_capacity", defaults.channel_capacity as u64)?
            .set_default("broker.max_redeliveries", defaults.max_redeliveries)?
            .set_default("broker.base_backoff_ms", defaults.base_backoff_ms)?
            .set_default("broker.max_backoff_ms", defaults.max_backoff_ms)?
            .set_default("plan.yield_rate", DEFAULT_YIELD_RATE.to_string())?
            .set_default("logging.level", "info")?
            .set_default("logging.json", false)?
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Environment-specific overrides (e.g., config/production.toml)
            .add_source(
                File::from(config_dir.join(
                    std::env::var("PENSION_ENV").unwrap_or_else(|_| "development".to_string()),
                ))
                .required(false),
            )
            // PENSION__DATABASE__URL, PENSION__CACHE__REDIS_URL, ...
            .add_source(
                Environment::with_prefix("PENSION")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// Configuration for local runs and tests
    pub fn default_config(database_url: &str) -> Self {
        Self {
            server: ServerConfig::default(),
            database: DatabaseConfig {
                url: database_url.to_string(),
                max_connections: default_max_connections(),
            },
            cache: CacheConfig::default(),
            broker: BrokerConfig::default(),
            plan: PlanConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.server.port == 0 {
            errors.push("server.port must be non-zero".to_string());
        }

        if self.database.url.trim().is_empty() {
            errors.push("database.url must be set".to_string());
        }

        if self.database.max_connections == 0 {
            errors.push("database.max_connections must be positive".to_string());
        }

        if self.cache.balance_ttl_secs == 0 {
            errors.push("cache.balance_ttl_secs must be positive".to_string());
        }

        if matches!(&self.cache.redis_url, Some(url) if url.trim().is_empty()) {
            errors.push("cache.redis_url must not be empty when set".to_string());
        }

        if self.broker.channel_capacity == 0 {
            errors.push("broker.channel_capacity must be positive".to_string());
        }

        if self.broker.base_backoff_ms > self.broker.max_backoff_ms {
            errors.push("broker.base_backoff_ms should not exceed max_backoff_ms".to_string());
        }

        if self.plan.yield_rate < Decimal::ZERO {
            errors.push(format!(
                "plan.yield_rate must not be negative: {}",
                self.plan.yield_rate
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
