use config::{Config as ConfigBuilder, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{PikaError, PikaResult};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PikaConfig {
    pub database: DatabaseSettings,
    pub storage: StorageSettings,
    pub logging: LoggingSettings,
    pub tamper: TamperSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    #[serde(default = "default_database_url")]
    pub url: String,

    #[serde(default = "default_pool_max")]
    pub pool_max_connections: u32,

    #[serde(default = "default_pool_min")]
    pub pool_min_connections: u32,
}

/// Time-series engine connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSettings {
    #[serde(default = "default_storage_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_storage_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub json_format: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TamperSettings {
    /// How long tamper events are kept before cleanup, in days.
    #[serde(default = "default_event_retention_days")]
    pub event_retention_days: u32,
}

fn default_database_url() -> String {
    "postgres://localhost/pika_dev".to_string()
}

fn default_pool_max() -> u32 {
    10
}

fn default_pool_min() -> u32 {
    1
}

fn default_storage_endpoint() -> String {
    "http://127.0.0.1:8428".to_string()
}

fn default_storage_timeout() -> u64 {
    10
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_event_retention_days() -> u32 {
    30
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            pool_max_connections: default_pool_max(),
            pool_min_connections: default_pool_min(),
        }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            endpoint: default_storage_endpoint(),
            timeout_secs: default_storage_timeout(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json_format: false,
        }
    }
}

impl Default for TamperSettings {
    fn default() -> Self {
        Self {
            event_retention_days: default_event_retention_days(),
        }
    }
}

impl PikaConfig {
    pub fn load() -> PikaResult<Self> {
        Self::load_from_paths(default_config_paths())
    }

    pub fn load_from_paths(paths: Vec<PathBuf>) -> PikaResult<Self> {
        dotenvy::dotenv().ok();

        let mut builder = ConfigBuilder::builder();

        for path in paths {
            if path.exists() {
                builder = builder.add_source(File::from(path).required(false));
            }
        }

        builder = builder.add_source(
            Environment::with_prefix("PIKA")
                .separator("_")
                .try_parsing(true),
        );

        let config = builder.build()?;
        let mut pika_config: PikaConfig = config.try_deserialize().unwrap_or_default();

        if let Ok(url) = std::env::var("DATABASE_URL") {
            pika_config.database.url = url;
        }
        if let Ok(level) = std::env::var("RUST_LOG") {
            pika_config.logging.level = level;
        }

        pika_config.validate()?;
        Ok(pika_config)
    }

    pub fn validate(&self) -> PikaResult<()> {
        if self.database.url.is_empty() {
            return Err(PikaError::Config("database.url must not be empty".to_string()));
        }
        if !self.database.url.starts_with("postgres://")
            && !self.database.url.starts_with("postgresql://")
        {
            return Err(PikaError::Config(
                "database.url must be a PostgreSQL URL starting with postgres:// or postgresql://"
                    .to_string(),
            ));
        }
        if self.database.pool_min_connections > self.database.pool_max_connections {
            return Err(PikaError::Config(
                "database.pool_min_connections cannot exceed pool_max_connections".to_string(),
            ));
        }
        if self.storage.endpoint.is_empty() {
            return Err(PikaError::Config("storage.endpoint must not be empty".to_string()));
        }
        Ok(())
    }
}

fn default_config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        paths.push(cwd.join("config").join("default.toml"));
        paths.push(cwd.join("config").join("local.toml"));
        paths.push(cwd.join("pika.toml"));
    }
    paths.push(PathBuf::from("/etc/pika/server.toml"));

    paths
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = PikaConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.storage.timeout_secs, 10);
        assert_eq!(config.tamper.event_retention_days, 30);
    }

    #[test]
    fn test_non_postgres_url_rejected() {
        let mut config = PikaConfig::default();
        config.database.url = "mysql://localhost/pika".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_pool_bounds_validated() {
        let mut config = PikaConfig::default();
        config.database.pool_min_connections = 20;
        assert!(config.validate().is_err());
    }
}
