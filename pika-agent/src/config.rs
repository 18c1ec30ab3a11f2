use std::path::PathBuf;

use config::{Config as ConfigBuilder, Environment, File};
use serde::{Deserialize, Serialize};

use crate::error::{AgentError, AgentResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// WebSocket endpoint of the server.
    #[serde(default = "default_server_url")]
    pub server_url: String,

    /// Stable identity presented to the server. Assigned at enrollment;
    /// empty means not enrolled yet.
    #[serde(default)]
    pub agent_id: String,

    #[serde(default = "default_report_interval")]
    pub report_interval_secs: u64,

    /// Where undeliverable messages are queued on disk.
    #[serde(default = "default_buffer_path")]
    pub buffer_path: PathBuf,

    /// Mount points to report disk usage for. Empty means every real
    /// filesystem.
    #[serde(default)]
    pub disk_include: Vec<String>,
}

fn default_server_url() -> String {
    "ws://127.0.0.1:8080/api/agent/ws".to_string()
}

fn default_report_interval() -> u64 {
    10
}

fn default_buffer_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".pika")
        .join("outbound-buffer")
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            agent_id: String::new(),
            report_interval_secs: default_report_interval(),
            buffer_path: default_buffer_path(),
            disk_include: Vec::new(),
        }
    }
}

impl AgentConfig {
    pub fn load() -> AgentResult<Self> {
        Self::load_from_paths(default_config_paths())
    }

    pub fn load_from_paths(paths: Vec<PathBuf>) -> AgentResult<Self> {
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
        let agent_config: AgentConfig = config.try_deserialize().unwrap_or_default();

        agent_config.validate()?;
        Ok(agent_config)
    }

    pub fn validate(&self) -> AgentResult<()> {
        if self.server_url.is_empty() {
            return Err(AgentError::Config("server_url must not be empty".to_string()));
        }
        if self.report_interval_secs == 0 {
            return Err(AgentError::Config(
                "report_interval_secs must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        paths.push(cwd.join("pika-agent.toml"));
    }
    paths.push(PathBuf::from("/etc/pika/agent.toml"));
    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("pika").join("agent.toml"));
    }

    paths
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = AgentConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.report_interval_secs, 10);
        assert!(config.buffer_path.ends_with("outbound-buffer"));
    }

    #[test]
    fn test_zero_interval_rejected() {
        let config = AgentConfig {
            report_interval_secs: 0,
            ..AgentConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_without_files_uses_defaults() {
        let config = AgentConfig::load_from_paths(Vec::new()).unwrap();
        assert_eq!(config.server_url, default_server_url());
    }
}
