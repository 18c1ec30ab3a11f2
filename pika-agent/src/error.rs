use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Outbound buffer store error: {0}")]
    Buffer(#[from] sled::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Send failed: {0}")]
    Send(String),

    #[error("Metric collection failed: {0}")]
    Collect(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl AgentError {
    pub fn send(message: impl Into<String>) -> Self {
        Self::Send(message.into())
    }

    pub fn collect(message: impl Into<String>) -> Self {
        Self::Collect(message.into())
    }
}

impl From<config::ConfigError> for AgentError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

pub type AgentResult<T> = Result<T, AgentError>;
