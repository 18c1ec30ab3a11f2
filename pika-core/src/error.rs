//! Error types for the Pika core library.
//!
//! One enum covers every server-side concern so errors compose across the
//! repo, storage, and service layers without wrapper noise.
//!
//! # Error Codes Reference
//!
//! | Code Range | Category | Description |
//! |------------|----------|-------------|
//! | E1001-E1099 | Database | Connection, query, and row mapping errors |
//! | E2001-E2099 | Config | Environment and configuration file errors |
//! | E3001-E3099 | Agent | Agent lookup and state errors |
//! | E4001-E4099 | Storage | Time-series engine request and response errors |
//! | E5001-E5099 | Transport | Push delivery to connected agents |
//! | E9001-E9099 | General | Serialization, IO, and internal errors |

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PikaError {
    // ========================================================================
    // Database Errors (E1001-E1099)
    // ========================================================================
    /// Database connection could not be established
    #[error("[E1001] Failed to connect to database: {0}")]
    DatabaseConnectionFailed(String),

    /// A query failed to execute or map
    #[error("[E1002] Database query failed: {0}")]
    DatabaseQueryFailed(String),

    // ========================================================================
    // Config Errors (E2001-E2099)
    // ========================================================================
    /// Missing required environment variable
    #[error("[E2001] Missing environment variable: {0}")]
    MissingEnvVar(String),

    /// Configuration loading or validation failed
    #[error("[E2002] Configuration error: {0}")]
    Config(String),

    // ========================================================================
    // Agent Errors (E3001-E3099)
    // ========================================================================
    /// Agent not found in the database
    #[error("[E3001] Agent not found: {0}")]
    AgentNotFound(String),

    // ========================================================================
    // Storage Errors (E4001-E4099)
    // ========================================================================
    /// Time-series engine request failed
    #[error("[E4001] Storage engine request failed: {0}")]
    StorageRequestFailed(String),

    /// Time-series engine returned a non-success status
    #[error("[E4002] Storage engine returned {status}: {body}")]
    StorageBadStatus { status: u16, body: String },

    /// Time-series engine response could not be decoded
    #[error("[E4003] Failed to parse storage engine response: {0}")]
    StorageParseError(String),

    // ========================================================================
    // Transport Errors (E5001-E5099)
    // ========================================================================
    /// Agent has no live connection
    #[error("[E5001] Agent '{0}' is not connected")]
    AgentNotConnected(String),

    /// Message could not be delivered to a connected agent
    #[error("[E5002] Failed to push message to agent '{agent_id}': {message}")]
    PushFailed { agent_id: String, message: String },

    // ========================================================================
    // General Errors (E9001-E9099)
    // ========================================================================
    /// JSON encode/decode failure
    #[error("[E9001] Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO failure
    #[error("[E9002] IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Catch-all for invariant violations
    #[error("[E9003] Internal error: {0}")]
    Internal(String),

    /// Caller asked for an operation the target does not support
    #[error("[E9004] Unsupported: {0}")]
    Unsupported(String),
}

impl From<sqlx::Error> for PikaError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Configuration(_) => PikaError::DatabaseConnectionFailed(err.to_string()),
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
                PikaError::DatabaseConnectionFailed(err.to_string())
            }
            _ => PikaError::DatabaseQueryFailed(err.to_string()),
        }
    }
}

impl From<reqwest::Error> for PikaError {
    fn from(err: reqwest::Error) -> Self {
        PikaError::StorageRequestFailed(err.to_string())
    }
}

impl From<config::ConfigError> for PikaError {
    fn from(err: config::ConfigError) -> Self {
        PikaError::Config(err.to_string())
    }
}

impl From<crate::db::DatabaseError> for PikaError {
    fn from(err: crate::db::DatabaseError) -> Self {
        match err {
            crate::db::DatabaseError::MissingEnvVar(name) => PikaError::MissingEnvVar(name),
            crate::db::DatabaseError::ConnectionFailed(e) => PikaError::from(e),
            crate::db::DatabaseError::InvalidConfig(message) => PikaError::Config(message),
        }
    }
}

impl PikaError {
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    pub fn push_failed(agent_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::PushFailed {
            agent_id: agent_id.into(),
            message: message.into(),
        }
    }

    pub fn is_database_error(&self) -> bool {
        matches!(
            self,
            PikaError::DatabaseConnectionFailed(_) | PikaError::DatabaseQueryFailed(_)
        )
    }

    pub fn is_storage_error(&self) -> bool {
        matches!(
            self,
            PikaError::StorageRequestFailed(_)
                | PikaError::StorageBadStatus { .. }
                | PikaError::StorageParseError(_)
        )
    }
}

/// Result type alias for Pika operations.
pub type PikaResult<T> = Result<T, PikaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_in_display() {
        let err = PikaError::AgentNotFound("a-1".to_string());
        assert!(err.to_string().starts_with("[E3001]"));

        let err = PikaError::StorageBadStatus {
            status: 500,
            body: "oom".to_string(),
        };
        assert!(err.to_string().contains("500"));
        assert!(err.is_storage_error());
    }

    #[test]
    fn test_from_serde_json() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: PikaError = parse_err.into();
        assert!(matches!(err, PikaError::Serialization(_)));
        assert!(!err.is_database_error());
    }
}
