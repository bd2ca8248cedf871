//! Error types for external tooling and registry operations

use std::time::Duration;

use thiserror::Error;

/// External tooling errors
#[derive(Debug, Error)]
pub enum RepoError {
    // ============ External Tool Errors ============
    #[error("Failed to run {tool}: {message}")]
    ToolSpawn { tool: String, message: String },

    #[error("{tool} {command} failed (exit code {code:?}): {output}")]
    ToolFailed {
        tool: String,
        command: String,
        code: Option<i32>,
        output: String,
    },

    // ============ Repository Configuration Errors ============
    #[error("No chart repositories configured. Add one before updating")]
    NoRepositories,

    #[error("Invalid repository URL: {url} - {reason}")]
    InvalidRepositoryUrl { url: String, reason: String },

    #[error("Invalid repository configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Timed out after {}s waiting for lock {path}", .timeout.as_secs())]
    LockTimeout { path: String, timeout: Duration },

    // ============ Network Errors ============
    #[error("HTTP error: {status} - {message}")]
    HttpError { status: u16, message: String },

    #[error("Network error: {message}")]
    NetworkError { message: String },

    #[error("Request to {url} timed out after {}s", .timeout.as_secs())]
    Timeout { url: String, timeout: Duration },

    #[error("{url} is not a valid chart repository: {message}")]
    InvalidIndex { url: String, message: String },

    // ============ Registry Errors ============
    #[error("Container registry error: {message}")]
    Registry { message: String },

    #[error("Identity lookup failed: {message}")]
    Identity { message: String },

    #[error(transparent)]
    Core(#[from] kmf_core::CoreError),

    // ============ IO Errors ============
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type for repository operations
pub type Result<T> = std::result::Result<T, RepoError>;

impl RepoError {
    /// Whether this error came from a failing helm or docker process
    pub fn is_external_tool(&self) -> bool {
        matches!(self, RepoError::ToolSpawn { .. } | RepoError::ToolFailed { .. })
    }
}

impl From<reqwest::Error> for RepoError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_connect() {
            RepoError::NetworkError {
                message: format!("Connection failed: {}", e),
            }
        } else if let Some(status) = e.status() {
            RepoError::HttpError {
                status: status.as_u16(),
                message: e.to_string(),
            }
        } else {
            RepoError::NetworkError {
                message: e.to_string(),
            }
        }
    }
}

impl From<serde_yaml::Error> for RepoError {
    fn from(e: serde_yaml::Error) -> Self {
        RepoError::Serialization(e.to_string())
    }
}

impl From<url::ParseError> for RepoError {
    fn from(e: url::ParseError) -> Self {
        RepoError::InvalidRepositoryUrl {
            url: String::new(),
            reason: e.to_string(),
        }
    }
}
