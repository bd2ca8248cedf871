//! CLI error types with exit code handling
//!
//! Every library error ends up here, where it is turned into a diagnostic
//! and an exit code.

use kmf_kube::KubeError;
use kmf_repo::RepoError;
use miette::Diagnostic;
use thiserror::Error;

use crate::exit_codes;

/// CLI-specific error type that includes exit code information
#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    /// Invalid arguments
    #[error("{message}")]
    #[diagnostic(code(kmf::cli::usage))]
    Usage { message: String },

    /// Cluster unreachable or credentials rejected
    #[error("Connection failed: {message}")]
    #[diagnostic(code(kmf::cli::connection))]
    Connection {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Missing namespace or context
    #[error("{message}")]
    #[diagnostic(code(kmf::cli::not_found))]
    NotFound {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Listing the source failed
    #[error("Collection failed: {message}")]
    #[diagnostic(
        code(kmf::cli::collection),
        help("nothing was written to the destination; fix the source access and rerun")
    )]
    Collection { message: String },

    /// A Helm release secret could not be decoded
    #[error("Helm export failed: {message}")]
    #[diagnostic(code(kmf::cli::decode))]
    Decode { message: String },

    /// helm or docker failed
    #[error("{message}")]
    #[diagnostic(code(kmf::cli::external_tool))]
    ExternalTool { message: String },

    /// Replication finished with failed objects
    #[error("{failed} object(s) failed to replicate")]
    #[diagnostic(code(kmf::cli::partial_failure))]
    PartialFailure { failed: usize },

    /// Anything else
    #[error("{message}")]
    #[diagnostic(code(kmf::cli::error))]
    Other { message: String },
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Usage { .. } => exit_codes::USAGE_ERROR,
            CliError::Connection { .. } => exit_codes::CONNECTION_ERROR,
            CliError::NotFound { .. } => exit_codes::NOT_FOUND,
            CliError::Collection { .. } => exit_codes::COLLECTION_ERROR,
            CliError::Decode { .. } => exit_codes::DECODE_ERROR,
            CliError::ExternalTool { .. } => exit_codes::EXTERNAL_TOOL_ERROR,
            CliError::PartialFailure { .. } => exit_codes::PARTIAL_FAILURE,
            CliError::Other { .. } => exit_codes::ERROR,
        }
    }

    pub fn usage(message: impl Into<String>) -> Self {
        Self::Usage {
            message: message.into(),
        }
    }
}

impl From<KubeError> for CliError {
    fn from(err: KubeError) -> Self {
        let message = err.to_string();
        match err {
            KubeError::Connection { .. } => CliError::Connection {
                message,
                help: Some("check that the cluster is reachable and the credentials are valid".to_string()),
            },
            KubeError::Kubeconfig { .. } => CliError::Connection {
                message,
                help: Some("pass --source-kubeconfig / --destination-kubeconfig or set KUBECONFIG".to_string()),
            },
            KubeError::ContextNotFound { .. } => CliError::NotFound {
                message,
                help: Some("list the available contexts with `kubectl config get-contexts`".to_string()),
            },
            KubeError::NamespaceNotFound { .. } => CliError::NotFound {
                message,
                help: Some("namespaces are matched exactly against the source cluster".to_string()),
            },
            KubeError::List { .. } => CliError::Collection { message },
            KubeError::Decode { .. } => CliError::Decode { message },
            KubeError::Tool(e) => e.into(),
            _ => CliError::Other { message },
        }
    }
}

impl From<RepoError> for CliError {
    fn from(err: RepoError) -> Self {
        if err.is_external_tool() {
            CliError::ExternalTool {
                message: err.to_string(),
            }
        } else {
            CliError::Other {
                message: err.to_string(),
            }
        }
    }
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        let err: CliError = KubeError::NamespaceNotFound {
            namespace: "ghost".to_string(),
        }
        .into();
        assert_eq!(err.exit_code(), exit_codes::NOT_FOUND);

        let err: CliError = KubeError::Connection {
            message: "refused".to_string(),
        }
        .into();
        assert_eq!(err.exit_code(), exit_codes::CONNECTION_ERROR);

        let err: CliError = KubeError::Tool(RepoError::ToolFailed {
            tool: "helm".to_string(),
            command: "helm upgrade".to_string(),
            code: Some(1),
            output: "boom".to_string(),
        })
        .into();
        assert_eq!(err.exit_code(), exit_codes::EXTERNAL_TOOL_ERROR);

        assert_eq!(CliError::PartialFailure { failed: 2 }.exit_code(), 7);
        assert_eq!(CliError::usage("bad").exit_code(), 64);
    }
}
