//! Error types for kmf-kube

use std::path::PathBuf;

use kmf_core::Kind;
use thiserror::Error;

/// Result type for kmf-kube operations
pub type Result<T> = std::result::Result<T, KubeError>;

/// Errors that can occur during a migration
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum KubeError {
    /// Cluster unreachable or credentials rejected
    #[error("cannot reach cluster: {message}")]
    Connection { message: String },

    /// Kubeconfig could not be read or understood
    #[error("cannot load kubeconfig {}: {message}", .path.display())]
    Kubeconfig { path: PathBuf, message: String },

    /// Requested context is not in the kubeconfig
    #[error("context '{context}' not found in {}", .path.display())]
    ContextNotFound { context: String, path: PathBuf },

    /// Explicitly requested namespace does not exist
    #[error("namespace '{namespace}' not found")]
    NamespaceNotFound { namespace: String },

    /// Listing objects of a kind failed during collection
    #[error("failed to list {kind}{}: {source}", .namespace.as_deref().map(|ns| format!(" in namespace '{ns}'")).unwrap_or_default())]
    List {
        kind: Kind,
        namespace: Option<String>,
        #[source]
        source: kube::Error,
    },

    /// Helm release payload could not be decoded
    #[error("cannot decode release secret '{secret}' in namespace '{namespace}': {message}")]
    Decode {
        namespace: String,
        secret: String,
        message: String,
    },

    /// Writing an exported chart failed
    #[error("cannot write chart file {}: {source}", .path.display())]
    Export {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// helm, docker or the registry failed
    #[error(transparent)]
    Tool(#[from] kmf_repo::RepoError),

    #[error(transparent)]
    Core(#[from] kmf_core::CoreError),

    /// Kubernetes API error
    #[error("Kubernetes API error: {0}")]
    Api(#[from] kube::Error),

    /// Object without the fields replication needs
    #[error("invalid object: {0}")]
    InvalidObject(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for KubeError {
    fn from(e: serde_json::Error) -> Self {
        KubeError::Serialization(e.to_string())
    }
}

impl From<serde_yaml::Error> for KubeError {
    fn from(e: serde_yaml::Error) -> Self {
        KubeError::Serialization(e.to_string())
    }
}

impl KubeError {
    /// Check if this is a Kubernetes 404 Not Found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, KubeError::Api(kube::Error::Api(resp)) if resp.code == 404)
    }

    /// Whether a helm or docker subprocess caused this
    pub fn is_external_tool(&self) -> bool {
        matches!(self, KubeError::Tool(e) if e.is_external_tool())
    }
}

/// Whether a kube error is a 404
pub(crate) fn api_not_found(e: &kube::Error) -> bool {
    matches!(e, kube::Error::Api(resp) if resp.code == 404)
}

/// Whether a kube error is a 409
pub(crate) fn api_conflict(e: &kube::Error) -> bool {
    matches!(e, kube::Error::Api(resp) if resp.code == 409)
}
