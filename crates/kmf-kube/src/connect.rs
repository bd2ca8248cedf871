//! Connecting to the source and destination clusters

use std::path::PathBuf;
use std::time::Duration;

use kube::{
    Client, Config,
    config::{KubeConfigOptions, Kubeconfig},
};

use crate::cluster::KubeCluster;
use crate::error::{KubeError, Result};

const API_READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Where to find a cluster's credentials
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClusterEndpoint {
    /// Kubeconfig file; `None` uses `$KUBECONFIG` or `~/.kube/config`
    pub kubeconfig: Option<PathBuf>,
    /// Context to use; `None` uses the kubeconfig's current context
    pub context: Option<String>,
}

impl ClusterEndpoint {
    pub fn new(kubeconfig: Option<PathBuf>, context: Option<String>) -> Self {
        Self {
            kubeconfig,
            context,
        }
    }

    fn display_path(&self) -> PathBuf {
        self.kubeconfig
            .clone()
            .unwrap_or_else(|| PathBuf::from("$KUBECONFIG"))
    }

    /// Load the kubeconfig and check the requested context exists
    pub fn load_kubeconfig(&self) -> Result<Kubeconfig> {
        let kubeconfig = match &self.kubeconfig {
            Some(path) => Kubeconfig::read_from(path),
            None => Kubeconfig::read(),
        }
        .map_err(|e| KubeError::Kubeconfig {
            path: self.display_path(),
            message: e.to_string(),
        })?;

        if let Some(context) = &self.context {
            if !kubeconfig.contexts.iter().any(|c| &c.name == context) {
                return Err(KubeError::ContextNotFound {
                    context: context.clone(),
                    path: self.display_path(),
                });
            }
        }
        Ok(kubeconfig)
    }

    /// Build an authenticated client and make sure the API server answers
    pub async fn connect(&self) -> Result<KubeCluster> {
        let kubeconfig = self.load_kubeconfig()?;
        let options = KubeConfigOptions {
            context: self.context.clone(),
            ..Default::default()
        };

        let mut config = Config::from_custom_kubeconfig(kubeconfig, &options)
            .await
            .map_err(|e| KubeError::Kubeconfig {
                path: self.display_path(),
                message: e.to_string(),
            })?;
        config.read_timeout = Some(API_READ_TIMEOUT);

        let client = Client::try_from(config).map_err(|e| KubeError::Connection {
            message: e.to_string(),
        })?;
        let version = client
            .apiserver_version()
            .await
            .map_err(|e| KubeError::Connection {
                message: e.to_string(),
            })?;

        tracing::info!(
            context = self.context.as_deref().unwrap_or("<current>"),
            server = %version.git_version,
            "connected to cluster"
        );
        Ok(KubeCluster::new(client))
    }
}
