//! Local container runtime used to copy images between registries

use std::path::PathBuf;

use async_trait::async_trait;

use crate::error::Result;
use crate::process::run_tool;

#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    async fn pull(&self, image: &str) -> Result<()>;
    async fn tag(&self, source: &str, target: &str) -> Result<()>;
    async fn push(&self, image: &str) -> Result<()>;
}

/// `docker` binary wrapper
#[derive(Debug, Clone)]
pub struct DockerCli {
    binary: PathBuf,
}

impl DockerCli {
    pub fn new() -> Self {
        Self {
            binary: PathBuf::from("docker"),
        }
    }

    pub fn with_binary(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    async fn docker(&self, args: &[&str]) -> Result<()> {
        let out = run_tool(&self.binary, args, None).await?;
        tracing::debug!(args = ?args, output = %out.trim(), "docker");
        Ok(())
    }
}

impl Default for DockerCli {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContainerRuntime for DockerCli {
    async fn pull(&self, image: &str) -> Result<()> {
        self.docker(&["pull", image]).await
    }

    async fn tag(&self, source: &str, target: &str) -> Result<()> {
        self.docker(&["tag", source, target]).await
    }

    async fn push(&self, image: &str) -> Result<()> {
        self.docker(&["push", image]).await
    }
}
