//! The Helm package manager, driven through its command line

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::Result;
use crate::process::run_tool;
use crate::update::ChartRepositories;

/// Installs and removes chart releases on the destination cluster
#[async_trait]
pub trait ChartManager: Send + Sync {
    /// Fetch the chart's declared dependencies into its `charts/` directory
    async fn dependency_build(&self, chart_dir: &Path) -> Result<()>;

    /// Install the chart in `chart_dir` as `release`, upgrading it if present
    async fn upgrade_install(&self, release: &str, namespace: &str, chart_dir: &Path)
        -> Result<()>;

    /// Remove a release
    async fn uninstall(&self, release: &str, namespace: &str) -> Result<()>;
}

/// `helm` binary wrapper
#[derive(Debug, Clone)]
pub struct HelmCli {
    binary: PathBuf,
    kubeconfig: Option<PathBuf>,
    kube_context: Option<String>,
    repositories: Option<ChartRepositories>,
}

impl HelmCli {
    pub fn new() -> Self {
        Self {
            binary: PathBuf::from("helm"),
            kubeconfig: None,
            kube_context: None,
            repositories: None,
        }
    }

    pub fn with_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.binary = binary.into();
        self
    }

    /// Point every command at a specific cluster instead of the ambient kubeconfig
    pub fn with_target(mut self, kubeconfig: Option<PathBuf>, context: Option<String>) -> Self {
        self.kubeconfig = kubeconfig;
        self.kube_context = context;
        self
    }

    /// Register and refresh a chart's HTTP dependency repositories before building it
    pub fn with_repositories(mut self, repositories: ChartRepositories) -> Self {
        self.repositories = Some(repositories);
        self
    }

    fn target_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(path) = &self.kubeconfig {
            args.push("--kubeconfig".to_string());
            args.push(path.display().to_string());
        }
        if let Some(context) = &self.kube_context {
            args.push("--kube-context".to_string());
            args.push(context.clone());
        }
        args
    }

    async fn helm(&self, args: Vec<String>, cwd: Option<&Path>) -> Result<String> {
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        run_tool(&self.binary, &args, cwd).await
    }
}

impl Default for HelmCli {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChartManager for HelmCli {
    async fn dependency_build(&self, chart_dir: &Path) -> Result<()> {
        if let Some(repositories) = &self.repositories {
            repositories.sync_for_chart(chart_dir).await?;
        }
        let out = self
            .helm(vec!["dependency".into(), "build".into()], Some(chart_dir))
            .await?;
        tracing::debug!(chart = %chart_dir.display(), output = %out.trim(), "dependencies built");
        Ok(())
    }

    async fn upgrade_install(
        &self,
        release: &str,
        namespace: &str,
        chart_dir: &Path,
    ) -> Result<()> {
        let mut args: Vec<String> = vec![
            "upgrade".into(),
            "--install".into(),
            release.into(),
            ".".into(),
            "-n".into(),
            namespace.into(),
        ];
        args.extend(self.target_args());
        let out = self.helm(args, Some(chart_dir)).await?;
        tracing::debug!(release, namespace, output = %out.trim(), "release installed");
        Ok(())
    }

    async fn uninstall(&self, release: &str, namespace: &str) -> Result<()> {
        let mut args: Vec<String> = vec![
            "uninstall".into(),
            release.into(),
            "-n".into(),
            namespace.into(),
        ];
        args.extend(self.target_args());
        self.helm(args, None).await?;
        Ok(())
    }
}
