//! In-memory doubles for the external tools, useful for tests that must not
//! reach a registry, a container runtime or the helm binary.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use crate::error::{RepoError, Result};
use crate::helm::ChartManager;
use crate::registry::{IdentityService, RegistryService};
use crate::runtime::ContainerRuntime;

fn tool_failure(tool: &str, command: &str) -> RepoError {
    RepoError::ToolFailed {
        tool: tool.to_string(),
        command: command.to_string(),
        code: Some(1),
        output: "mock failure".to_string(),
    }
}

/// Registry that keeps repositories in a map
#[derive(Clone, Default)]
pub struct MockRegistry {
    repositories: Arc<RwLock<BTreeMap<String, String>>>,
    created: Arc<RwLock<Vec<String>>>,
}

impl MockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_repositories<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        let registry = Self::new();
        {
            let mut repos = registry.repositories.write().unwrap();
            for name in names {
                repos.insert(name.to_string(), format!("mock.registry/{}", name));
            }
        }
        registry
    }

    /// Names of repositories created through the trait
    pub fn created(&self) -> Vec<String> {
        self.created.read().unwrap().clone()
    }
}

#[async_trait]
impl RegistryService for MockRegistry {
    async fn find_repository(&self, name: &str) -> Result<Option<String>> {
        Ok(self.repositories.read().unwrap().get(name).cloned())
    }

    async fn create_repository(&self, name: &str) -> Result<String> {
        let mut repos = self.repositories.write().unwrap();
        if repos.contains_key(name) {
            return Err(RepoError::Registry {
                message: format!("repository {} already exists", name),
            });
        }
        let uri = format!("mock.registry/{}", name);
        repos.insert(name.to_string(), uri.clone());
        self.created.write().unwrap().push(name.to_string());
        Ok(uri)
    }
}

/// Identity with a fixed account
#[derive(Clone)]
pub struct MockIdentity {
    account: String,
}

impl MockIdentity {
    pub fn new(account: impl Into<String>) -> Self {
        Self {
            account: account.into(),
        }
    }
}

#[async_trait]
impl IdentityService for MockIdentity {
    async fn account_id(&self) -> Result<String> {
        Ok(self.account.clone())
    }
}

/// Container runtime that records `pull`/`tag`/`push` calls
#[derive(Clone, Default)]
pub struct MockRuntime {
    calls: Arc<RwLock<Vec<String>>>,
    fail_on: Option<String>,
}

impl MockRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every call of one command (`pull`, `tag` or `push`)
    pub fn failing_on(command: &str) -> Self {
        Self {
            calls: Arc::default(),
            fail_on: Some(command.to_string()),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.read().unwrap().clone()
    }

    fn record(&self, command: &str, args: &[&str]) -> Result<()> {
        if self.fail_on.as_deref() == Some(command) {
            return Err(tool_failure("docker", command));
        }
        let mut line = command.to_string();
        for arg in args {
            line.push(' ');
            line.push_str(arg);
        }
        self.calls.write().unwrap().push(line);
        Ok(())
    }
}

#[async_trait]
impl ContainerRuntime for MockRuntime {
    async fn pull(&self, image: &str) -> Result<()> {
        self.record("pull", &[image])
    }

    async fn tag(&self, source: &str, target: &str) -> Result<()> {
        self.record("tag", &[source, target])
    }

    async fn push(&self, image: &str) -> Result<()> {
        self.record("push", &[image])
    }
}

/// One call made against [`MockChartManager`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChartCall {
    DependencyBuild { chart_dir: PathBuf },
    UpgradeInstall { release: String, namespace: String, chart_dir: PathBuf },
    Uninstall { release: String, namespace: String },
}

/// Chart manager that records calls and can fail selected releases
#[derive(Clone, Default)]
pub struct MockChartManager {
    calls: Arc<RwLock<Vec<ChartCall>>>,
    failing_releases: Arc<RwLock<Vec<String>>>,
}

impl MockChartManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make install and uninstall of `release` fail
    pub fn fail_release(&self, release: &str) {
        self.failing_releases.write().unwrap().push(release.to_string());
    }

    pub fn calls(&self) -> Vec<ChartCall> {
        self.calls.read().unwrap().clone()
    }

    fn fails(&self, release: &str) -> bool {
        self.failing_releases.read().unwrap().iter().any(|r| r == release)
    }
}

#[async_trait]
impl ChartManager for MockChartManager {
    async fn dependency_build(&self, chart_dir: &Path) -> Result<()> {
        self.calls.write().unwrap().push(ChartCall::DependencyBuild {
            chart_dir: chart_dir.to_path_buf(),
        });
        Ok(())
    }

    async fn upgrade_install(
        &self,
        release: &str,
        namespace: &str,
        chart_dir: &Path,
    ) -> Result<()> {
        self.calls.write().unwrap().push(ChartCall::UpgradeInstall {
            release: release.to_string(),
            namespace: namespace.to_string(),
            chart_dir: chart_dir.to_path_buf(),
        });
        if self.fails(release) {
            return Err(tool_failure("helm", "upgrade"));
        }
        Ok(())
    }

    async fn uninstall(&self, release: &str, namespace: &str) -> Result<()> {
        self.calls.write().unwrap().push(ChartCall::Uninstall {
            release: release.to_string(),
            namespace: namespace.to_string(),
        });
        if self.fails(release) {
            return Err(tool_failure("helm", "uninstall"));
        }
        Ok(())
    }
}
