//! Chart repository registration and index refresh

use std::path::{Path, PathBuf};
use std::time::Duration;

use futures::stream::{self, StreamExt};
use serde::Deserialize;

use crate::config::{is_http_repository, FileLock, RepoPaths, RepositoryEntry, RepositoryFile, LOCK_TIMEOUT};
use crate::error::{RepoError, Result};

/// Default number of repositories refreshed at once
pub const DEFAULT_CONCURRENCY: usize = 8;

/// Default per-request timeout for index downloads
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Outcome of refreshing every configured repository
#[derive(Debug, Clone, Default)]
pub struct UpdateReport {
    pub updated: Vec<String>,
    pub failed: Vec<(String, String)>,
}

#[derive(Debug, Deserialize)]
struct ChartFile {
    #[serde(default)]
    dependencies: Vec<ChartDependency>,
}

#[derive(Debug, Deserialize)]
struct ChartDependency {
    name: String,
    #[serde(default)]
    repository: String,
}

/// Helm chart repositories known to this machine
#[derive(Debug, Clone)]
pub struct ChartRepositories {
    paths: RepoPaths,
    client: reqwest::Client,
    timeout: Duration,
    concurrency: usize,
}

impl ChartRepositories {
    pub fn new(paths: RepoPaths) -> Result<Self> {
        Ok(Self {
            paths,
            client: http_client(REQUEST_TIMEOUT)?,
            timeout: REQUEST_TIMEOUT,
            concurrency: DEFAULT_CONCURRENCY,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.client = http_client(timeout)?;
        self.timeout = timeout;
        Ok(self)
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn paths(&self) -> &RepoPaths {
        &self.paths
    }

    /// Register the HTTP repositories a chart depends on, then refresh all indexes
    pub async fn sync_for_chart(&self, chart_dir: &Path) -> Result<()> {
        let wanted = chart_repositories(chart_dir)?;
        if wanted.is_empty() {
            return Ok(());
        }

        let added = self.add(wanted).await?;
        if !added.is_empty() {
            tracing::info!(repositories = ?added, "added chart repositories");
        }

        self.update_all().await?;
        Ok(())
    }

    /// Add repositories whose names are not configured yet
    ///
    /// Each new repository's index is downloaded before it is written to the
    /// repository file. Returns the names that were added.
    pub async fn add(&self, entries: Vec<RepositoryEntry>) -> Result<Vec<String>> {
        let _lock = FileLock::acquire(&self.paths.lock_path(), LOCK_TIMEOUT).await?;

        let mut file = RepositoryFile::load(&self.paths.config)?;
        let mut added = Vec::new();
        for entry in entries {
            if file.has(&entry.name) {
                tracing::debug!(repository = %entry.name, "repository already configured");
                continue;
            }
            self.download_index(&entry).await?;
            added.push(entry.name.clone());
            file.add(entry);
        }

        if !added.is_empty() {
            file.save(&self.paths.config)?;
        }
        Ok(added)
    }

    /// Refresh every configured repository index concurrently
    ///
    /// Individual failures are reported, not returned as errors.
    pub async fn update_all(&self) -> Result<UpdateReport> {
        let file = RepositoryFile::load(&self.paths.config)?;
        if file.repositories.is_empty() {
            return Err(RepoError::NoRepositories);
        }

        let results: Vec<(String, Result<PathBuf>)> = stream::iter(file.repositories)
            .map(|entry| async move {
                let result = self.download_index(&entry).await;
                (entry.name, result)
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let mut report = UpdateReport::default();
        for (name, result) in results {
            match result {
                Ok(_) => {
                    tracing::info!(repository = %name, "got an update from the chart repository");
                    report.updated.push(name);
                }
                Err(e) => {
                    tracing::warn!(repository = %name, error = %e, "unable to update chart repository");
                    report.failed.push((name, e.to_string()));
                }
            }
        }
        report.updated.sort();
        report.failed.sort();
        Ok(report)
    }

    async fn download_index(&self, entry: &RepositoryEntry) -> Result<PathBuf> {
        let url = entry.index_url();
        let request_error = |e: reqwest::Error| {
            if e.is_timeout() {
                RepoError::Timeout {
                    url: url.clone(),
                    timeout: self.timeout,
                }
            } else {
                RepoError::from(e)
            }
        };
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(request_error)?;
        let body = response.bytes().await.map_err(request_error)?;

        let index: serde_yaml::Value =
            serde_yaml::from_slice(&body).map_err(|e| RepoError::InvalidIndex {
                url: url.clone(),
                message: e.to_string(),
            })?;
        if index.get("entries").is_none() && index.get("apiVersion").is_none() {
            return Err(RepoError::InvalidIndex {
                url,
                message: "no apiVersion or entries".to_string(),
            });
        }

        let path = self.paths.index_path(&entry.name);
        tokio::fs::create_dir_all(&self.paths.cache).await?;
        tokio::fs::write(&path, &body).await?;
        Ok(path)
    }
}

fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| RepoError::NetworkError {
            message: e.to_string(),
        })
}

/// HTTP repositories a chart's `Chart.yaml` depends on, named after the dependency
pub fn chart_repositories(chart_dir: &Path) -> Result<Vec<RepositoryEntry>> {
    let path = chart_dir.join("Chart.yaml");
    let content = match std::fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };
    let chart: ChartFile = serde_yaml::from_str(&content)?;

    let mut entries: Vec<RepositoryEntry> = Vec::new();
    for dep in chart.dependencies {
        if !is_http_repository(&dep.repository) {
            continue;
        }
        url::Url::parse(&dep.repository).map_err(|e| RepoError::InvalidRepositoryUrl {
            url: dep.repository.clone(),
            reason: e.to_string(),
        })?;
        if entries.iter().any(|e| e.name == dep.name) {
            continue;
        }
        entries.push(RepositoryEntry::new(dep.name, dep.repository));
    }
    Ok(entries)
}
