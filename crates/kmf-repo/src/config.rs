//! Helm chart repository configuration
//!
//! Reads and writes the `repositories.yaml` file the `helm` binary uses, so
//! repositories added here are visible to `helm dependency build`.

use std::collections::BTreeMap;
use std::fs::{File, OpenOptions, TryLockError};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::error::{RepoError, Result};

/// How long to wait for another process holding the repository file lock
pub const LOCK_TIMEOUT: Duration = Duration::from_secs(30);

const LOCK_RETRY_INTERVAL: Duration = Duration::from_millis(250);

/// Locations of the repository file and index cache
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoPaths {
    pub config: PathBuf,
    pub cache: PathBuf,
}

impl RepoPaths {
    pub fn new(config: impl Into<PathBuf>, cache: impl Into<PathBuf>) -> Self {
        Self {
            config: config.into(),
            cache: cache.into(),
        }
    }

    /// Resolve paths the way helm does: environment first, then user directories
    pub fn from_env() -> Result<Self> {
        let config = match std::env::var_os("HELM_REPOSITORY_CONFIG") {
            Some(path) => PathBuf::from(path),
            None => dirs::config_dir()
                .ok_or_else(|| RepoError::InvalidConfig {
                    message: "Could not determine config directory".to_string(),
                })?
                .join("helm")
                .join("repositories.yaml"),
        };
        let cache = match std::env::var_os("HELM_REPOSITORY_CACHE") {
            Some(path) => PathBuf::from(path),
            None => dirs::cache_dir()
                .ok_or_else(|| RepoError::InvalidConfig {
                    message: "Could not determine cache directory".to_string(),
                })?
                .join("helm")
                .join("repository"),
        };
        Ok(Self { config, cache })
    }

    /// Lock file next to the repository file
    pub fn lock_path(&self) -> PathBuf {
        self.config.with_extension("lock")
    }

    /// Where the downloaded index of a repository is cached
    pub fn index_path(&self, repo_name: &str) -> PathBuf {
        self.cache.join(format!("{}-index.yaml", repo_name))
    }
}

/// Helm `repositories.yaml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryFile {
    #[serde(default)]
    pub api_version: String,

    #[serde(default)]
    pub generated: Option<String>,

    #[serde(default)]
    pub repositories: Vec<RepositoryEntry>,
}

/// One configured chart repository
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositoryEntry {
    pub name: String,
    pub url: String,

    /// Credentials and TLS settings, preserved as written
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

impl RepositoryEntry {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            extra: BTreeMap::new(),
        }
    }

    pub fn index_url(&self) -> String {
        format!("{}/index.yaml", self.url.trim_end_matches('/'))
    }
}

impl RepositoryFile {
    /// Load the file, or an empty configuration if it does not exist yet
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) if content.trim().is_empty() => Ok(Self::default()),
            Ok(content) => Ok(serde_yaml::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn save(&mut self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        self.generated = Some(chrono::Utc::now().to_rfc3339());
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn has(&self, name: &str) -> bool {
        self.repositories.iter().any(|r| r.name == name)
    }

    pub fn get(&self, name: &str) -> Option<&RepositoryEntry> {
        self.repositories.iter().find(|r| r.name == name)
    }

    /// Add an entry unless one with the same name exists; returns whether it was added
    pub fn add(&mut self, entry: RepositoryEntry) -> bool {
        if self.has(&entry.name) {
            return false;
        }
        self.repositories.push(entry);
        true
    }
}

/// Exclusive inter-process lock, released on drop
#[derive(Debug)]
pub struct FileLock {
    file: File,
    path: PathBuf,
}

impl FileLock {
    /// Wait up to `timeout` for the lock at `path`
    pub async fn acquire(path: &Path, timeout: Duration) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(path)?;

        let deadline = Instant::now() + timeout;
        loop {
            match file.try_lock() {
                Ok(()) => {
                    return Ok(Self {
                        file,
                        path: path.to_path_buf(),
                    });
                }
                Err(TryLockError::WouldBlock) if Instant::now() < deadline => {
                    tokio::time::sleep(LOCK_RETRY_INTERVAL).await;
                }
                Err(TryLockError::WouldBlock) => {
                    return Err(RepoError::LockTimeout {
                        path: path.display().to_string(),
                        timeout,
                    });
                }
                Err(TryLockError::Error(e)) => return Err(e.into()),
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        if let Err(e) = self.file.unlock() {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to release lock");
        }
    }
}

/// Whether a chart dependency repository can be added as a named HTTP repo
pub fn is_http_repository(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}
