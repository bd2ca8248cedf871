//! kmf External Tooling
//!
//! This crate wraps everything kmf drives outside the cluster API:
//!
//! - **Helm**: `dependency build`, `upgrade --install` and `uninstall` per chart
//! - **Chart repositories**: helm's `repositories.yaml`, guarded by an
//!   inter-process lock, and a bounded concurrent index refresh
//! - **Container runtime**: `docker pull`/`tag`/`push`
//! - **Private registry**: ECR repositories and the STS caller identity
//! - **Image mirroring**: rewriting third-party images to private copies
//!
//! ## Example
//!
//! ```rust,no_run
//! use kmf_repo::{ChartRepositories, RepoPaths};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let repos = ChartRepositories::new(RepoPaths::from_env()?)?;
//! let report = repos.update_all().await?;
//! println!("updated {} repositories", report.updated.len());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod helm;
pub mod mirror;
pub mod mock;
mod process;
pub mod registry;
pub mod runtime;
pub mod update;

// Re-exports for convenience
pub use config::{FileLock, RepoPaths, RepositoryEntry, RepositoryFile, LOCK_TIMEOUT};
pub use error::{RepoError, Result};
pub use helm::{ChartManager, HelmCli};
pub use mirror::ImageMirror;
pub use registry::{
    registry_host, AwsContext, EcrRegistry, IdentityService, RegistryService, StsIdentity,
};
pub use runtime::{ContainerRuntime, DockerCli};
pub use update::{chart_repositories, ChartRepositories, UpdateReport};
