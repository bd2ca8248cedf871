//! kmf Kube - the cluster side of the Kubernetes migration factory
//!
//! This crate provides:
//! - **Connector**: kubeconfig + context to an authenticated, probed client
//! - **ClusterApi**: the object operations a migration needs, with an
//!   in-memory [`MockCluster`] for tests
//! - **Kind descriptors**: one table entry per supported kind driving the
//!   generic collect, sanitize and replicate code
//! - **Namespace resolver and collector**: the namespaces and objects a run covers
//! - **Sanitizer**: strips server-assigned identity so objects can be re-created
//! - **Image rewrite pass**: points Deployment and CronJob containers at mirrors
//! - **Helm export**: rebuilds chart directories from release secrets
//! - **Replicator**: ordered apply/delete against the destination
//! - **Migration**: the pipeline tying it all together
//!
//! ## Example
//!
//! ```rust,no_run
//! use kmf_core::{KindSelector, MigrationSettings, NamespaceSpec};
//! use kmf_kube::{ClusterEndpoint, Migration};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let source = ClusterEndpoint::new(None, Some("gke-prod".to_string())).connect().await?;
//! let destination = ClusterEndpoint::new(None, Some("eks-prod".to_string())).connect().await?;
//! let settings = MigrationSettings::new(NamespaceSpec::parse("shop")?, KindSelector::parse("all")?);
//!
//! let report = Migration::new(&source, &settings)
//!     .with_destination(&destination)
//!     .run()
//!     .await?;
//! println!("{} namespaces migrated", report.namespaces.len());
//! # Ok(())
//! # }
//! ```

pub mod cluster;
pub mod collector;
pub mod connect;
pub mod error;
pub mod executor;
pub mod helm;
pub mod images;
pub mod inventory;
pub mod kinds;
pub mod migrate;
pub mod resolver;
pub mod sanitize;

pub use cluster::{ClusterApi, ClusterCall, KubeCluster, MockCluster};
pub use collector::Collector;
pub use connect::ClusterEndpoint;
pub use error::{KubeError, Result};
pub use executor::{OperationSummary, Replicator, APPLY_ORDER, WEBHOOK_ORDER};
pub use helm::{chart_dir, HelmExporter, HelmRelease, EXPORT_DIR};
pub use images::rewrite_images;
pub use inventory::ResourceInventory;
pub use kinds::{descriptor_table, display_name, KindDescriptor};
pub use migrate::{Migration, MigrationReport};
pub use resolver::{resolve_namespaces, NamespaceScope};
pub use sanitize::{sanitize, sanitize_inventory};
