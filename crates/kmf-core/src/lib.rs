//! kmf Core - Core types for the Kubernetes migration factory
//!
//! This crate provides the foundational types used throughout kmf:
//! - `Kind`: The fixed set of object kinds a migration can carry
//! - `KindSelector`: Which kinds a run collects and replicates
//! - `NamespaceSpec`: User namespace input ("all" or an explicit list)
//! - `ImageReference`: Parsed container image references and registry classes
//! - `HelmReleaseIndex`: Exported Helm charts, keyed by namespace and release
//! - `Values`: Chart values with deep merge support
//! - `MigrationSettings`: Everything a run is configured with

pub mod charts;
pub mod error;
pub mod image;
pub mod kind;
pub mod namespace;
pub mod settings;
pub mod values;

pub use charts::HelmReleaseIndex;
pub use error::{CoreError, Result};
pub use image::{ImageReference, RegistryClass, RegistryMirrorRecord};
pub use kind::{Kind, KindSelector};
pub use namespace::{NamespaceSpec, DEFAULT_RESERVED_NAMESPACES};
pub use settings::{Action, IgnoreList, MigrationSettings, MirrorSettings};
pub use values::Values;
