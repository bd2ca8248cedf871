//! Helm release export
//!
//! Deployed releases are read back out of Helm's release secrets and turned
//! into chart directories that `helm upgrade --install` can deploy again.

pub mod export;
pub mod release;

pub use export::{chart_dir, HelmExporter, EXPORT_DIR};
pub use release::{decode_release, is_deployed, ChartFile, HelmChart, HelmRelease};
