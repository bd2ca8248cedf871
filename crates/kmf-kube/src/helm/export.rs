//! Rebuilding chart directories from deployed releases

use std::path::{Component, Path, PathBuf};

use kmf_core::{HelmReleaseIndex, Kind, Values};

use super::release::{decode_release, is_deployed, HelmRelease, RELEASE_SELECTOR};
use crate::cluster::ClusterApi;
use crate::error::{KubeError, Result};

/// Directory created under the export root
pub const EXPORT_DIR: &str = "KMFHelmCharts";

/// `<root>/KMFHelmCharts/namespaces/<namespace>/<release>`
pub fn chart_dir(root: &Path, namespace: &str, release: &str) -> PathBuf {
    root.join(EXPORT_DIR)
        .join("namespaces")
        .join(namespace)
        .join(release)
}

/// Exports every deployed Helm release of the given namespaces to disk
pub struct HelmExporter<'a> {
    cluster: &'a dyn ClusterApi,
    root: &'a Path,
}

impl<'a> HelmExporter<'a> {
    pub fn new(cluster: &'a dyn ClusterApi, root: &'a Path) -> Self {
        Self { cluster, root }
    }

    /// Export the deployed releases of each namespace, in namespace order
    ///
    /// Revisions in any state other than `deployed` are skipped. The first
    /// secret that fails to decode aborts the export; files already written
    /// stay on disk.
    pub async fn export(&self, namespaces: &[String]) -> Result<HelmReleaseIndex> {
        let mut index = HelmReleaseIndex::new();
        for namespace in namespaces {
            let secrets = self
                .cluster
                .list(Kind::Secret, Some(namespace), Some(RELEASE_SELECTOR))
                .await
                .map_err(|source| KubeError::List {
                    kind: Kind::Secret,
                    namespace: Some(namespace.clone()),
                    source,
                })?;

            for mut secret in secrets {
                if !is_deployed(&secret) {
                    continue;
                }
                if secret.metadata.namespace.is_none() {
                    secret.metadata.namespace = Some(namespace.clone());
                }
                let release = decode_release(secret)?;
                let dir = self.write_release(namespace, &release)?;
                tracing::info!(namespace = %namespace, release = %release.name, path = %dir.display(), "exported chart");
                index.insert(namespace.as_str(), release.name.as_str(), dir);
            }
        }
        Ok(index)
    }

    /// Write one release's chart and return its directory
    pub fn write_release(&self, namespace: &str, release: &HelmRelease) -> Result<PathBuf> {
        let dir = chart_dir(self.root, namespace, &release.name);
        let decode_error = |message: String| KubeError::Decode {
            namespace: namespace.to_string(),
            secret: release.name.clone(),
            message,
        };

        for file in release.chart.templates.iter().chain(&release.chart.files) {
            let relative = safe_relative(&file.name).ok_or_else(|| {
                decode_error(format!("refusing to write outside the chart: {}", file.name))
            })?;
            let contents = file
                .contents()
                .map_err(|e| decode_error(format!("{}: {}", file.name, e)))?;
            write_file(&dir.join(relative), &contents)?;
        }

        let values = Values::for_release(release.chart.values.clone(), &release.config);
        write_file(&dir.join("values.yaml"), values.to_yaml()?.as_bytes())?;

        let chart_yaml = serde_yaml::to_string(&release.chart.metadata)?;
        write_file(&dir.join("Chart.yaml"), chart_yaml.as_bytes())?;

        if let Some(lock) = &release.chart.lock {
            write_file(&dir.join("Chart.lock"), serde_yaml::to_string(lock)?.as_bytes())?;
        }
        if let Some(schema) = &release.chart.schema {
            let schema = base64::Engine::decode(&base64::engine::general_purpose::STANDARD, schema)
                .map_err(|e| decode_error(format!("values schema: {}", e)))?;
            write_file(&dir.join("values.schema.json"), &schema)?;
        }
        Ok(dir)
    }
}

/// A recorded file name as a path that stays below the chart root
fn safe_relative(name: &str) -> Option<&Path> {
    let path = Path::new(name);
    let ok = !name.is_empty()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    ok.then_some(path)
}

fn write_file(path: &Path, contents: &[u8]) -> Result<()> {
    let export_error = |source: std::io::Error| KubeError::Export {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(export_error)?;
    }
    std::fs::write(path, contents).map_err(export_error)
}
