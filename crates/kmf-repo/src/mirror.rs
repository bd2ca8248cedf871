//! Copying third-party images into the private registry

use std::sync::Arc;

use kmf_core::{ImageReference, MirrorSettings, RegistryMirrorRecord};
use tokio::sync::{Mutex, OnceCell};

use crate::error::Result;
use crate::registry::{registry_host, IdentityService, RegistryService};
use crate::runtime::ContainerRuntime;

/// Rewrites image references to private registry copies, mirroring on first use
pub struct ImageMirror {
    settings: MirrorSettings,
    region: String,
    registry: Arc<dyn RegistryService>,
    identity: Arc<dyn IdentityService>,
    runtime: Arc<dyn ContainerRuntime>,
    host: OnceCell<String>,
    records: Mutex<Vec<RegistryMirrorRecord>>,
}

impl ImageMirror {
    pub fn new(
        settings: MirrorSettings,
        region: impl Into<String>,
        registry: Arc<dyn RegistryService>,
        identity: Arc<dyn IdentityService>,
        runtime: Arc<dyn ContainerRuntime>,
    ) -> Self {
        Self {
            settings,
            region: region.into(),
            registry,
            identity,
            runtime,
            host: OnceCell::new(),
            records: Mutex::new(Vec::new()),
        }
    }

    /// The reference `image` should be deployed with
    ///
    /// Images from registries outside the allow-list come back unchanged.
    /// Allow-listed images are pulled, retagged below the private registry
    /// host and pushed; the destination repository is created if missing.
    pub async fn rewrite(&self, image: &str) -> Result<String> {
        let reference = match ImageReference::parse(image) {
            Ok(reference) => reference,
            Err(e) => {
                tracing::warn!(image, error = %e, "leaving unparseable image reference as is");
                return Ok(image.to_string());
            }
        };

        if !self.settings.allows(reference.registry()) {
            return Ok(image.to_string());
        }

        let mut records = self.records.lock().await;
        if let Some(record) = records.iter().find(|r| r.original == image) {
            return Ok(record.mirrored.clone());
        }

        let host = self
            .host
            .get_or_try_init(|| async {
                let account = self.identity.account_id().await?;
                Ok::<_, crate::error::RepoError>(registry_host(&account, &self.region))
            })
            .await?;

        match self.registry.find_repository(&reference.path).await? {
            Some(uri) => tracing::debug!(repository = %reference.path, %uri, "reusing repository"),
            None => {
                let uri = self.registry.create_repository(&reference.path).await?;
                tracing::info!(repository = %reference.path, %uri, "created repository");
            }
        }

        let mirrored = reference.mirrored_at(host);
        self.runtime.pull(image).await?;
        self.runtime.tag(image, &mirrored).await?;
        self.runtime.push(&mirrored).await?;
        tracing::info!(image, mirrored = %mirrored, "mirrored image");

        records.push(RegistryMirrorRecord {
            original: image.to_string(),
            mirrored: mirrored.clone(),
        });
        Ok(mirrored)
    }

    /// Images mirrored so far, in the order they were first seen
    pub async fn records(&self) -> Vec<RegistryMirrorRecord> {
        self.records.lock().await.clone()
    }
}
