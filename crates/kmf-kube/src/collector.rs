//! Listing every selected kind from the source cluster

use kmf_core::{Kind, MigrationSettings};
use kube::api::DynamicObject;

use crate::cluster::ClusterApi;
use crate::error::{KubeError, Result};
use crate::inventory::ResourceInventory;
use crate::kinds::KindDescriptor;
use crate::resolver::NamespaceScope;

/// Annotation naming the service account a token secret belongs to
pub const SERVICE_ACCOUNT_ANNOTATION: &str = "kubernetes.io/service-account.name";

/// Builds a [`ResourceInventory`] from the source cluster
pub struct Collector<'a> {
    cluster: &'a dyn ClusterApi,
    settings: &'a MigrationSettings,
}

impl<'a> Collector<'a> {
    pub fn new(cluster: &'a dyn ClusterApi, settings: &'a MigrationSettings) -> Self {
        Self { cluster, settings }
    }

    /// Collect the selected kinds across `scope`
    ///
    /// Namespaced kinds are listed once per namespace, in scope order;
    /// cluster-scoped kinds are listed once. Any list failure aborts.
    pub async fn collect(&self, scope: &NamespaceScope) -> Result<ResourceInventory> {
        let mut inventory = ResourceInventory::new();
        inventory.extend(Kind::Namespace, scope.objects().iter().cloned());

        let names = scope.names();
        for kind in self.settings.kinds.selected() {
            if kind == Kind::Namespace {
                continue;
            }
            let descriptor = KindDescriptor::for_kind(kind);

            if descriptor.namespaced {
                for namespace in &names {
                    let objects = self.list(&descriptor, Some(namespace)).await?;
                    inventory.extend(kind, objects);
                }
            } else {
                let objects = self.list(&descriptor, None).await?;
                inventory.extend(kind, objects);
            }
        }

        for (kind, count) in inventory.counts() {
            tracing::info!(kind = %kind, count, "collected");
        }
        Ok(inventory)
    }

    async fn list(
        &self,
        descriptor: &KindDescriptor,
        namespace: Option<&str>,
    ) -> Result<Vec<DynamicObject>> {
        let kind = descriptor.kind;
        let listed = self
            .cluster
            .list(kind, namespace, None)
            .await
            .map_err(|source| KubeError::List {
                kind,
                namespace: namespace.map(str::to_string),
                source,
            })?;

        let mut kept = Vec::with_capacity(listed.len());
        for mut obj in listed {
            obj.types = Some(descriptor.type_meta());
            if descriptor.namespaced {
                if obj.metadata.namespace.is_none() {
                    obj.metadata.namespace = namespace.map(str::to_string);
                }
            } else {
                obj.metadata.namespace = None;
            }

            let name = obj.metadata.name.clone().unwrap_or_default();
            if self
                .settings
                .ignore
                .is_ignored(kind, obj.metadata.namespace.as_deref(), &name)
            {
                tracing::debug!(kind = %kind, namespace = ?obj.metadata.namespace, name = %name, "ignored");
                continue;
            }
            if kind == Kind::Secret && is_default_token(&obj) {
                tracing::debug!(namespace = ?obj.metadata.namespace, name = %name, "skipping default service account token");
                continue;
            }
            kept.push(obj);
        }
        Ok(kept)
    }
}

/// Whether a secret is the auto-generated token of the `default` service account
pub fn is_default_token(secret: &DynamicObject) -> bool {
    secret
        .metadata
        .annotations
        .as_ref()
        .and_then(|a| a.get(SERVICE_ACCOUNT_ANNOTATION))
        .is_some_and(|account| account == "default")
}
