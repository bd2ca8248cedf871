//! Ordered apply and delete against the destination cluster
//!
//! Object failures are recorded in the [`OperationSummary`] and the run moves
//! on to the next object. Chart installs are the exception: a failed
//! dependency build or install aborts the run.

use kmf_core::{Action, Kind, KindSelector};
use kmf_repo::ChartManager;
use kube::api::DynamicObject;

use crate::cluster::ClusterApi;
use crate::error::{api_conflict, api_not_found, Result};
use crate::inventory::ResourceInventory;
use crate::kinds::display_name;

/// Admission webhooks, applied before anything else
pub const WEBHOOK_ORDER: [Kind; 2] = [
    Kind::MutatingWebhookConfiguration,
    Kind::ValidatingWebhookConfiguration,
];

/// Kinds replicated per namespace, after namespaces and charts
pub const APPLY_ORDER: [Kind; 17] = [
    Kind::Secret,
    Kind::ConfigMap,
    Kind::StorageClass,
    Kind::PersistentVolumeClaim,
    Kind::Deployment,
    Kind::Service,
    Kind::DaemonSet,
    Kind::Ingress,
    Kind::Role,
    Kind::RoleBinding,
    Kind::CronJob,
    Kind::Job,
    Kind::ClusterRole,
    Kind::ClusterRoleBinding,
    Kind::HorizontalPodAutoscaler,
    Kind::PodSecurityPolicy,
    Kind::ServiceAccount,
];

/// Summary of apply/delete operations
#[derive(Debug, Clone, Default)]
pub struct OperationSummary {
    /// Successfully processed objects and charts
    pub succeeded: Vec<String>,
    /// Failed objects with errors
    pub failed: Vec<(String, String)>,
    /// Skipped objects with the reason
    pub skipped: Vec<(String, String)>,
}

impl OperationSummary {
    /// Check if all operations succeeded
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len() + self.skipped.len()
    }

    /// Format as human-readable summary
    pub fn summary(&self) -> String {
        let mut parts = Vec::with_capacity(3);
        if !self.succeeded.is_empty() {
            parts.push(format!("{} succeeded", self.succeeded.len()));
        }
        if !self.failed.is_empty() {
            parts.push(format!("{} failed", self.failed.len()));
        }
        if !self.skipped.is_empty() {
            parts.push(format!("{} skipped", self.skipped.len()));
        }
        if parts.is_empty() {
            "No resources processed".to_string()
        } else {
            parts.join(", ")
        }
    }
}

/// Replays a sanitized inventory onto the destination
pub struct Replicator<'a> {
    cluster: &'a dyn ClusterApi,
    kinds: &'a KindSelector,
    charts: Option<&'a dyn ChartManager>,
}

impl<'a> Replicator<'a> {
    pub fn new(cluster: &'a dyn ClusterApi, kinds: &'a KindSelector) -> Self {
        Self {
            cluster,
            kinds,
            charts: None,
        }
    }

    pub fn with_charts(mut self, charts: &'a dyn ChartManager) -> Self {
        self.charts = Some(charts);
        self
    }

    pub async fn run(&self, action: Action, inventory: &ResourceInventory) -> Result<OperationSummary> {
        match action {
            Action::Deploy => self.apply(inventory).await,
            Action::Delete => self.delete(inventory).await,
        }
    }

    /// Create everything in dependency order
    ///
    /// Webhooks, then namespaces, then exported charts, then each namespace's
    /// objects in [`APPLY_ORDER`]. Cluster-scoped kinds in that order are
    /// created once, during the first namespace's pass.
    pub async fn apply(&self, inventory: &ResourceInventory) -> Result<OperationSummary> {
        let mut summary = OperationSummary::default();

        for kind in WEBHOOK_ORDER {
            if self.kinds.contains(kind) {
                for obj in inventory.objects(kind) {
                    self.create(kind, obj, &mut summary).await;
                }
            }
        }

        for obj in inventory.objects(Kind::Namespace) {
            self.create(Kind::Namespace, obj, &mut summary).await;
        }

        self.install_charts(inventory, &mut summary).await?;

        for (index, namespace) in namespace_passes(inventory).iter().enumerate() {
            for kind in APPLY_ORDER {
                if !self.kinds.contains(kind) {
                    continue;
                }
                for obj in pass_objects(inventory, kind, namespace.as_deref(), index == 0) {
                    self.create(kind, obj, &mut summary).await;
                }
            }
        }

        tracing::info!(summary = %summary.summary(), "apply finished");
        Ok(summary)
    }

    /// Remove everything in reverse dependency order
    ///
    /// Charts are uninstalled first, then each namespace's objects in reverse
    /// [`APPLY_ORDER`], then webhooks, and the namespaces themselves last.
    /// Uninstall failures are logged and never abort the run.
    pub async fn delete(&self, inventory: &ResourceInventory) -> Result<OperationSummary> {
        let mut summary = OperationSummary::default();

        self.uninstall_charts(inventory, &mut summary).await;

        for (index, namespace) in namespace_passes(inventory).iter().enumerate() {
            for kind in APPLY_ORDER.into_iter().rev() {
                if !self.kinds.contains(kind) {
                    continue;
                }
                for obj in pass_objects(inventory, kind, namespace.as_deref(), index == 0) {
                    self.remove(kind, obj, &mut summary).await;
                }
            }
        }

        for kind in WEBHOOK_ORDER.into_iter().rev() {
            if self.kinds.contains(kind) {
                for obj in inventory.objects(kind) {
                    self.remove(kind, obj, &mut summary).await;
                }
            }
        }

        for obj in inventory.objects(Kind::Namespace) {
            self.remove(Kind::Namespace, obj, &mut summary).await;
        }

        tracing::info!(summary = %summary.summary(), "delete finished");
        Ok(summary)
    }

    async fn create(&self, kind: Kind, obj: &DynamicObject, summary: &mut OperationSummary) {
        let name = display_name(kind, obj);
        match self.cluster.create(kind, obj).await {
            Ok(_) => {
                tracing::debug!(object = %name, "created");
                summary.succeeded.push(format!("{} (created)", name));
            }
            Err(e) if api_conflict(&e) => {
                tracing::debug!(object = %name, "already exists");
                summary.skipped.push((name, "already exists".to_string()));
            }
            Err(e) => {
                tracing::warn!(object = %name, error = %e, "create failed");
                summary.failed.push((name, e.to_string()));
            }
        }
    }

    async fn remove(&self, kind: Kind, obj: &DynamicObject, summary: &mut OperationSummary) {
        let name = display_name(kind, obj);
        let Some(object_name) = obj.metadata.name.as_deref() else {
            summary.skipped.push((name, "object has no name".to_string()));
            return;
        };
        match self
            .cluster
            .delete(kind, obj.metadata.namespace.as_deref(), object_name)
            .await
        {
            Ok(()) => {
                tracing::debug!(object = %name, "deleted");
                summary.succeeded.push(format!("{} (deleted)", name));
            }
            Err(e) if api_not_found(&e) => {
                summary.skipped.push((name, "not found".to_string()));
            }
            Err(e) => {
                tracing::warn!(object = %name, error = %e, "delete failed");
                summary.failed.push((name, e.to_string()));
            }
        }
    }

    async fn install_charts(
        &self,
        inventory: &ResourceInventory,
        summary: &mut OperationSummary,
    ) -> Result<()> {
        for (namespace, release, dir) in inventory.charts.iter() {
            let label = format!("Chart {}/{}", namespace, release);
            let Some(charts) = self.charts else {
                summary.skipped.push((label, "no chart manager configured".to_string()));
                continue;
            };
            tracing::info!(namespace, release, "installing chart");
            charts.dependency_build(dir).await?;
            charts.upgrade_install(release, namespace, dir).await?;
            summary.succeeded.push(format!("{} (installed)", label));
        }
        Ok(())
    }

    async fn uninstall_charts(&self, inventory: &ResourceInventory, summary: &mut OperationSummary) {
        for (namespace, release, _) in inventory.charts.iter() {
            let label = format!("Chart {}/{}", namespace, release);
            let Some(charts) = self.charts else {
                summary.skipped.push((label, "no chart manager configured".to_string()));
                continue;
            };
            match charts.uninstall(release, namespace).await {
                Ok(()) => summary.succeeded.push(format!("{} (uninstalled)", label)),
                Err(e) => {
                    tracing::warn!(namespace, release, error = %e, "uninstall failed, continuing");
                    summary.skipped.push((label, format!("uninstall failed: {}", e)));
                }
            }
        }
    }
}

/// One pass per collected namespace, or a single cluster-only pass when
/// there are none
fn namespace_passes(inventory: &ResourceInventory) -> Vec<Option<String>> {
    let namespaces = inventory.namespaces();
    if namespaces.is_empty() {
        vec![None]
    } else {
        namespaces.into_iter().map(Some).collect()
    }
}

/// Objects of `kind` handled during one namespace pass
fn pass_objects<'i>(
    inventory: &'i ResourceInventory,
    kind: Kind,
    namespace: Option<&str>,
    first_pass: bool,
) -> Vec<&'i DynamicObject> {
    if !kind.is_namespaced() {
        return if first_pass {
            inventory.objects(kind).iter().collect()
        } else {
            Vec::new()
        };
    }
    match namespace {
        Some(ns) => inventory
            .objects(kind)
            .iter()
            .filter(|obj| obj.metadata.namespace.as_deref() == Some(ns))
            .collect(),
        None => Vec::new(),
    }
}
