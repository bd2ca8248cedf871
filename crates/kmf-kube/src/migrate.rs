//! The migration pipeline
//!
//! resolve -> collect -> rewrite images -> sanitize -> export charts -> replicate

use std::path::Path;

use kmf_core::{Action, HelmReleaseIndex, Kind, MigrationSettings, RegistryMirrorRecord};
use kmf_repo::{ChartManager, ImageMirror};

use crate::cluster::ClusterApi;
use crate::collector::Collector;
use crate::error::Result;
use crate::executor::{OperationSummary, Replicator};
use crate::helm::HelmExporter;
use crate::images::rewrite_images;
use crate::inventory::ResourceInventory;
use crate::resolver::resolve_namespaces;
use crate::sanitize::sanitize_inventory;

/// What a run did
#[derive(Debug, Clone, Default)]
pub struct MigrationReport {
    pub action: Action,
    pub namespaces: Vec<String>,
    /// Collected objects per kind, in inventory order
    pub collected: Vec<(Kind, usize)>,
    pub charts: HelmReleaseIndex,
    pub mirrored: Vec<RegistryMirrorRecord>,
    /// `None` when nothing was replicated
    pub summary: Option<OperationSummary>,
}

impl MigrationReport {
    /// Whether every replicated object succeeded
    pub fn is_success(&self) -> bool {
        self.summary.as_ref().is_none_or(OperationSummary::is_success)
    }
}

/// One migration run between two clusters
pub struct Migration<'a> {
    source: &'a dyn ClusterApi,
    settings: &'a MigrationSettings,
    destination: Option<&'a dyn ClusterApi>,
    charts: Option<&'a dyn ChartManager>,
    mirror: Option<&'a ImageMirror>,
}

impl<'a> Migration<'a> {
    pub fn new(source: &'a dyn ClusterApi, settings: &'a MigrationSettings) -> Self {
        Self {
            source,
            settings,
            destination: None,
            charts: None,
            mirror: None,
        }
    }

    pub fn with_destination(mut self, destination: &'a dyn ClusterApi) -> Self {
        self.destination = Some(destination);
        self
    }

    pub fn with_charts(mut self, charts: &'a dyn ChartManager) -> Self {
        self.charts = Some(charts);
        self
    }

    pub fn with_mirror(mut self, mirror: &'a ImageMirror) -> Self {
        self.mirror = Some(mirror);
        self
    }

    /// Build the sanitized inventory, mirroring images (deploy only) and
    /// exporting charts when configured
    pub async fn prepare(&self) -> Result<ResourceInventory> {
        let settings = self.settings;
        let scope =
            resolve_namespaces(self.source, &settings.namespaces, &settings.reserved_namespaces)
                .await?;
        let names = scope.names();

        let mut inventory = Collector::new(self.source, settings).collect(&scope).await?;

        // A delete run only needs object identities
        if let (Some(mirror), Action::Deploy) = (self.mirror, settings.action) {
            rewrite_images(&mut inventory, mirror).await?;
        }

        sanitize_inventory(&mut inventory);

        if let Some(root) = &settings.chart_root {
            inventory.charts = HelmExporter::new(self.source, root).export(&names).await?;
        }
        Ok(inventory)
    }

    /// Run the whole pipeline
    ///
    /// Without a destination the run stops once the inventory is prepared.
    pub async fn run(&self) -> Result<MigrationReport> {
        let inventory = self.prepare().await?;
        let mut report = self.report(&inventory).await;

        if let Some(destination) = self.destination {
            let mut replicator = Replicator::new(destination, &self.settings.kinds);
            if let Some(charts) = self.charts {
                replicator = replicator.with_charts(charts);
            }
            report.summary = Some(replicator.run(self.settings.action, &inventory).await?);
        }
        Ok(report)
    }

    /// Resolve namespaces and export their deployed Helm releases only
    pub async fn export_charts(&self, root: &Path) -> Result<MigrationReport> {
        let settings = self.settings;
        let scope =
            resolve_namespaces(self.source, &settings.namespaces, &settings.reserved_namespaces)
                .await?;
        let namespaces = scope.names();
        let charts = HelmExporter::new(self.source, root).export(&namespaces).await?;

        Ok(MigrationReport {
            action: settings.action,
            namespaces,
            charts,
            ..Default::default()
        })
    }

    async fn report(&self, inventory: &ResourceInventory) -> MigrationReport {
        let mirrored = match self.mirror {
            Some(mirror) => mirror.records().await,
            None => Vec::new(),
        };
        MigrationReport {
            action: self.settings.action,
            namespaces: inventory.namespaces(),
            collected: inventory.counts(),
            charts: inventory.charts.clone(),
            mirrored,
            summary: None,
        }
    }
}
