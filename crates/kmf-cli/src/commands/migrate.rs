//! Migrate command - the full pipeline against a destination cluster

use std::path::PathBuf;
use std::sync::Arc;

use console::style;
use kmf_core::{Action, MigrationSettings, MirrorSettings};
use kmf_kube::{ClusterEndpoint, Migration};
use kmf_repo::{
    AwsContext, ChartRepositories, DockerCli, EcrRegistry, HelmCli, ImageMirror, RepoPaths,
    StsIdentity,
};

use crate::display;
use crate::error::{CliError, Result};

/// External binaries the run shells out to
pub struct Tools {
    pub helm: PathBuf,
    pub docker: PathBuf,
}

pub async fn run(
    source: ClusterEndpoint,
    destination: ClusterEndpoint,
    settings: MigrationSettings,
    tools: Tools,
) -> Result<()> {
    println!("{} Connecting to source cluster", style("→").blue().bold());
    let source_cluster = source.connect().await?;
    println!("{} Connecting to destination cluster", style("→").blue().bold());
    let destination_cluster = destination.connect().await?;

    let helm = match &settings.chart_root {
        Some(_) => {
            let repositories = ChartRepositories::new(RepoPaths::from_env()?)?;
            Some(
                HelmCli::new()
                    .with_binary(tools.helm)
                    .with_target(destination.kubeconfig.clone(), destination.context.clone())
                    .with_repositories(repositories),
            )
        }
        None => None,
    };

    let mirror = match (&settings.mirror, settings.action) {
        (Some(mirror), Action::Deploy) => Some(image_mirror(mirror.clone(), tools.docker).await?),
        _ => None,
    };

    let mut migration =
        Migration::new(&source_cluster, &settings).with_destination(&destination_cluster);
    if let Some(helm) = &helm {
        migration = migration.with_charts(helm);
    }
    if let Some(mirror) = &mirror {
        migration = migration.with_mirror(mirror);
    }

    println!(
        "{} Running {} for {} kind(s)",
        style("→").blue().bold(),
        style(settings.action).cyan(),
        settings.kinds.selected().len()
    );
    let report = migration.run().await?;
    display::print_report(&report);

    match &report.summary {
        Some(summary) if !summary.is_success() => Err(CliError::PartialFailure {
            failed: summary.failed.len(),
        }),
        _ => Ok(()),
    }
}

async fn image_mirror(settings: MirrorSettings, docker: PathBuf) -> Result<ImageMirror> {
    let context = AwsContext::load(settings.region.clone()).await;
    let region = context.region()?;
    Ok(ImageMirror::new(
        settings,
        region,
        Arc::new(EcrRegistry::new(&context)),
        Arc::new(StsIdentity::new(&context)),
        Arc::new(DockerCli::with_binary(docker)),
    ))
}
