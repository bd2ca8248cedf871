//! Export command - write the source cluster's Helm releases to disk

use std::path::Path;

use console::style;
use kmf_core::MigrationSettings;
use kmf_kube::{ClusterEndpoint, Migration, EXPORT_DIR};

use crate::display;
use crate::error::Result;

pub async fn run(source: ClusterEndpoint, settings: MigrationSettings, root: &Path) -> Result<()> {
    let cluster = source.connect().await?;
    let report = Migration::new(&cluster, &settings).export_charts(root).await?;
    display::print_report(&report);

    println!(
        "\n{} Exported {} chart(s) under {}",
        style("✓").green().bold(),
        report.charts.len(),
        style(root.join(EXPORT_DIR).display()).cyan()
    );
    Ok(())
}
