//! Repository management commands

use kmf_repo::{ChartRepositories, RepoPaths};

use crate::display;
use crate::error::Result;

/// Refresh every configured repository index
pub async fn update(concurrency: usize) -> Result<()> {
    let repositories = ChartRepositories::new(RepoPaths::from_env()?)?.with_concurrency(concurrency);

    println!("Hang tight while we grab the latest from your chart repositories...");
    let report = repositories.update_all().await?;
    display::print_update_report(&report);
    println!("Update Complete.");
    Ok(())
}
