//! Display formatting for CLI output

use console::style;
use kmf_kube::{MigrationReport, OperationSummary};
use kmf_repo::UpdateReport;

/// Print what a migration collected, exported, mirrored and replicated
pub fn print_report(report: &MigrationReport) {
    println!(
        "{} Namespaces: {}",
        style("→").blue().bold(),
        style(report.namespaces.join(", ")).cyan()
    );

    if !report.collected.is_empty() {
        println!("\n{}", style("Collected:").bold());
        for (kind, count) in &report.collected {
            println!("  {:<32} {}", kind.as_str(), style(count).yellow());
        }
    }

    if !report.charts.is_empty() {
        println!("\n{}", style("Helm charts:").bold());
        for (namespace, release, path) in report.charts.iter() {
            println!(
                "  {}/{}  {}",
                style(namespace).yellow(),
                style(release).cyan(),
                style(path.display()).dim()
            );
        }
    }

    if !report.mirrored.is_empty() {
        println!("\n{}", style("Mirrored images:").bold());
        for record in &report.mirrored {
            println!("  {} → {}", record.original, style(&record.mirrored).cyan());
        }
    }

    if let Some(summary) = &report.summary {
        print_summary(report.action.to_string().as_str(), summary);
    }
}

fn print_summary(action: &str, summary: &OperationSummary) {
    for (name, reason) in &summary.skipped {
        println!("  {} {} ({})", style("-").dim(), name, style(reason).dim());
    }
    for (name, error) in &summary.failed {
        println!("  {} {}: {}", style("✗").red().bold(), name, style(error).red());
    }

    let mark = if summary.is_success() {
        style("✓").green().bold()
    } else {
        style("⚠").yellow().bold()
    };
    println!("\n{} {}: {}", mark, action, summary.summary());
}

pub fn print_update_report(report: &UpdateReport) {
    for name in &report.updated {
        println!(
            "{} Successfully got an update from the \"{}\" chart repository",
            style("✓").green(),
            style(name).cyan()
        );
    }
    for (name, error) in &report.failed {
        println!(
            "{} Unable to get an update from the \"{}\" chart repository: {}",
            style("⚠").yellow(),
            style(name).cyan(),
            error
        );
    }
}
