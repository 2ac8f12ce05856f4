//! Upgrade command - reconcile value documents and deploy every release

use chartlock_engine::{Orchestrator, Outcome, UpgradeOptions, UpgradeReport, require_env};
use chartlock_kube::SpinnerReporter;
use console::style;

use super::GlobalArgs;
use crate::error::{CliError, Result};

pub async fn run(global: &GlobalArgs, options: &UpgradeOptions, allow_missing_env: bool) -> Result<()> {
    // contradictory filters fail before anything is loaded
    options.validate()?;

    let manifest = global.load_manifest()?;
    let resolution = global.resolve_env(&manifest)?;
    require_env(&resolution, allow_missing_env)?;

    if options.dry_run {
        println!("{} Dry run: nothing will be written or deployed", style("→").blue().bold());
    }

    let backend = global.backend();
    let reporter = SpinnerReporter::new();
    let report = Orchestrator::new(&backend, &manifest, global.root(), &resolution.env)
        .with_reporter(&reporter)
        .upgrade(options)
        .await?;

    print_report(&report);

    if report.is_success() {
        Ok(())
    } else {
        Err(CliError::UpgradeFailed {
            failed: report.failures().count(),
            total: report.entries.len(),
        })
    }
}

fn print_report(report: &UpgradeReport) {
    println!();
    for entry in &report.entries {
        match &entry.outcome {
            Outcome::Deployed => println!("{} {} deployed", style("✓").green().bold(), style(&entry.name).cyan()),
            Outcome::Unchanged => println!("{} {} unchanged", style("✓").green(), style(&entry.name).cyan()),
            Outcome::Skipped(reason) => {
                println!("{} {} skipped ({})", style("→").dim(), entry.name, reason)
            }
            Outcome::Reconciled => {
                println!("{} {} overrides:", style("→").blue().bold(), style(&entry.name).cyan());
                if let Some(preview) = &entry.preview {
                    for line in preview.lines() {
                        println!("  {}", line);
                    }
                }
            }
            Outcome::Failed(message) => {
                println!("{} {}: {}", style("✗").red().bold(), style(&entry.name).cyan(), message);
                if let Some(output) = &entry.output {
                    for line in output.lines() {
                        println!("  {}", style(line).dim());
                    }
                }
            }
        }
    }

    if report.aborted {
        println!("{} Stopped at the first failure", style("✗").red().bold());
    }
}
