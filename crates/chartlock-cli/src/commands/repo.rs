//! Repo command - manage the chart repositories releases install from

use chartlock_core::Repo;
use chartlock_kube::{ProgressGuard, RepoManager, SpinnerReporter};
use console::style;

use super::GlobalArgs;
use crate::error::{CliError, Result};

pub fn list(global: &GlobalArgs) -> Result<()> {
    let manifest = global.load_manifest()?;
    if manifest.repos.is_empty() {
        println!("No repositories configured");
        return Ok(());
    }

    let width = manifest.repos.iter().map(|r| r.name.len()).max().unwrap_or(0);
    for repo in &manifest.repos {
        println!("{:width$}  {}", repo.name, style(&repo.url).dim(), width = width);
    }
    Ok(())
}

pub fn add(global: &GlobalArgs, name: &str, url: &str) -> Result<()> {
    let mut manifest = global.load_manifest()?;
    if manifest.repo(name).is_some() {
        return Err(CliError::usage_with_help(
            format!("Repository '{}' already exists", name),
            "Remove it first with `chartlock repo remove`",
        ));
    }

    manifest.repos.push(Repo {
        name: name.to_string(),
        url: url.to_string(),
    });
    manifest.save_to(&global.manifest)?;

    println!("{} Added repository {}", style("✓").green().bold(), style(name).cyan());
    Ok(())
}

pub fn remove(global: &GlobalArgs, name: &str) -> Result<()> {
    let mut manifest = global.load_manifest()?;

    let users: Vec<&str> = manifest
        .releases
        .iter()
        .filter(|r| r.chart.repo.eq_ignore_ascii_case(name))
        .map(|r| r.name.as_str())
        .collect();
    if !users.is_empty() {
        return Err(CliError::usage(format!(
            "Repository '{}' is used by: {}",
            name,
            users.join(", ")
        )));
    }

    let before = manifest.repos.len();
    manifest.repos.retain(|r| !r.name.eq_ignore_ascii_case(name));
    if manifest.repos.len() == before {
        return Err(CliError::usage(format!("Repository '{}' not found", name)));
    }
    manifest.save_to(&global.manifest)?;

    println!("{} Removed repository {}", style("✓").green().bold(), style(name).cyan());
    Ok(())
}

/// Make helm's repository list match the manifest and refresh indexes
pub async fn sync(global: &GlobalArgs) -> Result<()> {
    let manifest = global.load_manifest()?;
    let backend = global.backend();
    let reporter = SpinnerReporter::new();

    let guard = ProgressGuard::start(&reporter, "Syncing chart repositories", "Failed to sync chart repositories");
    backend
        .sync(&manifest.repos)
        .await
        .map_err(|err| CliError::Deploy { message: err.to_string() })?;
    guard.succeed(&format!("Synced {} repositories", manifest.repos.len()));
    Ok(())
}
