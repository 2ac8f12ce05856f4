//! Uninstall command - remove a release or single from the cluster and the manifest

use chartlock_engine::{EntryKind, UninstallOptions, uninstall};
use console::style;

use super::{GlobalArgs, display_path};
use crate::error::Result;

pub async fn run(global: &GlobalArgs, name: &str, options: UninstallOptions) -> Result<()> {
    let mut manifest = global.load_manifest()?;
    let resolution = global.resolve_env(&manifest)?;
    let backend = global.backend();

    println!("{} Uninstalling {}", style("→").blue().bold(), style(name).cyan());
    let result = uninstall(&backend, &mut manifest, &global.manifest, &resolution.env, name, options).await?;

    if !result.output.trim().is_empty() {
        println!("{}", result.output.trim_end());
    }

    let what = match result.kind {
        EntryKind::Chart => "release",
        EntryKind::Single => "single",
    };
    if options.dry_run {
        println!("{} Dry run: {} {} left in the manifest", style("→").blue().bold(), what, name);
        return Ok(());
    }

    println!("{} Uninstalled {} {}", style("✓").green().bold(), what, style(name).cyan());
    if let Some(file) = &result.removed_file {
        println!("  Deleted {}", display_path(file));
    }
    Ok(())
}
