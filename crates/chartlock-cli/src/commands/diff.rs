//! Diff command - show what an upgrade would write for one release

use chartlock_engine::{DocumentDiff, LineType, Orchestrator, require_env};
use console::style;

use super::{GlobalArgs, display_path};
use crate::error::Result;

pub async fn run(global: &GlobalArgs, release: &str, allow_missing_env: bool) -> Result<()> {
    let manifest = global.load_manifest()?;
    let resolution = global.resolve_env(&manifest)?;
    require_env(&resolution, allow_missing_env)?;

    let backend = global.backend();
    let orchestrator = Orchestrator::new(&backend, &manifest, global.root(), &resolution.env);
    let rec = orchestrator.plan(release).await?;
    let diff = DocumentDiff::of(&rec);

    let path = manifest
        .release(release)
        .map(|r| display_path(&r.values_path(orchestrator.root())))
        .unwrap_or_default();

    if !diff.has_changes() {
        println!("{} {} is up to date", style("✓").green().bold(), style(path).cyan());
        return Ok(());
    }

    println!("--- {}", path);
    println!("+++ {} (reconciled)", path);
    for line in &diff.lines {
        match line.line_type {
            LineType::Added => println!("{}", style(format!("+{}", line.content)).green()),
            LineType::Removed => println!("{}", style(format!("-{}", line.content)).red()),
            LineType::Context => println!(" {}", line.content),
        }
    }

    let (added, removed) = diff.counts();
    println!();
    println!(
        "{} {} line(s) added, {} removed",
        style("→").blue().bold(),
        added,
        removed
    );
    Ok(())
}
