//! Env command - manage and check the allowed environment variables
//!
//! Values are never printed, only whether each allowed name resolves.

use console::style;

use super::GlobalArgs;
use crate::error::Result;

/// Show every allowed name and whether it resolves
pub fn list(global: &GlobalArgs) -> Result<()> {
    let manifest = global.load_manifest()?;
    if manifest.allowed_env.is_empty() {
        println!("No environment variables are allowed");
        return Ok(());
    }

    let resolution = global.resolve_env(&manifest)?;
    for name in &manifest.allowed_env {
        let name = name.to_uppercase();
        if resolution.env.get(&name).is_some() {
            println!("{} {}", style("✓").green().bold(), name);
        } else {
            println!("{} {} {}", style("✗").red().bold(), name, style("(not set)").dim());
        }
    }
    for name in &resolution.disallowed {
        println!("{} {} {}", style("!").yellow().bold(), name, style("(set but not allowed)").dim());
    }
    Ok(())
}

/// Allow `names` to be substituted into deployable values
pub fn allow(global: &GlobalArgs, names: &[String]) -> Result<()> {
    let mut manifest = global.load_manifest()?;

    for name in names {
        let name = name.to_uppercase();
        if manifest.allowed_env.iter().any(|n| n.eq_ignore_ascii_case(&name)) {
            println!("{} {} is already allowed", style("→").blue().bold(), name);
            continue;
        }
        println!("{} Allowed {}", style("✓").green().bold(), style(&name).cyan());
        manifest.allowed_env.push(name);
    }

    manifest.save_to(&global.manifest)?;
    Ok(())
}

pub fn disallow(global: &GlobalArgs, names: &[String]) -> Result<()> {
    let mut manifest = global.load_manifest()?;

    for name in names {
        let before = manifest.allowed_env.len();
        manifest.allowed_env.retain(|n| !n.eq_ignore_ascii_case(name));
        if manifest.allowed_env.len() == before {
            println!("{} {} was not allowed", style("→").blue().bold(), name.to_uppercase());
        } else {
            println!("{} Removed {}", style("✓").green().bold(), style(name.to_uppercase()).cyan());
        }
    }

    manifest.save_to(&global.manifest)?;
    Ok(())
}
