//! Init command - create an empty manifest and its directories

use chartlock_core::Manifest;
use chartlock_core::manifest::{RELEASES_DIR, SINGLES_DIR};
use console::style;

use super::{GlobalArgs, display_path};
use crate::error::{CliError, Result};

pub fn run(global: &GlobalArgs) -> Result<()> {
    if global.manifest.exists() {
        return Err(CliError::usage(format!(
            "{} already exists",
            display_path(&global.manifest)
        )));
    }

    let root = global.root();
    for dir in [RELEASES_DIR, SINGLES_DIR] {
        std::fs::create_dir_all(root.join(dir))?;
    }
    Manifest::default().save_to(&global.manifest)?;

    println!(
        "{} Created {}",
        style("✓").green().bold(),
        style(display_path(&global.manifest)).cyan()
    );
    println!("  Add releases under `releases:` and run `chartlock upgrade`");
    Ok(())
}
