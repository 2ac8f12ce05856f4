//! Uninstall a release or single and forget it

use std::path::{Path, PathBuf};

use chartlock_core::{EnvMap, Manifest};
use chartlock_kube::{Deployer, ManifestDelete};

use crate::error::{EngineError, Result};
use crate::orchestrator::{EntryKind, single_manifest};

#[derive(Debug, Clone, Copy, Default)]
pub struct UninstallOptions {
    /// Ask the collaborator for a dry run and keep the manifest untouched
    pub dry_run: bool,

    /// Keep the values or manifest file on disk
    pub keep_file: bool,
}

#[derive(Debug, Clone)]
pub struct UninstallResult {
    pub name: String,
    pub kind: EntryKind,
    /// Collaborator output
    pub output: String,
    /// File deleted along with the entry
    pub removed_file: Option<PathBuf>,
}

/// Uninstall `name`, then drop it from the manifest saved at `manifest_path`
pub async fn uninstall<D: Deployer + ?Sized>(
    deployer: &D,
    manifest: &mut Manifest,
    manifest_path: &Path,
    env: &EnvMap,
    name: &str,
    options: UninstallOptions,
) -> Result<UninstallResult> {
    let root = Manifest::root_dir(manifest_path);

    let (kind, output, file) = if let Some(release) = manifest.release(name) {
        let output = deployer
            .uninstall_release(&release.name, &release.namespace, options.dry_run)
            .await?;
        (EntryKind::Chart, output, release.values_path(&root))
    } else if let Some(single) = manifest.single(name) {
        let request = ManifestDelete {
            name: single.name.clone(),
            namespace: single.namespace.clone(),
            manifest: single_manifest(single, &root, env)?,
            dry_run: options.dry_run,
        };
        let output = deployer.delete_manifest(&request).await?;
        (EntryKind::Single, output, single.file_path(&root))
    } else {
        return Err(EngineError::UnknownTarget(name.to_string()));
    };

    let mut result = UninstallResult {
        name: name.to_string(),
        kind,
        output,
        removed_file: None,
    };
    if options.dry_run {
        return Ok(result);
    }

    match kind {
        EntryKind::Chart => {
            manifest.remove_release(name);
        }
        EntryKind::Single => {
            manifest.remove_single(name);
        }
    }
    manifest.save_to(manifest_path)?;
    tracing::info!("Removed {} from {}", name, manifest_path.display());

    if !options.keep_file && file.exists() {
        std::fs::remove_file(&file)?;
        result.removed_file = Some(file);
    }

    Ok(result)
}
