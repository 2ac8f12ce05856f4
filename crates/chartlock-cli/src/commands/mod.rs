//! CLI commands

pub mod diff;
pub mod env;
pub mod init;
pub mod repo;
pub mod uninstall;
pub mod upgrade;

use std::path::{Path, PathBuf};

use chartlock_core::{EnvFile, EnvMap, EnvResolution, Manifest};
use chartlock_kube::ProcessBackend;

use crate::error::Result;

/// Options shared by every command
#[derive(Debug, Clone)]
pub struct GlobalArgs {
    pub manifest: PathBuf,
    pub env_file: Option<PathBuf>,
    pub helm: PathBuf,
    pub kubectl: PathBuf,
}

impl GlobalArgs {
    pub fn backend(&self) -> ProcessBackend {
        ProcessBackend::new(&self.helm, &self.kubectl)
    }

    /// Load the manifest named by `--manifest`; a missing file is an empty manifest
    pub fn load_manifest(&self) -> Result<Manifest> {
        Ok(Manifest::load_or_default(&self.manifest)?)
    }

    /// Directory release and single paths resolve against
    pub fn root(&self) -> PathBuf {
        Manifest::root_dir(&self.manifest)
    }

    /// `--env-file` if given, else `.env` next to the manifest
    pub fn env_file(&self) -> EnvFile {
        match &self.env_file {
            Some(path) => EnvFile::Explicit(path.clone()),
            None => EnvFile::Default(self.root().join(".env")),
        }
    }

    pub fn resolve_env(&self, manifest: &Manifest) -> Result<EnvResolution> {
        Ok(EnvMap::resolve(&manifest.allowed_env, Some(&self.env_file()))?)
    }
}

/// Display path relative to the current directory when possible
pub(crate) fn display_path(path: &Path) -> String {
    path.strip_prefix("./").unwrap_or(path).display().to_string()
}
