//! Collaborator seams used by the engine
//!
//! Chartlock never talks to the cluster itself. Default values are fetched,
//! releases deployed and repositories synced through these traits, backed by
//! the helm/kubectl binaries in production and by [`crate::MockBackend`] in
//! tests.

use std::path::PathBuf;

use async_trait::async_trait;
use chartlock_core::{ChartRef, Node, Repo};

use crate::error::Result;

/// Source of chart default values
#[async_trait]
pub trait ChartSource: Send + Sync {
    /// Defaults shipped with `chart` at `chart.version`
    ///
    /// A chart without defaults yields an empty mapping.
    async fn default_values(&self, chart: &ChartRef) -> Result<Node>;
}

/// Deploy and uninstall collaborator
#[async_trait]
pub trait Deployer: Send + Sync {
    /// Install or upgrade a chart release with the given values on stdin.
    /// Returns the tool's combined output.
    async fn deploy_chart(&self, request: &ChartDeploy) -> Result<String>;

    /// Apply (or create) a raw manifest
    async fn apply_manifest(&self, request: &ManifestApply) -> Result<String>;

    /// Uninstall a chart release
    async fn uninstall_release(&self, name: &str, namespace: &str, dry_run: bool) -> Result<String>;

    /// Delete the resources of a raw manifest
    async fn delete_manifest(&self, request: &ManifestDelete) -> Result<String>;
}

/// Chart repository management
#[async_trait]
pub trait RepoManager: Send + Sync {
    /// Add missing repositories, fix changed URLs and refresh the indexes
    async fn sync(&self, repos: &[Repo]) -> Result<()>;
}

/// Options for the chart deploy step
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeployOptions {
    /// Wait for resources to be ready
    pub wait: bool,

    /// Roll back on failure
    pub atomic: bool,

    /// Render templates into this directory instead of installing
    pub template_dir: Option<PathBuf>,
}

impl DeployOptions {
    pub fn with_wait(mut self) -> Self {
        self.wait = true;
        self
    }

    pub fn with_atomic(mut self) -> Self {
        self.atomic = true;
        self
    }

    pub fn with_template_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.template_dir = Some(dir.into());
        self
    }
}

/// One chart release to install or upgrade
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartDeploy {
    pub release: String,
    pub namespace: String,
    pub chart: ChartRef,
    /// Deployable values: merged, comment-free, env-substituted
    pub values: String,
    pub options: DeployOptions,
}

/// One raw manifest to apply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestApply {
    pub name: String,
    pub namespace: Option<String>,
    /// Env-substituted manifest text
    pub manifest: String,
    /// `create` instead of `apply`
    pub use_create: bool,
}

/// One raw manifest to delete
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestDelete {
    pub name: String,
    pub namespace: Option<String>,
    pub manifest: String,
    pub dry_run: bool,
}

/// Everything the engine needs from the outside world
pub trait Backend: ChartSource + Deployer + RepoManager {}

impl<T: ChartSource + Deployer + RepoManager> Backend for T {}
