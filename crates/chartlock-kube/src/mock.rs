//! In-memory backend for testing
//!
//! Serves scripted chart defaults, records every deploy, and can be told to
//! fail specific fetches or deploys, without needing helm, kubectl or a
//! cluster.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chartlock_core::{ChartRef, Node, Repo};

use crate::backend::{ChartDeploy, ChartSource, Deployer, ManifestApply, ManifestDelete, RepoManager};
use crate::error::{KubeError, Result};

/// In-memory collaborator implementation
#[derive(Clone, Default)]
pub struct MockBackend {
    /// (chart name, version) -> defaults
    defaults: Arc<RwLock<HashMap<(String, String), Node>>>,
    /// Release or single names whose deploy fails
    failing_deploys: Arc<RwLock<HashSet<String>>>,
    fail_repo_sync: Arc<RwLock<bool>>,
    calls: Arc<RwLock<Calls>>,
}

/// Record of calls made, for assertions
#[derive(Debug, Default, Clone)]
pub struct Calls {
    pub fetches: Vec<(String, String)>,
    pub chart_deploys: Vec<ChartDeploy>,
    pub manifest_applies: Vec<ManifestApply>,
    pub uninstalls: Vec<String>,
    pub manifest_deletes: Vec<ManifestDelete>,
    pub repo_syncs: usize,
}

impl Calls {
    /// Names of every chart or manifest handed to the deployer, in order
    pub fn deployed_names(&self) -> Vec<String> {
        self.chart_deploys
            .iter()
            .map(|d| d.release.clone())
            .chain(self.manifest_applies.iter().map(|a| a.name.clone()))
            .collect()
    }
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `defaults` for `chart` at `version`
    pub fn with_defaults(self, chart: &str, version: &str, defaults: Node) -> Self {
        self.defaults
            .write()
            .unwrap()
            .insert((chart.to_string(), version.to_string()), defaults);
        self
    }

    /// Make every deploy of `name` fail
    pub fn with_failing_deploy(self, name: &str) -> Self {
        self.failing_deploys.write().unwrap().insert(name.to_string());
        self
    }

    pub fn with_failing_repo_sync(self) -> Self {
        *self.fail_repo_sync.write().unwrap() = true;
        self
    }

    /// Snapshot of the calls made so far
    pub fn calls(&self) -> Calls {
        self.calls.read().unwrap().clone()
    }

    fn check_deploy(&self, action: &str, name: &str) -> Result<()> {
        if self.failing_deploys.read().unwrap().contains(name) {
            return Err(KubeError::DeployFailed {
                action: action.to_string(),
                name: name.to_string(),
                output: format!("Error: mock {} failure for {}", action, name),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ChartSource for MockBackend {
    async fn default_values(&self, chart: &ChartRef) -> Result<Node> {
        let key = (chart.name.clone(), chart.version.clone());
        self.calls.write().unwrap().fetches.push(key.clone());

        self.defaults
            .read()
            .unwrap()
            .get(&key)
            .cloned()
            .ok_or_else(|| KubeError::FetchFailed {
                chart: chart.qualified(),
                version: chart.version.clone(),
                message: "chart version not found".to_string(),
            })
    }
}

#[async_trait]
impl Deployer for MockBackend {
    async fn deploy_chart(&self, request: &ChartDeploy) -> Result<String> {
        self.calls.write().unwrap().chart_deploys.push(request.clone());
        self.check_deploy("upgrade", &request.release)?;
        Ok(format!("Release \"{}\" has been upgraded.", request.release))
    }

    async fn apply_manifest(&self, request: &ManifestApply) -> Result<String> {
        self.calls.write().unwrap().manifest_applies.push(request.clone());
        self.check_deploy("apply", &request.name)?;
        Ok(format!("{} configured", request.name))
    }

    async fn uninstall_release(&self, name: &str, _namespace: &str, _dry_run: bool) -> Result<String> {
        self.calls.write().unwrap().uninstalls.push(name.to_string());
        self.check_deploy("uninstall", name)?;
        Ok(format!("release \"{}\" uninstalled", name))
    }

    async fn delete_manifest(&self, request: &ManifestDelete) -> Result<String> {
        self.calls.write().unwrap().manifest_deletes.push(request.clone());
        self.check_deploy("delete", &request.name)?;
        Ok(format!("{} deleted", request.name))
    }
}

#[async_trait]
impl RepoManager for MockBackend {
    async fn sync(&self, _repos: &[Repo]) -> Result<()> {
        self.calls.write().unwrap().repo_syncs += 1;
        if *self.fail_repo_sync.read().unwrap() {
            return Err(KubeError::RepoSyncFailed {
                message: "mock repo sync failure".to_string(),
            });
        }
        Ok(())
    }
}
