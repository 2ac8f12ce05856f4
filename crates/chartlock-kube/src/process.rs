//! Collaborators backed by the `helm` and `kubectl` binaries

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chartlock_core::{ChartRef, Node, Repo, yaml};

use crate::backend::{ChartDeploy, ChartSource, Deployer, ManifestApply, ManifestDelete, RepoManager};
use crate::command::{self, CommandOutput};
use crate::error::{KubeError, Result};
use crate::{helm, kubectl};

/// Runs helm and kubectl from `PATH` (or explicit paths)
#[derive(Debug, Clone)]
pub struct ProcessBackend {
    helm: PathBuf,
    kubectl: PathBuf,
}

impl Default for ProcessBackend {
    fn default() -> Self {
        Self::new("helm", "kubectl")
    }
}

impl ProcessBackend {
    pub fn new(helm: impl Into<PathBuf>, kubectl: impl Into<PathBuf>) -> Self {
        Self {
            helm: helm.into(),
            kubectl: kubectl.into(),
        }
    }

    async fn helm(&self, args: &[String], stdin: Option<&[u8]>) -> std::io::Result<CommandOutput> {
        command::run(&self.helm, args, stdin).await
    }

    async fn kubectl(&self, args: &[String], stdin: Option<&[u8]>) -> std::io::Result<CommandOutput> {
        command::run(&self.kubectl, args, stdin).await
    }
}

fn deploy_failure(action: &str, name: &str, output: String) -> KubeError {
    KubeError::DeployFailed {
        action: action.to_string(),
        name: name.to_string(),
        output,
    }
}

fn spawn_failure(action: &str, name: &str, program: &Path, err: std::io::Error) -> KubeError {
    deploy_failure(action, name, format!("failed to run {}: {}", program.display(), err))
}

/// Turn `helm show values` output into a mapping node
pub fn values_from_output(chart: &ChartRef, stdout: &str) -> Result<Node> {
    let stream = yaml::parse_named(stdout, &chart.qualified()).map_err(|source| KubeError::InvalidValues {
        chart: chart.qualified(),
        source,
    })?;

    let mut node = match stream.children.into_iter().next() {
        Some(root) if root.is_mapping() => root,
        Some(root) if root.is_null() => {
            let mut empty = Node::mapping();
            empty.comments = root.comments;
            empty
        }
        Some(_) => {
            return Err(KubeError::FetchFailed {
                chart: chart.qualified(),
                version: chart.version.clone(),
                message: "default values are not a mapping".to_string(),
            });
        }
        None => Node::mapping(),
    };

    if node.comments.head.is_empty() {
        node.comments.head = stream.comments.head;
    }
    Ok(node)
}

#[async_trait]
impl ChartSource for ProcessBackend {
    async fn default_values(&self, chart: &ChartRef) -> Result<Node> {
        let fetch_failed = |message: String| KubeError::FetchFailed {
            chart: chart.qualified(),
            version: chart.version.clone(),
            message,
        };

        let output = self
            .helm(&helm::show_values_args(chart), None)
            .await
            .map_err(|e| fetch_failed(format!("failed to run {}: {}", self.helm.display(), e)))?;

        if !output.success {
            return Err(fetch_failed(output.combined.trim().to_string()));
        }

        values_from_output(chart, &output.stdout)
    }
}

#[async_trait]
impl Deployer for ProcessBackend {
    async fn deploy_chart(&self, request: &ChartDeploy) -> Result<String> {
        let action = if request.options.template_dir.is_some() { "template" } else { "upgrade" };
        let output = self
            .helm(&helm::deploy_args(request), Some(request.values.as_bytes()))
            .await
            .map_err(|e| spawn_failure(action, &request.release, &self.helm, e))?;

        if !output.success {
            return Err(deploy_failure(action, &request.release, output.combined));
        }

        if let Some(dir) = &request.options.template_dir {
            tokio::fs::create_dir_all(dir).await?;
            let path = dir.join(format!("{}-template.yaml", request.release));
            tokio::fs::write(&path, output.stdout.as_bytes()).await?;
            tracing::info!("Wrote rendered templates to {}", path.display());
        }

        Ok(output.combined)
    }

    async fn apply_manifest(&self, request: &ManifestApply) -> Result<String> {
        let action = if request.use_create { "create" } else { "apply" };
        let output = self
            .kubectl(&kubectl::apply_args(request), Some(request.manifest.as_bytes()))
            .await
            .map_err(|e| spawn_failure(action, &request.name, &self.kubectl, e))?;

        if !output.success {
            return Err(deploy_failure(action, &request.name, output.combined));
        }
        Ok(output.combined)
    }

    async fn uninstall_release(&self, name: &str, namespace: &str, dry_run: bool) -> Result<String> {
        let output = self
            .helm(&helm::uninstall_args(name, namespace, dry_run), None)
            .await
            .map_err(|e| spawn_failure("uninstall", name, &self.helm, e))?;

        if !output.success {
            return Err(deploy_failure("uninstall", name, output.combined));
        }
        Ok(output.combined)
    }

    async fn delete_manifest(&self, request: &ManifestDelete) -> Result<String> {
        let output = self
            .kubectl(&kubectl::delete_args(request), Some(request.manifest.as_bytes()))
            .await
            .map_err(|e| spawn_failure("delete", &request.name, &self.kubectl, e))?;

        if !output.success {
            return Err(deploy_failure("delete", &request.name, output.combined));
        }
        Ok(output.combined)
    }
}

#[async_trait]
impl RepoManager for ProcessBackend {
    async fn sync(&self, repos: &[Repo]) -> Result<()> {
        if repos.is_empty() {
            return Ok(());
        }

        let sync_failed = |message: String| KubeError::RepoSyncFailed { message };
        let spawn_failed = |e: std::io::Error| sync_failed(format!("failed to run {}: {}", self.helm.display(), e));

        let listed = self.helm(&helm::repo_list_args(), None).await.map_err(spawn_failed)?;
        // helm exits non-zero when no repositories are configured yet
        let installed = if listed.success {
            helm::parse_repo_list(&listed.stdout)
                .map_err(|e| sync_failed(format!("unreadable `helm repo list` output: {}", e)))?
        } else {
            Vec::new()
        };

        let plan = helm::plan_repo_sync(repos, &installed);
        for name in &plan.remove {
            let output = self.helm(&helm::repo_remove_args(name), None).await.map_err(spawn_failed)?;
            if !output.success {
                return Err(sync_failed(format!("failed to remove repo {}:\n{}", name, output.combined)));
            }
        }
        for repo in &plan.add {
            let output = self.helm(&helm::repo_add_args(repo), None).await.map_err(spawn_failed)?;
            if !output.success {
                return Err(sync_failed(format!("failed to add repo {}:\n{}", repo.name, output.combined)));
            }
            tracing::info!("Added helm repo {} ({})", repo.name, repo.url);
        }

        let output = self.helm(&helm::repo_update_args(), None).await.map_err(spawn_failed)?;
        if !output.success {
            return Err(sync_failed(output.combined));
        }
        Ok(())
    }
}
