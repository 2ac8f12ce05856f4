//! helm argument lists

use chartlock_core::{ChartRef, Repo};
use serde::Deserialize;

use crate::backend::ChartDeploy;

/// `helm upgrade --install`, or `helm template` in template mode, reading
/// values from stdin
pub fn deploy_args(request: &ChartDeploy) -> Vec<String> {
    let mut args = if request.options.template_dir.is_some() {
        vec!["template".to_string()]
    } else {
        vec!["upgrade".to_string(), "--install".to_string()]
    };

    args.extend([
        request.release.clone(),
        request.chart.qualified(),
        "--namespace".to_string(),
        request.namespace.clone(),
        "--values".to_string(),
        "-".to_string(),
        "--version".to_string(),
        request.chart.version.clone(),
        "--create-namespace".to_string(),
    ]);

    if request.options.template_dir.is_some() {
        args.push("--include-crds".to_string());
    } else {
        if request.options.wait {
            args.push("--wait".to_string());
        }
        if request.options.atomic {
            args.push("--atomic".to_string());
        }
    }

    args
}

pub fn show_values_args(chart: &ChartRef) -> Vec<String> {
    vec![
        "show".to_string(),
        "values".to_string(),
        chart.qualified(),
        "--version".to_string(),
        chart.version.clone(),
    ]
}

pub fn uninstall_args(name: &str, namespace: &str, dry_run: bool) -> Vec<String> {
    let mut args = vec![
        "uninstall".to_string(),
        "--namespace".to_string(),
        namespace.to_string(),
        name.to_string(),
    ];
    if dry_run {
        args.push("--dry-run".to_string());
    }
    args
}

pub fn repo_list_args() -> Vec<String> {
    ["repo", "list", "-o", "json"].map(String::from).to_vec()
}

pub fn repo_add_args(repo: &Repo) -> Vec<String> {
    vec!["repo".to_string(), "add".to_string(), repo.name.clone(), repo.url.clone()]
}

pub fn repo_remove_args(name: &str) -> Vec<String> {
    vec!["repo".to_string(), "remove".to_string(), name.to_string()]
}

pub fn repo_update_args() -> Vec<String> {
    vec!["repo".to_string(), "update".to_string()]
}

#[derive(Debug, Deserialize)]
struct ListedRepo {
    name: String,
    url: String,
}

/// Parse `helm repo list -o json`
pub fn parse_repo_list(stdout: &str) -> Result<Vec<Repo>, serde_json::Error> {
    if stdout.trim().is_empty() {
        return Ok(Vec::new());
    }
    let listed: Vec<ListedRepo> = serde_json::from_str(stdout)?;
    Ok(listed
        .into_iter()
        .map(|r| Repo {
            name: r.name,
            url: r.url,
        })
        .collect())
}

/// What `sync` has to do to make helm's repo list match the manifest
#[derive(Debug, Default, PartialEq, Eq)]
pub struct RepoPlan {
    /// Registered under the same name with another URL
    pub remove: Vec<String>,
    pub add: Vec<Repo>,
}

pub fn plan_repo_sync(wanted: &[Repo], installed: &[Repo]) -> RepoPlan {
    let mut plan = RepoPlan::default();
    for repo in wanted {
        match installed.iter().find(|r| r.name == repo.name) {
            Some(existing) if existing.url == repo.url => {}
            Some(_) => {
                plan.remove.push(repo.name.clone());
                plan.add.push(repo.clone());
            }
            None => plan.add.push(repo.clone()),
        }
    }
    plan
}
