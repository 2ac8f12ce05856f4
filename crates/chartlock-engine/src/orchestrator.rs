//! Upgrade orchestration
//!
//! Drives the [`Reconciler`] across every release in the manifest, strictly
//! in manifest order, then hands the deployable output to the deployer.
//! Charts are reconciled first, then deployed, then singles are applied.

use std::path::{Path, PathBuf};

use chartlock_core::fs::read_optional;
use chartlock_core::{CoreError, EnvMap, EnvResolution, Manifest, Release, Single};
use chartlock_kube::{Backend, ChartDeploy, DeployOptions, ManifestApply, ProgressGuard, ProgressReporter, SilentReporter};

use crate::error::{EngineError, Result};
use crate::reconcile::{Reconciler, Reconciliation};

/// Options for an upgrade run
#[derive(Debug, Clone)]
pub struct UpgradeOptions {
    /// Releases and singles to leave alone
    pub ignore: Vec<String>,

    /// When non-empty, only these releases and singles are processed
    pub only: Vec<String>,

    /// Abort the whole batch on the first failure
    pub stop_on_first_error: bool,

    /// Reconcile and show the result without writing or deploying
    pub dry_run: bool,

    /// Do not redeploy releases whose document and lock did not move
    pub skip_unchanged: bool,

    /// Sync chart repositories before fetching defaults
    pub sync_repos: bool,

    pub deploy: DeployOptions,
}

impl Default for UpgradeOptions {
    fn default() -> Self {
        Self {
            ignore: Vec::new(),
            only: Vec::new(),
            stop_on_first_error: false,
            dry_run: false,
            skip_unchanged: false,
            sync_repos: true,
            deploy: DeployOptions::default(),
        }
    }
}

impl UpgradeOptions {
    /// Reject contradictory options
    pub fn validate(&self) -> Result<()> {
        if !self.ignore.is_empty() && !self.only.is_empty() {
            return Err(EngineError::Usage(
                "an ignore list and an only list cannot be used together".to_string(),
            ));
        }
        Ok(())
    }

    /// Why `name` is excluded from this run, if it is
    pub fn skip_reason(&self, name: &str) -> Option<String> {
        let listed = |names: &[String]| names.iter().any(|n| n.eq_ignore_ascii_case(name));

        if listed(&self.ignore) {
            Some("ignored".to_string())
        } else if !self.only.is_empty() && !listed(&self.only) {
            Some("not selected".to_string())
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Chart,
    Single,
}

/// What happened to one release or single
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Skipped(String),
    /// Reconciled but not deployed (dry run)
    Reconciled,
    Deployed,
    /// Document and lock unchanged, deploy skipped
    Unchanged,
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct ReleaseReport {
    pub name: String,
    pub kind: EntryKind,
    pub outcome: Outcome,
    /// Collaborator output, on success or failure
    pub output: Option<String>,
    /// Reconciled overrides, for dry runs
    pub preview: Option<String>,
}

impl ReleaseReport {
    fn new(name: &str, kind: EntryKind, outcome: Outcome) -> Self {
        Self {
            name: name.to_string(),
            kind,
            outcome,
            output: None,
            preview: None,
        }
    }

    fn failed(name: &str, kind: EntryKind, err: &EngineError) -> Self {
        let mut report = Self::new(name, kind, Outcome::Failed(err.to_string()));
        report.output = err.output().map(str::to_string);
        report
    }
}

/// Result of an upgrade run
#[derive(Debug, Clone, Default)]
pub struct UpgradeReport {
    pub entries: Vec<ReleaseReport>,
    /// The run stopped at the first failure
    pub aborted: bool,
}

impl UpgradeReport {
    pub fn is_success(&self) -> bool {
        !self.aborted && self.failures().next().is_none()
    }

    pub fn failures(&self) -> impl Iterator<Item = &ReleaseReport> {
        self.entries
            .iter()
            .filter(|entry| matches!(entry.outcome, Outcome::Failed(_)))
    }

    pub fn entry(&self, name: &str) -> Option<&ReleaseReport> {
        self.entries.iter().find(|entry| entry.name == name)
    }

    fn record(&mut self, report: ReleaseReport, stop_on_first_error: bool) -> bool {
        let failed = matches!(report.outcome, Outcome::Failed(_));
        self.entries.push(report);
        if failed && stop_on_first_error {
            self.aborted = true;
        }
        self.aborted
    }
}

/// Fail when allow-listed variables could not be resolved
pub fn require_env(resolution: &EnvResolution, allow_missing: bool) -> Result<()> {
    if resolution.missing.is_empty() {
        return Ok(());
    }
    if allow_missing {
        tracing::warn!(
            "Missing environment variables: {}",
            resolution.missing.join(", ")
        );
        return Ok(());
    }
    Err(EngineError::MissingEnv {
        names: resolution.missing.clone(),
    })
}

/// Runs upgrades for one loaded manifest
pub struct Orchestrator<'a, B: Backend + ?Sized> {
    backend: &'a B,
    manifest: &'a Manifest,
    root: PathBuf,
    env: &'a EnvMap,
    reporter: &'a dyn ProgressReporter,
}

impl<'a, B: Backend + ?Sized> Orchestrator<'a, B> {
    /// `root` is the directory relative release and single paths resolve against
    pub fn new(backend: &'a B, manifest: &'a Manifest, root: impl Into<PathBuf>, env: &'a EnvMap) -> Self {
        Self {
            backend,
            manifest,
            root: root.into(),
            env,
            reporter: &SilentReporter,
        }
    }

    pub fn with_reporter(mut self, reporter: &'a dyn ProgressReporter) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Reconcile a single release without writing anything
    pub async fn plan(&self, name: &str) -> Result<Reconciliation> {
        let release = self
            .manifest
            .release(name)
            .ok_or_else(|| EngineError::UnknownTarget(name.to_string()))?;

        Reconciler::new(self.backend, self.env)
            .reconcile(release, &release.values_path(&self.root))
            .await
    }

    /// Reconcile and deploy every selected release, then apply every
    /// selected single
    pub async fn upgrade(&self, options: &UpgradeOptions) -> Result<UpgradeReport> {
        options.validate()?;

        if options.sync_repos && !self.manifest.repos.is_empty() {
            let guard = ProgressGuard::start(
                self.reporter,
                "Syncing chart repositories",
                "Failed to sync chart repositories",
            );
            self.backend.sync(&self.manifest.repos).await?;
            guard.succeed("Synced chart repositories");
        }

        let mut report = UpgradeReport::default();
        let stop = options.stop_on_first_error;

        let mut reconciled = Vec::new();
        for release in &self.manifest.releases {
            if let Some(reason) = options.skip_reason(&release.name) {
                tracing::debug!("Skipping release {}: {}", release.name, reason);
                report.record(ReleaseReport::new(&release.name, EntryKind::Chart, Outcome::Skipped(reason)), stop);
                continue;
            }

            match self.reconcile_release(release, options.dry_run).await {
                Ok(rec) => reconciled.push((release, rec)),
                Err(err) => {
                    tracing::error!("Failed to reconcile {}: {}", release.name, err);
                    if report.record(ReleaseReport::failed(&release.name, EntryKind::Chart, &err), stop) {
                        return Ok(report);
                    }
                }
            }
        }

        for (release, rec) in &reconciled {
            if report.record(self.deploy_release(release, rec, options).await, stop) {
                return Ok(report);
            }
        }

        for single in &self.manifest.singles {
            let entry = match options.skip_reason(&single.name) {
                Some(reason) => ReleaseReport::new(&single.name, EntryKind::Single, Outcome::Skipped(reason)),
                None => self.apply_single(single, options.dry_run).await,
            };
            if report.record(entry, stop) {
                return Ok(report);
            }
        }

        Ok(report)
    }

    async fn reconcile_release(&self, release: &Release, dry_run: bool) -> Result<Reconciliation> {
        let guard = ProgressGuard::start(
            self.reporter,
            &format!("Reconciling values for {}", release.name),
            format!("Failed to reconcile values for {}", release.name),
        );

        let path = release.values_path(&self.root);
        let rec = Reconciler::new(self.backend, self.env).reconcile(release, &path).await?;
        if !dry_run && rec.persist(&path)? {
            tracing::info!("Updated {}", path.display());
        }

        guard.succeed(&format!("Reconciled values for {}", release.name));
        Ok(rec)
    }

    async fn deploy_release(&self, release: &Release, rec: &Reconciliation, options: &UpgradeOptions) -> ReleaseReport {
        if options.dry_run {
            let mut entry = ReleaseReport::new(&release.name, EntryKind::Chart, Outcome::Reconciled);
            entry.preview = Some(rec.overrides_yaml());
            return entry;
        }

        if options.skip_unchanged && !rec.changed && !rec.version_changed() {
            tracing::info!("Release {} is unchanged, not redeploying", release.name);
            return ReleaseReport::new(&release.name, EntryKind::Chart, Outcome::Unchanged);
        }

        let request = ChartDeploy {
            release: release.name.clone(),
            namespace: release.namespace.clone(),
            chart: release.chart.clone(),
            values: rec.deployable.clone(),
            options: options.deploy.clone(),
        };

        let guard = ProgressGuard::start(
            self.reporter,
            &format!("Deploying {} {}", release.chart.name, release.chart.version),
            format!("Failed to deploy {}", release.name),
        );
        match self.backend.deploy_chart(&request).await {
            Ok(output) => {
                guard.succeed(&format!("Deployed {}", release.name));
                let mut entry = ReleaseReport::new(&release.name, EntryKind::Chart, Outcome::Deployed);
                entry.output = Some(output);
                entry
            }
            Err(err) => {
                guard.fail();
                let err = EngineError::from(err);
                tracing::error!("Failed to deploy {}: {}", release.name, err);
                ReleaseReport::failed(&release.name, EntryKind::Chart, &err)
            }
        }
    }

    async fn apply_single(&self, single: &Single, dry_run: bool) -> ReleaseReport {
        match self.try_apply_single(single, dry_run).await {
            Ok(Some(output)) => {
                let mut entry = ReleaseReport::new(&single.name, EntryKind::Single, Outcome::Deployed);
                entry.output = Some(output);
                entry
            }
            Ok(None) => ReleaseReport::new(&single.name, EntryKind::Single, Outcome::Skipped("dry run".to_string())),
            Err(err) => {
                tracing::error!("Failed to apply {}: {}", single.name, err);
                ReleaseReport::failed(&single.name, EntryKind::Single, &err)
            }
        }
    }

    async fn try_apply_single(&self, single: &Single, dry_run: bool) -> Result<Option<String>> {
        let manifest = single_manifest(single, &self.root, self.env)?;
        if dry_run {
            return Ok(None);
        }

        let request = ManifestApply {
            name: single.name.clone(),
            namespace: single.namespace.clone(),
            manifest,
            use_create: single.use_create,
        };

        let guard = ProgressGuard::start(
            self.reporter,
            &format!("Applying {}", single.name),
            format!("Failed to apply {}", single.name),
        );
        let output = self.backend.apply_manifest(&request).await?;
        guard.succeed(&format!("Applied {}", single.name));
        Ok(Some(output))
    }
}

/// Read a single's manifest and substitute the env map into it
pub(crate) fn single_manifest(single: &Single, root: &Path, env: &EnvMap) -> Result<String> {
    let path = single.file_path(root);
    let text = read_optional(&path)?.ok_or_else(|| CoreError::NotFound {
        path: path.display().to_string(),
    })?;
    Ok(env.substitute(&text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chartlock_core::{ChartRef, Repo, yaml};
    use chartlock_kube::MockBackend;

    fn values(text: &str) -> chartlock_core::Node {
        yaml::parse(text).unwrap().children.remove(0)
    }

    fn release(name: &str) -> Release {
        Release {
            name: name.to_string(),
            namespace: "apps".to_string(),
            chart: ChartRef {
                name: format!("{}-chart", name),
                repo: "stable".to_string(),
                version: "1.0".to_string(),
                app_version: String::new(),
            },
            values_file: None,
        }
    }

    fn manifest(names: &[&str]) -> Manifest {
        Manifest {
            repos: vec![Repo {
                name: "stable".to_string(),
                url: "https://charts.example.com".to_string(),
            }],
            allowed_env: Vec::new(),
            releases: names.iter().map(|name| release(name)).collect(),
            singles: Vec::new(),
        }
    }

    fn backend(names: &[&str]) -> MockBackend {
        names.iter().fold(MockBackend::new(), |backend, name| {
            backend.with_defaults(&format!("{}-chart", name), "1.0", values("replicas: 1\n"))
        })
    }

    #[tokio::test]
    async fn test_upgrade_deploys_every_release_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = manifest(&["a", "b"]);
        let backend = backend(&["a", "b"]);
        let env = EnvMap::new();

        let report = Orchestrator::new(&backend, &manifest, dir.path(), &env)
            .upgrade(&UpgradeOptions::default())
            .await
            .unwrap();

        assert!(report.is_success());
        let calls = backend.calls();
        assert_eq!(calls.repo_syncs, 1);
        assert_eq!(calls.deployed_names(), vec!["a".to_string(), "b".to_string()]);
        assert_eq!(calls.chart_deploys[0].values, "replicas: 1\n");
        assert_eq!(calls.chart_deploys[0].namespace, "apps");
        assert!(dir.path().join("releases/a.yaml").exists());
        assert_eq!(report.entry("b").unwrap().outcome, Outcome::Deployed);
    }

    #[tokio::test]
    async fn test_stop_on_first_error_deploys_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = manifest(&["a", "b", "c"]);
        // no defaults for a: its fetch fails
        let backend = backend(&["b", "c"]);
        let env = EnvMap::new();
        let options = UpgradeOptions {
            ignore: vec!["b".to_string()],
            stop_on_first_error: true,
            ..Default::default()
        };

        let report = Orchestrator::new(&backend, &manifest, dir.path(), &env)
            .upgrade(&options)
            .await
            .unwrap();

        assert!(!report.is_success());
        assert!(report.aborted);
        assert!(matches!(report.entry("a").unwrap().outcome, Outcome::Failed(_)));
        assert!(report.entry("b").is_none());
        assert!(report.entry("c").is_none());

        let calls = backend.calls();
        assert!(calls.deployed_names().is_empty());
        assert!(!calls.fetches.iter().any(|(chart, _)| chart == "c-chart"));
    }

    #[tokio::test]
    async fn test_failures_are_recorded_and_the_batch_continues() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = manifest(&["a", "b", "c"]);
        let backend = backend(&["b", "c"]).with_failing_deploy("b");
        let env = EnvMap::new();

        let report = Orchestrator::new(&backend, &manifest, dir.path(), &env)
            .upgrade(&UpgradeOptions::default())
            .await
            .unwrap();

        assert!(!report.is_success());
        assert!(!report.aborted);
        assert_eq!(report.failures().count(), 2);
        assert_eq!(report.entry("c").unwrap().outcome, Outcome::Deployed);
        assert!(report.entry("b").unwrap().output.as_deref().unwrap().contains("mock upgrade failure"));
        assert_eq!(backend.calls().deployed_names(), vec!["b".to_string(), "c".to_string()]);
    }

    #[tokio::test]
    async fn test_dry_run_writes_and_deploys_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("releases/a.yaml");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "replicas: 4 # legacy\n").unwrap();
        let before = std::fs::read(&path).unwrap();

        let manifest = manifest(&["a"]);
        let backend = backend(&["a"]);
        let env = EnvMap::new();
        let options = UpgradeOptions {
            dry_run: true,
            ..Default::default()
        };

        let report = Orchestrator::new(&backend, &manifest, dir.path(), &env)
            .upgrade(&options)
            .await
            .unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), before);
        assert!(backend.calls().deployed_names().is_empty());
        let entry = report.entry("a").unwrap();
        assert_eq!(entry.outcome, Outcome::Reconciled);
        assert!(entry.preview.as_deref().unwrap().ends_with("replicas: 4\n"));
    }

    #[tokio::test]
    async fn test_skip_unchanged_after_first_run() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = manifest(&["a"]);
        let backend = backend(&["a"]);
        let env = EnvMap::new();
        let orchestrator = Orchestrator::new(&backend, &manifest, dir.path(), &env);
        let options = UpgradeOptions {
            skip_unchanged: true,
            ..Default::default()
        };

        let first = orchestrator.upgrade(&options).await.unwrap();
        let second = orchestrator.upgrade(&options).await.unwrap();

        assert_eq!(first.entry("a").unwrap().outcome, Outcome::Deployed);
        assert_eq!(second.entry("a").unwrap().outcome, Outcome::Unchanged);
        assert_eq!(backend.calls().chart_deploys.len(), 1);
    }

    #[tokio::test]
    async fn test_singles_are_substituted_and_applied() {
        let dir = tempfile::tempdir().unwrap();
        let mut manifest = manifest(&[]);
        manifest.singles.push(Single {
            name: "secret".to_string(),
            namespace: Some("infra".to_string()),
            file: None,
            use_create: true,
        });
        std::fs::create_dir_all(dir.path().join("singles")).unwrap();
        std::fs::write(dir.path().join("singles/secret.yaml"), "token: ${TOKEN}\nother: ${OTHER}\n").unwrap();

        let backend = MockBackend::new();
        let mut env = EnvMap::new();
        env.insert("TOKEN", "abc");

        let report = Orchestrator::new(&backend, &manifest, dir.path(), &env)
            .upgrade(&UpgradeOptions::default())
            .await
            .unwrap();

        assert!(report.is_success());
        let applies = backend.calls().manifest_applies;
        assert_eq!(applies.len(), 1);
        assert_eq!(applies[0].manifest, "token: abc\nother: ${OTHER}\n");
        assert_eq!(applies[0].namespace.as_deref(), Some("infra"));
        assert!(applies[0].use_create);
    }

    #[tokio::test]
    async fn test_missing_single_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut manifest = manifest(&[]);
        manifest.singles.push(Single {
            name: "ghost".to_string(),
            namespace: None,
            file: None,
            use_create: false,
        });
        let backend = MockBackend::new();
        let env = EnvMap::new();

        let report = Orchestrator::new(&backend, &manifest, dir.path(), &env)
            .upgrade(&UpgradeOptions::default())
            .await
            .unwrap();

        assert!(matches!(report.entry("ghost").unwrap().outcome, Outcome::Failed(_)));
        assert!(backend.calls().manifest_applies.is_empty());
    }

    #[tokio::test]
    async fn test_ignore_and_only_together_is_a_usage_error() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = manifest(&["a"]);
        let backend = backend(&["a"]);
        let env = EnvMap::new();
        let options = UpgradeOptions {
            ignore: vec!["a".to_string()],
            only: vec!["b".to_string()],
            ..Default::default()
        };

        let err = Orchestrator::new(&backend, &manifest, dir.path(), &env)
            .upgrade(&options)
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::Usage(_)));
        let calls = backend.calls();
        assert_eq!(calls.repo_syncs, 0);
        assert!(calls.fetches.is_empty());
    }

    #[tokio::test]
    async fn test_only_list_selects_releases() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = manifest(&["a", "b"]);
        let backend = backend(&["a", "b"]);
        let env = EnvMap::new();
        let options = UpgradeOptions {
            only: vec!["B".to_string()],
            ..Default::default()
        };

        let report = Orchestrator::new(&backend, &manifest, dir.path(), &env)
            .upgrade(&options)
            .await
            .unwrap();

        assert_eq!(report.entry("a").unwrap().outcome, Outcome::Skipped("not selected".to_string()));
        assert_eq!(backend.calls().deployed_names(), vec!["b".to_string()]);
    }

    #[tokio::test]
    async fn test_repo_sync_failure_fails_the_batch() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = manifest(&["a"]);
        let backend = backend(&["a"]).with_failing_repo_sync();
        let env = EnvMap::new();

        let err = Orchestrator::new(&backend, &manifest, dir.path(), &env)
            .upgrade(&UpgradeOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::Kube(_)));
        assert!(backend.calls().fetches.is_empty());
    }

    #[test]
    fn test_require_env() {
        let resolution = EnvResolution {
            missing: vec!["DB_PASSWORD".to_string()],
            ..Default::default()
        };

        assert!(matches!(
            require_env(&resolution, false),
            Err(EngineError::MissingEnv { .. })
        ));
        assert!(require_env(&resolution, true).is_ok());
        assert!(require_env(&EnvResolution::default(), false).is_ok());
    }
}
