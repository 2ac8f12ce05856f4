//! Value document reconciliation
//!
//! Every run re-derives the minimal overrides against the current chart
//! defaults:
//!
//! - no stored document: start from empty overrides
//! - lock matches the chart version: `prune(current, merge(snapshot, overrides))`,
//!   which also absorbs hand edits made since the last run
//! - lock points at another version: first recover what the operator changed
//!   relative to the locked version, `prune(old, merge(snapshot, overrides))`,
//!   then re-project that delta onto the current defaults
//!
//! Nothing is written here. The caller decides whether to persist.

use std::path::Path;

use chartlock_core::fs::read_optional;
use chartlock_core::yaml::{self, Node};
use chartlock_core::{ChartRef, EnvMap, Lock, Release, ValueDocument, merge, prune};
use chartlock_kube::ChartSource;

use crate::error::Result;

/// Where a stored document stands relative to the requested chart version
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentState {
    /// No document stored yet
    Uninitialized,
    /// Locked to the requested version (or a legacy document with no lock)
    Stable,
    /// Locked to another version
    Drifted { from: String },
}

impl DocumentState {
    pub fn of(stored: Option<&ValueDocument>, chart: &ChartRef) -> Self {
        match stored {
            None => DocumentState::Uninitialized,
            Some(doc) if doc.lock.is_empty() || doc.lock.version == chart.version => DocumentState::Stable,
            Some(doc) => DocumentState::Drifted {
                from: doc.lock.version.clone(),
            },
        }
    }
}

/// Result of reconciling one release
#[derive(Debug, Clone)]
pub struct Reconciliation {
    pub release: String,
    pub state: DocumentState,
    /// Lock stored before this run
    pub old_lock: Option<Lock>,
    pub new_lock: Lock,
    /// Reconciled document to persist
    pub document: ValueDocument,
    /// `document` serialized
    pub rendered: String,
    /// Stored text before this run
    pub previous: Option<String>,
    /// Merged, comment-free, env-substituted values for the deployer
    pub deployable: String,
    /// `rendered` differs from `previous`
    pub changed: bool,
}

impl Reconciliation {
    /// Whether the lock moved to a new version
    pub fn version_changed(&self) -> bool {
        self.old_lock.as_ref().is_none_or(|lock| lock.version != self.new_lock.version)
    }

    /// Write the reconciled document, if it differs from what is stored
    pub fn persist(&self, path: &Path) -> Result<bool> {
        if !self.changed {
            return Ok(false);
        }
        chartlock_core::fs::write_atomic(path, self.rendered.as_bytes())?;
        Ok(true)
    }

    /// The overrides section as it will be stored
    pub fn overrides_yaml(&self) -> String {
        let mut overrides = self.document.overrides.clone();
        overrides.comments.head = chartlock_core::OVERRIDES_HEADER.to_string();
        yaml::serialize(&overrides)
    }
}

/// Re-derive a stored document's overrides against `current_defaults`.
///
/// `locked_defaults` are the defaults of the version the document is locked
/// to, fetched only when that version differs from `chart.version`.
pub fn reconcile_document(
    stored: &ValueDocument,
    chart: &ChartRef,
    current_defaults: &Node,
    locked_defaults: Option<&Node>,
) -> ValueDocument {
    let current = current_defaults.strip_comments();
    let snapshot = if !stored.defaults.is_zero() {
        stored.defaults.strip_comments()
    } else {
        locked_defaults.map_or_else(|| current.clone(), Node::strip_comments)
    };

    let overrides = match locked_defaults {
        Some(old) => {
            let delta = prune(&old.strip_comments(), &merge(&snapshot, &stored.overrides));
            prune(&current, &merge(&current, &delta))
        }
        None => prune(&current, &merge(&snapshot, &stored.overrides)),
    };

    ValueDocument::new(Lock::new(chart), overrides, current_defaults.clone())
}

/// Values handed to the deployer: defaults with the overrides applied,
/// comments removed, env tokens substituted
pub fn deployable_values(document: &ValueDocument, env: &EnvMap) -> String {
    let merged = merge(&document.defaults.strip_comments(), &document.overrides).strip_comments();
    env.substitute(&yaml::serialize(&merged))
}

/// Reconciles releases against a chart source
pub struct Reconciler<'a, S: ChartSource + ?Sized> {
    source: &'a S,
    env: &'a EnvMap,
}

impl<'a, S: ChartSource + ?Sized> Reconciler<'a, S> {
    pub fn new(source: &'a S, env: &'a EnvMap) -> Self {
        Self { source, env }
    }

    /// Reconcile `release` against the document stored at `path`.
    ///
    /// Fails without side effects when a stored document is malformed or
    /// defaults cannot be fetched.
    pub async fn reconcile(&self, release: &Release, path: &Path) -> Result<Reconciliation> {
        let path_label = path.display().to_string();
        let previous = read_optional(path)?;
        let stored = match &previous {
            Some(text) => ValueDocument::parse(text, &path_label)?,
            None => None,
        };

        let chart = &release.chart;
        let current_defaults = self.source.default_values(chart).await?;
        let state = DocumentState::of(stored.as_ref(), chart);

        let document = match (&state, &stored) {
            (DocumentState::Drifted { from }, Some(doc)) => {
                tracing::info!(
                    "Release {} is locked to {} {}, migrating overrides to {}",
                    release.name,
                    chart.name,
                    from,
                    chart.version
                );
                let old_defaults = self.source.default_values(&chart.at_version(from)).await?;
                reconcile_document(doc, chart, &current_defaults, Some(&old_defaults))
            }
            (_, Some(doc)) => reconcile_document(doc, chart, &current_defaults, None),
            (_, None) => ValueDocument::initial(chart, &current_defaults),
        };

        let rendered = document.to_yaml();
        let changed = previous.as_deref() != Some(rendered.as_str());
        tracing::debug!(release = %release.name, ?state, changed, "reconciled");

        Ok(Reconciliation {
            release: release.name.clone(),
            state,
            old_lock: stored.map(|doc| doc.lock),
            new_lock: document.lock.clone(),
            deployable: deployable_values(&document, self.env),
            document,
            rendered,
            previous,
            changed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chartlock_kube::MockBackend;

    fn yaml(text: &str) -> Node {
        yaml::parse(text).unwrap().children.remove(0)
    }

    fn release(version: &str) -> Release {
        Release {
            name: "cache".to_string(),
            namespace: "default".to_string(),
            chart: ChartRef {
                name: "redis".to_string(),
                repo: "bitnami".to_string(),
                version: version.to_string(),
                app_version: String::new(),
            },
            values_file: None,
        }
    }

    fn backend() -> MockBackend {
        MockBackend::new()
            .with_defaults("redis", "1.0", yaml("# Redis\n\nreplicas: 1\nimage:\n  tag: \"1.0\"\n"))
            .with_defaults("redis", "1.1", yaml("# Redis\n\nreplicas: 1\nimage:\n  tag: \"1.1\"\n"))
    }

    fn overrides_of(rec: &Reconciliation) -> String {
        yaml::serialize(&rec.document.overrides)
    }

    #[tokio::test]
    async fn test_first_run_creates_empty_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.yaml");
        let backend = backend();
        let env = EnvMap::new();

        let rec = Reconciler::new(&backend, &env).reconcile(&release("1.0"), &path).await.unwrap();

        assert_eq!(rec.state, DocumentState::Uninitialized);
        assert!(rec.changed);
        assert!(rec.document.overrides.is_empty());
        assert_eq!(rec.new_lock.version, "1.0");
        assert_eq!(rec.deployable, "replicas: 1\nimage:\n  tag: \"1.0\"\n");
        // nothing written yet
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_upgrade_keeps_only_operator_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.yaml");
        let stored = ValueDocument::new(
            Lock::new(&release("1.0").chart),
            yaml("replicas: 3\n"),
            yaml("replicas: 1\nimage:\n  tag: \"1.0\"\n"),
        );
        stored.save(&path).unwrap();

        let backend = backend();
        let env = EnvMap::new();
        let rec = Reconciler::new(&backend, &env).reconcile(&release("1.1"), &path).await.unwrap();

        assert_eq!(rec.state, DocumentState::Drifted { from: "1.0".to_string() });
        assert_eq!(overrides_of(&rec), "replicas: 3\n");
        assert_eq!(rec.new_lock.version, "1.1");
        assert!(rec.version_changed());
        assert_eq!(rec.deployable, "replicas: 3\nimage:\n  tag: \"1.1\"\n");
        assert_eq!(
            backend.calls().fetches,
            vec![
                ("redis".to_string(), "1.1".to_string()),
                ("redis".to_string(), "1.0".to_string())
            ]
        );
    }

    #[tokio::test]
    async fn test_hand_edits_to_defaults_section_move_into_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.yaml");
        let stored = ValueDocument::new(
            Lock::new(&release("1.0").chart),
            Node::mapping(),
            yaml("replicas: 1\nimage:\n  tag: \"custom\"\n"),
        );
        stored.save(&path).unwrap();

        let backend = backend();
        let env = EnvMap::new();
        let rec = Reconciler::new(&backend, &env).reconcile(&release("1.0"), &path).await.unwrap();

        assert_eq!(rec.state, DocumentState::Stable);
        assert_eq!(overrides_of(&rec), "image:\n  tag: custom\n");
        assert_eq!(rec.document.defaults.get_path("image.tag").unwrap().value, "1.0");
    }

    #[tokio::test]
    async fn test_reconcile_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.yaml");
        std::fs::write(&path, "# legacy values\nreplicas: 3 # more\npassword: ${DB_PASSWORD}\n").unwrap();

        let backend = backend();
        let mut env = EnvMap::new();
        env.insert("DB_PASSWORD", "s3cret");
        let reconciler = Reconciler::new(&backend, &env);

        let first = reconciler.reconcile(&release("1.0"), &path).await.unwrap();
        assert!(first.persist(&path).unwrap());
        let second = reconciler.reconcile(&release("1.0"), &path).await.unwrap();

        assert!(!second.changed);
        assert_eq!(second.rendered, first.rendered);
        assert!(!second.persist(&path).unwrap());
        assert!(second.rendered.contains("password: ${DB_PASSWORD}"));
        assert!(second.deployable.contains("password: s3cret"));
    }

    #[tokio::test]
    async fn test_fetch_failure_leaves_document_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.yaml");
        let stored = ValueDocument::new(
            Lock::new(&release("0.9").chart),
            yaml("replicas: 3\n"),
            yaml("replicas: 1\n"),
        );
        stored.save(&path).unwrap();
        let before = std::fs::read_to_string(&path).unwrap();

        let backend = backend();
        let env = EnvMap::new();
        let err = Reconciler::new(&backend, &env).reconcile(&release("1.0"), &path).await;

        assert!(err.is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), before);
    }

    #[test]
    fn test_reconcile_document_drops_overrides_equal_to_new_defaults() {
        let stored = ValueDocument::new(Lock::default(), yaml("replicas: 3\nworkers: 4\n"), Node::default());
        let chart = release("2.0").chart;

        let doc = reconcile_document(
            &stored,
            &chart,
            &yaml("replicas: 3\nworkers: 2\n"),
            Some(&yaml("replicas: 1\nworkers: 2\n")),
        );

        assert_eq!(yaml::serialize(&doc.overrides), "workers: 4\n");
        assert_eq!(doc.lock.version, "2.0");
    }
}
