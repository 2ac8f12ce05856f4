//! The `chartlock.yaml` manifest: repositories, allowed env names, releases
//! and single manifests

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::fs::{read_optional, write_atomic};

pub const DEFAULT_MANIFEST: &str = "chartlock.yaml";
pub const RELEASES_DIR: &str = "releases";
pub const SINGLES_DIR: &str = "singles";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub repos: Vec<Repo>,

    /// Environment variable names that may be substituted into deployable output
    #[serde(default)]
    pub allowed_env: Vec<String>,

    #[serde(default)]
    pub releases: Vec<Release>,

    #[serde(default)]
    pub singles: Vec<Single>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repo {
    pub name: String,
    pub url: String,
}

/// Package identity of a chart
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartRef {
    pub name: String,

    /// Repository alias from `repos`
    #[serde(default)]
    pub repo: String,

    #[serde(deserialize_with = "scalar_string")]
    pub version: String,

    #[serde(
        default,
        deserialize_with = "scalar_string",
        skip_serializing_if = "String::is_empty"
    )]
    pub app_version: String,
}

impl ChartRef {
    /// `repo/name`, as passed to helm
    pub fn qualified(&self) -> String {
        if self.repo.is_empty() {
            self.name.clone()
        } else {
            format!("{}/{}", self.repo, self.name)
        }
    }

    /// Same chart at another version
    pub fn at_version(&self, version: &str) -> ChartRef {
        ChartRef {
            version: version.to_string(),
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    pub name: String,

    #[serde(default = "default_namespace")]
    pub namespace: String,

    pub chart: ChartRef,

    /// Overlay document path, relative to the manifest directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values_file: Option<PathBuf>,
}

impl Release {
    pub fn values_path(&self, root: &Path) -> PathBuf {
        match &self.values_file {
            Some(file) => root.join(file),
            None => root.join(RELEASES_DIR).join(format!("{}.yaml", self.name)),
        }
    }
}

/// A raw manifest deployed with kubectl
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Single {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,

    /// `kubectl create` instead of `kubectl apply`
    #[serde(default)]
    pub use_create: bool,
}

impl Single {
    pub fn file_path(&self, root: &Path) -> PathBuf {
        match &self.file {
            Some(file) => root.join(file),
            None => root.join(SINGLES_DIR).join(format!("{}.yaml", self.name)),
        }
    }
}

/// Accept `version: 1.0` as well as `version: "1.0"`
fn scalar_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match serde_yaml::Value::deserialize(deserializer)? {
        serde_yaml::Value::String(s) => Ok(s),
        serde_yaml::Value::Number(n) => Ok(n.to_string()),
        serde_yaml::Value::Bool(b) => Ok(b.to_string()),
        serde_yaml::Value::Null => Ok(String::new()),
        other => Err(serde::de::Error::custom(format!(
            "expected a version string, found {:?}",
            other
        ))),
    }
}

fn default_namespace() -> String {
    "default".to_string()
}

impl Manifest {
    /// Load and validate a manifest
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = read_optional(path)?.ok_or_else(|| CoreError::NotFound {
            path: path.display().to_string(),
        })?;
        let manifest: Self = if content.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(&content).map_err(|e| CoreError::InvalidManifest {
                message: format!("{}: {}", path.display(), e),
            })?
        };
        manifest.validate()?;
        Ok(manifest)
    }

    /// Like [`Manifest::load_from`], but a missing file is an empty manifest
    pub fn load_or_default(path: &Path) -> Result<Self> {
        match Self::load_from(path) {
            Err(err) if err.is_not_found() => {
                tracing::debug!("No manifest at {}, starting empty", path.display());
                Ok(Self::default())
            }
            other => other,
        }
    }

    /// Validate and write atomically
    pub fn save_to(&self, path: &Path) -> Result<()> {
        self.validate()?;
        let content = serde_yaml::to_string(self)?;
        write_atomic(path, content.as_bytes())
    }

    /// Directory that relative release and single paths resolve against
    pub fn root_dir(path: &Path) -> PathBuf {
        match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    pub fn validate(&self) -> Result<()> {
        unique("repo", self.repos.iter().map(|r| r.name.as_str()))?;
        unique("release", self.releases.iter().map(|r| r.name.as_str()))?;
        unique("single", self.singles.iter().map(|s| s.name.as_str()))?;
        unique("allowed env", self.allowed_env.iter().map(String::as_str))?;

        for release in &self.releases {
            if release.chart.name.is_empty() {
                return Err(invalid(format!("release '{}' has no chart name", release.name)));
            }
            if !release.chart.repo.is_empty() && self.repo(&release.chart.repo).is_none() {
                return Err(invalid(format!(
                    "release '{}' references unknown repo '{}'",
                    release.name, release.chart.repo
                )));
            }
        }

        Ok(())
    }

    pub fn repo(&self, name: &str) -> Option<&Repo> {
        self.repos.iter().find(|r| r.name.eq_ignore_ascii_case(name))
    }

    pub fn release(&self, name: &str) -> Option<&Release> {
        self.releases.iter().find(|r| r.name.eq_ignore_ascii_case(name))
    }

    pub fn single(&self, name: &str) -> Option<&Single> {
        self.singles.iter().find(|s| s.name.eq_ignore_ascii_case(name))
    }

    pub fn remove_release(&mut self, name: &str) -> Option<Release> {
        let idx = self.releases.iter().position(|r| r.name.eq_ignore_ascii_case(name))?;
        Some(self.releases.remove(idx))
    }

    pub fn remove_single(&mut self, name: &str) -> Option<Single> {
        let idx = self.singles.iter().position(|s| s.name.eq_ignore_ascii_case(name))?;
        Some(self.singles.remove(idx))
    }
}

fn invalid(message: String) -> CoreError {
    CoreError::InvalidManifest { message }
}

fn unique<'a>(what: &str, names: impl Iterator<Item = &'a str>) -> Result<()> {
    let mut seen = HashSet::new();
    for name in names {
        if name.is_empty() {
            return Err(invalid(format!("{} with an empty name", what)));
        }
        if !seen.insert(name.to_lowercase()) {
            return Err(invalid(format!("duplicate {} '{}'", what, name)));
        }
    }
    Ok(())
}
