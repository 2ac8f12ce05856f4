//! Allow-listed environment variables and `${NAME}` substitution
//!
//! Substitution only ever runs on deployable output. Persisted overlays keep
//! their literal `${NAME}` placeholders.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{CoreError, Result};

/// Where the `.env`-style file comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvFile {
    /// The implicit `.env`; a missing file is fine
    Default(PathBuf),
    /// Named by the user; a missing file is an error
    Explicit(PathBuf),
}

impl EnvFile {
    pub fn path(&self) -> &Path {
        match self {
            EnvFile::Default(path) | EnvFile::Explicit(path) => path,
        }
    }
}

/// Resolved name → value map used for substitution
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvMap(BTreeMap<String, String>);

/// Outcome of resolving the allow-list
#[derive(Debug, Clone, Default)]
pub struct EnvResolution {
    pub env: EnvMap,
    /// Names set in the env file that are not allow-listed
    pub disallowed: Vec<String>,
    /// Allow-listed names with no value anywhere
    pub missing: Vec<String>,
}

impl EnvMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Replace every `${NAME}` whose `NAME` is in the map.
    ///
    /// Unknown tokens are left verbatim. Substituted values are not scanned
    /// again, so the result does not depend on map order.
    pub fn substitute(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut rest = text;

        while let Some(start) = rest.find("${") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            match after.find('}') {
                Some(end) => match self.0.get(&after[..end]) {
                    Some(value) => {
                        out.push_str(value);
                        rest = &after[end + 1..];
                    }
                    None => {
                        out.push_str("${");
                        rest = after;
                    }
                },
                None => {
                    out.push_str(&rest[start..]);
                    rest = "";
                }
            }
        }

        out.push_str(rest);
        out
    }

    /// Resolve `allowed` from the process environment, then the env file
    pub fn resolve(allowed: &[String], file: Option<&EnvFile>) -> Result<EnvResolution> {
        Self::resolve_with(allowed, file, |name| std::env::var(name).ok())
    }

    /// Like [`EnvMap::resolve`] with a custom process-environment lookup
    pub fn resolve_with(
        allowed: &[String],
        file: Option<&EnvFile>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<EnvResolution> {
        let allowed: Vec<String> = allowed.iter().map(|name| name.to_uppercase()).collect();
        let mut resolution = EnvResolution::default();

        for name in &allowed {
            if let Some(value) = lookup(name) {
                resolution.env.insert(name.clone(), value);
            }
        }

        if let Some(file) = file {
            for (name, value) in read_env_file(file)? {
                if allowed.contains(&name) {
                    resolution.env.insert(name, value);
                } else {
                    tracing::warn!(
                        "Env variable {} is set in {} but not allowed",
                        name,
                        file.path().display()
                    );
                    resolution.disallowed.push(name);
                }
            }
        }

        resolution.missing = allowed
            .into_iter()
            .filter(|name| resolution.env.get(name).is_none())
            .collect();

        Ok(resolution)
    }
}

/// Parse `NAME=value` lines; names are upper-cased
fn read_env_file(file: &EnvFile) -> Result<Vec<(String, String)>> {
    let content = match std::fs::read_to_string(file.path()) {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return match file {
                EnvFile::Default(_) => Ok(Vec::new()),
                EnvFile::Explicit(path) => Err(CoreError::EnvFile {
                    path: path.display().to_string(),
                    message: err.to_string(),
                }),
            };
        }
        Err(err) => {
            return Err(CoreError::EnvFile {
                path: file.path().display().to_string(),
                message: err.to_string(),
            });
        }
    };

    let mut entries = Vec::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let (name, value) = line.split_once('=').unwrap_or((line, ""));
        let name = name.trim().trim_start_matches("export ").trim().to_uppercase();
        entries.push((name, value.to_string()));
    }
    Ok(entries)
}
