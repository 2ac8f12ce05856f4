//! Error types for chartlock-kube

use thiserror::Error;

/// Result type for chartlock-kube operations
pub type Result<T> = std::result::Result<T, KubeError>;

/// Errors raised by the external collaborators
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum KubeError {
    /// Chart defaults could not be fetched (tool missing, network, unknown chart or version)
    #[error("failed to fetch default values for {chart} {version}: {message}")]
    FetchFailed {
        chart: String,
        version: String,
        message: String,
    },

    /// A deploy, apply, uninstall or delete command reported failure
    #[error("{action} of '{name}' failed")]
    DeployFailed {
        action: String,
        name: String,
        /// Combined stdout/stderr of the tool, verbatim
        output: String,
    },

    /// Adding or refreshing chart repositories failed
    #[error("repository sync failed: {message}")]
    RepoSyncFailed { message: String },

    /// Chart defaults were fetched but are not valid YAML
    #[error("invalid default values for {chart}: {source}")]
    InvalidValues {
        chart: String,
        #[source]
        source: chartlock_core::CoreError,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl KubeError {
    /// Raw tool output, when the failure carries it
    pub fn output(&self) -> Option<&str> {
        match self {
            KubeError::DeployFailed { output, .. } => Some(output),
            _ => None,
        }
    }

    /// Whether this is a defaults-fetch failure
    pub fn is_fetch_failure(&self) -> bool {
        matches!(self, KubeError::FetchFailed { .. } | KubeError::InvalidValues { .. })
    }
}
