//! Engine error types

use chartlock_core::CoreError;
use chartlock_kube::KubeError;
use thiserror::Error;

/// Main engine error type
#[derive(Error, Debug)]
pub enum EngineError {
    /// Contradictory options, detected before any work starts
    #[error("Usage error: {0}")]
    Usage(String),

    #[error("Missing required environment variables: {}", names.join(", "))]
    MissingEnv { names: Vec<String> },

    #[error("'{0}' is neither a release nor a single in the manifest")]
    UnknownTarget(String),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Kube(#[from] KubeError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// Raw collaborator output, when there is any
    pub fn output(&self) -> Option<&str> {
        match self {
            EngineError::Kube(err) => err.output(),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
