//! CLI error types with exit code handling
//!
//! Every error reaching `main` is a [`CliError`], which knows the exit code
//! it maps to.

use chartlock_core::CoreError;
use chartlock_engine::EngineError;
use miette::Diagnostic;
use thiserror::Error;

use crate::exit_codes;

#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    /// Invalid arguments or contradictory options
    #[error("{message}")]
    #[diagnostic(code(chartlock::cli::usage))]
    Usage {
        message: String,
        #[help]
        help: Option<String>,
    },

    #[error("Manifest error: {message}")]
    #[diagnostic(code(chartlock::cli::manifest))]
    Manifest {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Malformed value document or chart defaults
    #[error("Values error: {message}")]
    #[diagnostic(code(chartlock::cli::values))]
    Values { message: String },

    #[error("{message}")]
    #[diagnostic(code(chartlock::cli::env))]
    Env {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// A helm or kubectl call failed
    #[error("{message}")]
    #[diagnostic(code(chartlock::cli::deploy))]
    Deploy { message: String },

    #[error("{failed} of {total} release(s) failed")]
    #[diagnostic(code(chartlock::cli::upgrade))]
    UpgradeFailed { failed: usize, total: usize },

    #[error("IO error: {message}")]
    #[diagnostic(code(chartlock::cli::io))]
    Io { message: String },

    #[error("{message}")]
    #[diagnostic(code(chartlock::cli::error))]
    Other { message: String },
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Usage { .. } => exit_codes::USAGE_ERROR,
            CliError::Manifest { .. } => exit_codes::MANIFEST_ERROR,
            CliError::Values { .. } => exit_codes::VALUES_ERROR,
            CliError::Env { .. } => exit_codes::ENV_ERROR,
            CliError::Deploy { .. } | CliError::UpgradeFailed { .. } => exit_codes::DEPLOY_ERROR,
            CliError::Io { .. } => exit_codes::IO_ERROR,
            CliError::Other { .. } => exit_codes::ERROR,
        }
    }

    pub fn usage(message: impl Into<String>) -> Self {
        Self::Usage {
            message: message.into(),
            help: None,
        }
    }

    pub fn usage_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Usage {
            message: message.into(),
            help: Some(help.into()),
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidManifest { .. } => CliError::Manifest {
                message: err.to_string(),
                help: None,
            },
            CoreError::Parse { .. } | CoreError::InvalidDocument { .. } | CoreError::InvalidTree { .. } => {
                CliError::Values {
                    message: err.to_string(),
                }
            }
            CoreError::EnvFile { .. } => CliError::Env {
                message: err.to_string(),
                help: None,
            },
            CoreError::NotFound { .. } | CoreError::Io(_) => CliError::Io {
                message: err.to_string(),
            },
            CoreError::YamlParse(_) => CliError::Other {
                message: err.to_string(),
            },
        }
    }
}

impl From<EngineError> for CliError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Usage(message) => CliError::Usage { message, help: None },
            EngineError::UnknownTarget(_) => CliError::usage_with_help(
                err.to_string(),
                "Check the names listed in the manifest",
            ),
            EngineError::MissingEnv { .. } => CliError::Env {
                message: err.to_string(),
                help: Some(
                    "Set them in the environment or the env file, or pass --allow-missing-env".to_string(),
                ),
            },
            EngineError::Core(core) => core.into(),
            EngineError::Kube(kube) => {
                let message = match kube.output() {
                    Some(output) => format!("{}\n{}", kube, output.trim_end()),
                    None => kube.to_string(),
                };
                CliError::Deploy { message }
            }
            EngineError::Io(io) => io.into(),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Io {
            message: err.to_string(),
        }
    }
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        let usage: CliError = EngineError::Usage("both lists".to_string()).into();
        assert_eq!(usage.exit_code(), exit_codes::USAGE_ERROR);

        let env: CliError = EngineError::MissingEnv {
            names: vec!["TOKEN".to_string()],
        }
        .into();
        assert_eq!(env.exit_code(), exit_codes::ENV_ERROR);

        let manifest: CliError = CoreError::InvalidManifest {
            message: "duplicate release 'cache'".to_string(),
        }
        .into();
        assert_eq!(manifest.exit_code(), exit_codes::MANIFEST_ERROR);

        let missing: CliError = CoreError::NotFound {
            path: "singles/secret.yaml".to_string(),
        }
        .into();
        assert_eq!(missing.exit_code(), exit_codes::IO_ERROR);
    }
}
