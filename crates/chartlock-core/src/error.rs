//! Core error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("File not found: {path}")]
    NotFound { path: String },

    #[error("Failed to parse {path} at line {line}: {message}")]
    Parse {
        path: String,
        line: usize,
        message: String,
    },

    #[error("Invalid document {path}: {message}")]
    InvalidDocument { path: String, message: String },

    #[error("Invalid manifest: {message}")]
    InvalidManifest { message: String },

    #[error("Invalid tree: {message}")]
    InvalidTree { message: String },

    #[error("Environment file not readable: {path}: {message}")]
    EnvFile { path: String, message: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    /// Whether this error means "the file simply isn't there yet"
    pub fn is_not_found(&self) -> bool {
        match self {
            CoreError::NotFound { .. } => true,
            CoreError::Io(err) => err.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
