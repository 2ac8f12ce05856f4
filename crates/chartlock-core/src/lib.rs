//! Chartlock Core - value overlays for chart releases
//!
//! This crate provides the building blocks the engine works with:
//! - `yaml`: comment-preserving YAML node tree, reader and writer
//! - `merge`: structural `merge` / `prune` over node trees
//! - `env`: allow-listed `${NAME}` substitution
//! - `Manifest`: the releases, singles and repositories being managed
//! - `ValueDocument`: the per-release lock / overrides / defaults file

pub mod document;
pub mod env;
pub mod error;
pub mod fs;
pub mod manifest;
pub mod merge;
pub mod yaml;

pub use document::{LOCK_HEADER, Lock, OVERRIDES_HEADER, ValueDocument};
pub use env::{EnvFile, EnvMap, EnvResolution};
pub use error::{CoreError, Result};
pub use manifest::{ChartRef, DEFAULT_MANIFEST, Manifest, Release, Repo, Single};
pub use merge::{merge, prune};
pub use yaml::{Node, NodeKind};
