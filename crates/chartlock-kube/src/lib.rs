//! Chartlock Kube - external collaborators for chartlock
//!
//! This crate provides:
//! - **Collaborator traits**: `ChartSource` (defaults fetch), `Deployer` (chart
//!   deploy, manifest apply, uninstall/delete) and `RepoManager`
//! - **Process backend**: implementations that shell out to `helm` and `kubectl`
//! - **Mock backend**: in-memory implementation with call recording for tests
//! - **Progress reporting**: spinner / line reporters and a scoped guard

pub mod backend;
pub mod command;
pub mod error;
pub mod helm;
pub mod kubectl;
pub mod mock;
pub mod process;
pub mod progress;

pub use backend::{
    Backend, ChartDeploy, ChartSource, DeployOptions, Deployer, ManifestApply, ManifestDelete,
    RepoManager,
};
pub use error::{KubeError, Result};
pub use mock::{Calls, MockBackend};
pub use process::ProcessBackend;
pub use progress::{ProgressGuard, ProgressReporter, SilentReporter, SpinnerReporter};
