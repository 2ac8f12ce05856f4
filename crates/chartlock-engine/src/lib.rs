//! Chartlock Engine - value document reconciliation and upgrades
//!
//! - `reconcile`: re-derives a release's minimal overrides whenever its
//!   chart defaults or version move
//! - `orchestrator`: runs reconciliation and deployment across a manifest
//! - `uninstall`: removes a release or single and forgets it
//! - `diff`: line diff of what an upgrade would write

pub mod diff;
pub mod error;
pub mod orchestrator;
pub mod reconcile;
pub mod uninstall;

pub use diff::{DocumentDiff, LineType};
pub use error::{EngineError, Result};
pub use orchestrator::{
    EntryKind, Orchestrator, Outcome, ReleaseReport, UpgradeOptions, UpgradeReport, require_env,
};
pub use reconcile::{DocumentState, Reconciler, Reconciliation, deployable_values, reconcile_document};
pub use uninstall::{UninstallOptions, UninstallResult, uninstall};
