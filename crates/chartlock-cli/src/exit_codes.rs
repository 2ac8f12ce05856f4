//! Standard exit codes for CLI operations
//!
//! These exit codes follow Unix conventions and sysexits.h where applicable.

/// General error - unspecified failure
pub const ERROR: i32 = 1;

/// Manifest error - missing, unreadable or invalid manifest
pub const MANIFEST_ERROR: i32 = 2;

/// Values error - malformed value document or chart defaults
pub const VALUES_ERROR: i32 = 3;

/// Deploy error - helm or kubectl failed for at least one release
pub const DEPLOY_ERROR: i32 = 4;

/// IO error - file not found, permission denied, etc.
pub const IO_ERROR: i32 = 5;

/// Environment error - allowed variables could not be resolved
pub const ENV_ERROR: i32 = 6;

/// Usage error - invalid arguments or options (following sysexits.h convention)
pub const USAGE_ERROR: i32 = 64;
