//! Log output setup

use tracing_subscriber::EnvFilter;

/// Variable holding a `tracing` filter directive, e.g. `chartlock_engine=debug`
pub const LOG_ENV: &str = "CHARTLOCK_LOG";

/// Log to stderr so stdout only carries command output.
///
/// `--debug` wins over [`LOG_ENV`]; without either the level is `info`.
pub fn init(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
