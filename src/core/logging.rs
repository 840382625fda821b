//! Tracing setup - human-readable logs on stderr
//!
//! `VITALIS_LOG` takes precedence over the configured level.

use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "VITALIS_LOG";

/// Initialize the global subscriber. Safe to call more than once.
pub fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init();
}
