//! Logging initialization.
//!
//! Logs go to stderr so stdout stays clean for pipeline output (including
//! `--json` mode). `RUST_LOG` controls the filter, defaulting to `info`.

use tracing_subscriber::EnvFilter;

pub fn init_stderr_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}
