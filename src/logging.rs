//! Logging setup
//!
//! Logs go to stderr so JSON on stdout stays parseable. Filter precedence:
//! RUST_LOG, then the config `log_filter`, then `--verbose` / warn.

use tracing_subscriber::EnvFilter;

/// Filter directive used when RUST_LOG is unset
pub fn default_directive(config_filter: Option<&str>, verbose: bool) -> String {
    match config_filter.map(str::trim).filter(|f| !f.is_empty()) {
        Some(filter) => filter.to_string(),
        None if verbose => "tvshows=debug,info".to_string(),
        None => "warn".to_string(),
    }
}

/// Install the global subscriber; a second call is a no-op
pub fn init(config_filter: Option<&str>, verbose: bool) {
    let fallback = default_directive(config_filter, verbose);
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&fallback))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .ok();
}
