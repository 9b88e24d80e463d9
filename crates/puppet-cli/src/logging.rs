//! Worker log output
//!
//! Logs go to stderr so stdout stays free for self-test and replay reports.

use puppet_core::config::LoggingConfig;
use tracing_subscriber::EnvFilter;

/// Filter from `rust_log` when set and valid, otherwise from the configured level
pub fn build_filter(config: &LoggingConfig, rust_log: Option<&str>) -> EnvFilter {
    rust_log
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .or_else(|| EnvFilter::try_new(&config.level).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

/// Install the global subscriber; later calls are ignored
pub fn init(config: &LoggingConfig) {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = build_filter(config, rust_log.as_deref());
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(config.with_target)
        .with_writer(std::io::stderr);

    let result = match config.format.as_str() {
        "json" => builder.json().try_init(),
        "pretty" => builder.pretty().try_init(),
        _ => builder.compact().try_init(),
    };
    if result.is_err() {
        tracing::debug!("Logging already initialized");
    }
}
