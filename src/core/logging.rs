//! Structured JSON logging.

use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Maps the `--log-level` flag to a tracing level. Unknown values mean `info`.
pub fn parse_level(level: &str) -> Level {
    match level.trim().to_ascii_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Picks the filter directive: an explicit level wins, then `RUST_LOG`, then `info`.
pub fn filter_directive(level: Option<Level>, rust_log: Option<String>) -> String {
    match (level, rust_log) {
        (Some(level), _) => level.to_string().to_lowercase(),
        (None, Some(directive)) if !directive.trim().is_empty() => directive,
        _ => Level::INFO.to_string().to_lowercase(),
    }
}

/// Installs a JSON subscriber on stdout.
pub fn init(level: Option<Level>) {
    let directive = filter_directive(level, std::env::var(EnvFilter::DEFAULT_ENV).ok());
    let filter = EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .with_target(false)
        .with_current_span(false)
        .with_writer(std::io::stdout)
        .try_init();
}
