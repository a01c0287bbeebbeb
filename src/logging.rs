use crate::config::AppConfig;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Takes precedence over `RUST_LOG`
const LOG_ENV: &str = "CHARON_LOG";

/// Transport crates that log every request at debug
const QUIET_TARGETS: &[&str] = &["hyper", "hyper_util", "reqwest", "h2", "rustls", "tower"];

/// Default directives: the configured level for charon itself, warn for
/// everything else. The settlement path gets at least `info` so webhook,
/// polling and timeout outcomes are always recorded.
fn default_directives(log_level: &str) -> String {
    let level = log_level.trim().to_ascii_lowercase();
    let mut directives = vec!["warn".to_string(), format!("charon={}", level)];
    if matches!(level.as_str(), "error" | "warn") {
        directives.push("charon::transfer=info".to_string());
    }
    directives.extend(QUIET_TARGETS.iter().map(|t| format!("{}=warn", t)));
    directives.join(",")
}

fn build_filter(config: &AppConfig) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(default_directives(&config.log_level)))
}

/// Install the global subscriber. Keep the returned guard alive until exit,
/// otherwise buffered file output is lost.
pub fn init_logging(config: &AppConfig) -> WorkerGuard {
    let file_appender = match config.rotation.as_str() {
        "hourly" => tracing_appender::rolling::hourly(&config.log_dir, &config.log_file),
        "daily" => tracing_appender::rolling::daily(&config.log_dir, &config.log_file),
        _ => tracing_appender::rolling::never(&config.log_dir, &config.log_file),
    };

    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let registry = tracing_subscriber::registry().with(build_filter(config));

    if config.use_json {
        // end_to_end_id / transaction_id fields stay queryable in JSON
        let file_layer = fmt::layer()
            .json()
            .with_target(true)
            .with_writer(non_blocking)
            .with_ansi(false);
        registry.with(file_layer).init();
    } else {
        let file_layer = fmt::layer()
            .with_target(false)
            .with_writer(non_blocking)
            .with_ansi(false);
        let stdout_layer = fmt::layer().with_target(false).with_ansi(true);
        registry.with(file_layer).with(stdout_layer).init();
    }

    guard
}
