//! Logging Infrastructure
//!
//! Structured logging setup for the magen services.
//! Features:
//! - Console output, pretty for development or JSON for production
//! - Optional daily rotating `all` log with every record
//! - Optional daily rotating `error` log with error records only

use std::fs;
use std::path::Path;
use tracing::Level;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::MagenConfig;

/// Initialize the logging system with optional daily rotating files
///
/// # Arguments
/// * `level` - Log level (e.g., "info", "debug", "warn")
/// * `json_format` - Whether to use JSON format (true for production, false for development)
/// * `log_dir` - Optional directory for file logging (e.g., Some("./magen_logs"))
///
/// Fails if a global subscriber is already installed.
pub fn init_logger_with_file(
    level: &str,
    json_format: bool,
    log_dir: Option<&str>,
) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let console_layer = if json_format {
        fmt::layer()
            .json()
            .with_target(true)
            .with_current_span(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_file(true)
            .with_line_number(true)
            .boxed()
    };

    let file_layers = match log_dir {
        Some(dir) => {
            let log_dir = Path::new(dir);
            fs::create_dir_all(log_dir)?;

            // Everything, rotated daily
            let all_log = RollingFileAppender::new(Rotation::DAILY, log_dir, "magen_all.log");
            let all_layer = fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(all_log))
                .boxed();

            // Errors only
            let error_log = RollingFileAppender::new(Rotation::DAILY, log_dir, "magen_error.log");
            let error_layer = fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(error_log))
                .with_filter(tracing_subscriber::filter::filter_fn(|meta| {
                    *meta.level() == Level::ERROR
                }))
                .boxed();

            Some(all_layer.and_then(error_layer))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layers)
        .try_init()?;

    Ok(())
}

/// Initialize the logging system (console only)
///
/// Convenience function for console-only logging
pub fn init_logger(level: &str, json_format: bool) -> anyhow::Result<()> {
    init_logger_with_file(level, json_format, None)
}

/// Initialize logging from a [`MagenConfig`]
pub fn init_from_config(config: &MagenConfig) -> anyhow::Result<()> {
    init_logger_with_file(
        &config.log_level,
        config.log_json,
        config.log_dir.as_deref(),
    )
}
