//! # Structured Logging Module
//!
//! Environment-aware structured logging: a human-readable console layer plus
//! a JSON file layer under `log/`, so long send sessions and failed groups
//! can be inspected after the fact.

use chrono::Utc;
use std::fs;
use std::path::PathBuf;
use std::process;
use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize structured logging with environment-specific configuration.
///
/// Safe to call repeatedly. Never panics: if the log directory cannot be
/// created only the console layer is installed, and an already-installed
/// global subscriber is left in place.
pub fn init_structured_logging() {
    LOGGER_INITIALIZED.get_or_init(|| {
        let environment = get_environment();
        let log_level = get_log_level(&environment);
        let pid = process::id();

        let console_layer = fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_level(true)
            .with_ansi(true)
            .with_filter(build_filter(&log_level));

        let log_dir = PathBuf::from("log");
        let log_filename = format!(
            "{}.{}.{}.log",
            environment,
            pid,
            Utc::now().format("%Y%m%d_%H%M%S")
        );

        match fs::create_dir_all(&log_dir) {
            Ok(()) => {
                let file_appender = tracing_appender::rolling::never(&log_dir, &log_filename);
                let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

                let file_layer = fmt::layer()
                    .with_writer(file_writer)
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_level(true)
                    .with_ansi(false)
                    .json()
                    .with_filter(build_filter(&log_level));

                if tracing_subscriber::registry()
                    .with(console_layer)
                    .with(file_layer)
                    .try_init()
                    .is_err()
                {
                    tracing::debug!("Global tracing subscriber already initialized - continuing with existing subscriber");
                }

                tracing::info!(
                    pid = pid,
                    environment = %environment,
                    log_file = %log_dir.join(&log_filename).display(),
                    "🔧 STRUCTURED LOGGING: Initialized with file output"
                );

                // The writer flushes for the life of the process.
                std::mem::forget(guard);
            }
            Err(e) => {
                if tracing_subscriber::registry()
                    .with(console_layer)
                    .try_init()
                    .is_err()
                {
                    tracing::debug!("Global tracing subscriber already initialized - continuing with existing subscriber");
                }

                tracing::warn!(
                    pid = pid,
                    environment = %environment,
                    error = %e,
                    "🔧 STRUCTURED LOGGING: Log directory unavailable, console output only"
                );
            }
        }
    });
}

/// `RUST_LOG` wins over the environment-derived level
fn build_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Get current environment from environment variables
fn get_environment() -> String {
    std::env::var("EVENTPUMP_ENV")
        .or_else(|_| std::env::var("APP_ENV"))
        .unwrap_or_else(|_| "development".to_string())
}

/// Get log level based on environment
fn get_log_level(environment: &str) -> String {
    match environment {
        "production" => "info".to_string(),
        _ => "debug".to_string(),
    }
}

/// Log structured data for a producer batch
pub fn log_batch_operation(
    operation: &str,
    batch_index: usize,
    batch_size: usize,
    status: &str,
    details: Option<&str>,
) {
    tracing::info!(
        operation = %operation,
        batch_index = batch_index,
        batch_size = batch_size,
        status = %status,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "📦 BATCH_OPERATION"
    );
}

/// Log structured data for a consumer group
pub fn log_group_operation(
    operation: &str,
    group_size: usize,
    failure_count: usize,
    status: &str,
    details: Option<&str>,
) {
    tracing::info!(
        operation = %operation,
        group_size = group_size,
        failure_count = failure_count,
        status = %status,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "📥 GROUP_OPERATION"
    );
}

/// Log error with full context
pub fn log_error(component: &str, operation: &str, error: &str, context: Option<&str>) {
    tracing::error!(
        component = %component,
        operation = %operation,
        error = %error,
        context = context,
        timestamp = %Utc::now().to_rfc3339(),
        "❌ ERROR"
    );
}
