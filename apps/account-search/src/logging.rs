//! Logging initialization for the account-search binary and tests
//!
//! Console output is either human-readable or JSON; an optional rotating file
//! layer mirrors it. Console output goes to stderr so stdout stays free for
//! results. `RUST_LOG` always overrides the configured level.

use std::fs;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;

/// Keeps the non-blocking file writer flushing until dropped.
pub struct LoggingGuard {
    _file_guard: Option<WorkerGuard>,
}

/// Initialize logging from `LoggingConfig`.
///
/// The returned guard must be held for the lifetime of the program, otherwise
/// buffered file output is lost.
pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<LoggingGuard> {
    let subscriber = tracing_subscriber::registry().with(build_env_filter(config));

    let file_guard = if config.json {
        let console_layer = fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .with_writer(std::io::stderr);

        if config.file_enabled {
            let (writer, guard) = create_file_appender(config)?;
            let file_layer = fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(false)
                .with_writer(writer);
            subscriber.with(console_layer).with(file_layer).try_init()?;
            Some(guard)
        } else {
            subscriber.with(console_layer).try_init()?;
            None
        }
    } else {
        let console_layer = fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_writer(std::io::stderr);

        if config.file_enabled {
            let (writer, guard) = create_file_appender(config)?;
            let file_layer = fmt::layer()
                .with_target(true)
                .with_ansi(false)
                .with_writer(writer);
            subscriber.with(console_layer).with(file_layer).try_init()?;
            Some(guard)
        } else {
            subscriber.with(console_layer).try_init()?;
            None
        }
    };

    tracing::debug!(
        level = %config.level,
        json = config.json,
        file_enabled = config.file_enabled,
        "Logging initialized"
    );

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}

fn build_env_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "account_search={},sqlx=warn,tokio_postgres=warn",
            config.level
        ))
    })
}

fn create_file_appender(config: &LoggingConfig) -> anyhow::Result<(NonBlocking, WorkerGuard)> {
    fs::create_dir_all(&config.file_directory)?;

    let dir = &config.file_directory;
    let prefix = &config.file_prefix;
    let appender = match config.file_rotation.as_str() {
        "hourly" => tracing_appender::rolling::hourly(dir, prefix),
        "minutely" => tracing_appender::rolling::minutely(dir, prefix),
        "never" => tracing_appender::rolling::never(dir, format!("{prefix}.log")),
        _ => tracing_appender::rolling::daily(dir, prefix),
    };

    Ok(tracing_appender::non_blocking(appender))
}

/// Environment-only logging, for tests and ad-hoc tools.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init_simple_logging() {
    let _ = tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "account_search=info,sqlx=warn".into()),
        )
        .with(fmt::layer().with_test_writer())
        .try_init();
}
