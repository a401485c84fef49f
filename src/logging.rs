//! Tracing setup shared by the binaries.
//!
//! Environment variables take precedence over the `[logging]` section:
//! `TABLEGATE_LOG` (filter directive) and `TABLEGATE_LOG_JSON` (`1`/`0`).

use std::env;
use std::sync::OnceLock;

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

static TRACE_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Filter directive after environment overrides.
pub fn effective_level(config: &LoggingConfig) -> String {
    env::var("TABLEGATE_LOG")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| config.level.clone())
}

/// Whether JSON output is selected after environment overrides.
pub fn effective_json(config: &LoggingConfig) -> bool {
    env::var("TABLEGATE_LOG_JSON")
        .ok()
        .map_or_else(|| config.format == "json", |v| v != "0")
}

fn make_filter(level: &str) -> EnvFilter {
    EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"))
}

fn make_writer(config: &LoggingConfig) -> NonBlocking {
    let file = config.file.as_deref().and_then(|path| {
        match std::fs::OpenOptions::new().create(true).append(true).open(path) {
            Ok(f) => Some(f),
            Err(e) => {
                eprintln!("ERROR: Unable to open log file '{path}': {e}; logging to stdout");
                None
            }
        }
    });

    let (non_blocking, guard) = match file {
        Some(f) => tracing_appender::non_blocking(f),
        None => tracing_appender::non_blocking(std::io::stdout()),
    };
    let _ = TRACE_GUARD.set(guard);
    non_blocking
}

/// Install the global subscriber. Later calls are no-ops.
pub fn init_tracing(config: &LoggingConfig) {
    if TRACE_GUARD.get().is_some() {
        return;
    }

    let level = effective_level(config);
    let json = effective_json(config);
    let ansi = config.file.is_none() && !json;
    let writer = make_writer(config);

    let subscriber: Box<dyn tracing::Subscriber + Send + Sync> = if json {
        Box::new(
            tracing_subscriber::fmt()
                .with_env_filter(make_filter(&level))
                .with_ansi(false)
                .with_writer(writer)
                .json()
                .finish(),
        )
    } else {
        Box::new(
            tracing_subscriber::fmt()
                .with_env_filter(make_filter(&level))
                .with_ansi(ansi)
                .with_writer(writer)
                .compact()
                .finish(),
        )
    };

    let _ = tracing::subscriber::set_global_default(subscriber);
}
