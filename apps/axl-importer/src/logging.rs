//! Tracing subscriber setup.
//!
//! Console output is plain text or flattened JSON. When a log file is
//! configured a second layer writes to a daily rolling file through a
//! non-blocking writer; the returned [`LogGuard`] must live until exit so
//! buffered lines are flushed.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::LogSection;

type BoxedLayer = Box<dyn Layer<tracing_subscriber::Registry> + Send + Sync>;

const DEFAULT_LOG_FILE: &str = "axl-importer.log";

/// Keeps the file writer alive.
pub struct LogGuard {
    _file: Option<WorkerGuard>,
}

/// Initialize logging. `RUST_LOG` takes precedence over the configured level.
pub fn init_logging(config: &LogSection) -> LogGuard {
    let directive = config.filter_directive();
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(directive))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let mut layers: Vec<BoxedLayer> = Vec::new();
    if !config.quiet || config.file.is_none() {
        layers.push(console_layer(config.json));
    }

    let mut guard = None;
    if let Some(path) = &config.file {
        let (layer, file_guard) = file_layer(path, config.json);
        layers.push(layer);
        guard = Some(file_guard);
    }

    if let Err(e) = tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
    {
        eprintln!("Failed to initialize logging: {e}");
    }

    tracing::info!(level = directive, json = config.json, "Logging initialized");
    LogGuard { _file: guard }
}

fn console_layer(json: bool) -> BoxedLayer {
    if json {
        Box::new(
            fmt::layer()
                .json()
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .flatten_event(true),
        )
    } else {
        Box::new(fmt::layer().with_target(false))
    }
}

fn file_layer(path: &Path, json: bool) -> (BoxedLayer, WorkerGuard) {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let prefix = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(DEFAULT_LOG_FILE);

    let appender = tracing_appender::rolling::daily(dir, prefix);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let layer: BoxedLayer = if json {
        Box::new(
            fmt::layer()
                .json()
                .with_writer(writer)
                .with_target(true)
                .flatten_event(true),
        )
    } else {
        Box::new(fmt::layer().with_writer(writer).with_ansi(false))
    };
    (layer, guard)
}

/// Initialize logging for tests.
#[cfg(test)]
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("debug")
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_test_logging_does_not_panic() {
        init_test_logging();
        init_test_logging();
    }

    #[test]
    fn test_init_logging_after_subscriber_set_reports_instead_of_panicking() {
        init_test_logging();
        let _guard = init_logging(&LogSection::default());
    }
}
