//! Logging setup and the tracing-backed event sink

mod rotate;

pub use rotate::{resolve_log_file, RotatingFileWriter, DEFAULT_LOG_FILE_NAME};

use crate::config::Config;
use crate::executor::{EventSink, SyncEvent};
use crate::types::MirrorError;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::{debug, error, info};
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// `2024-05-01 12:00:00,123`
pub const LOG_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S,%3f";

/// Install the global subscriber: stdout plus the rotating log file.
///
/// `RUST_LOG` wins over the verbosity flag. Returns the resolved log file.
/// Can only succeed once per process.
pub fn init(config: &Config) -> Result<PathBuf, MirrorError> {
    let log_file = config.log_file();
    let writer = RotatingFileWriter::open(&log_file, config.log_max_bytes, config.log_backups)
        .map_err(|e| {
            MirrorError::Config(format!("cannot open log file {}: {}", log_file.display(), e))
        })?;

    let timer = ChronoLocal::new(LOG_TIME_FORMAT.to_string());

    let stdout_layer = fmt::layer()
        .with_timer(timer.clone())
        .with_target(false);

    let file_layer = fmt::layer()
        .with_timer(timer)
        .with_target(false)
        .with_ansi(false)
        .with_writer(Mutex::new(writer));

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(config.verbose)));

    tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| MirrorError::Config(format!("logging already initialized: {e}")))?;

    Ok(log_file)
}

fn default_filter(verbose: bool) -> &'static str {
    if verbose {
        "debug,ignore=warn"
    } else {
        "info"
    }
}

/// Production sink: one log line per event.
///
/// Failures go out at ERROR, replica mutations at INFO, pruned directories
/// at DEBUG.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn record(&self, event: &SyncEvent<'_>) {
        match event {
            SyncEvent::Failed { .. } => error!("{event}"),
            SyncEvent::DirectoryPruned { .. } => debug!("{event}"),
            _ => info!("{event}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_default_filter_follows_verbosity() {
        assert_eq!(default_filter(false), "info");
        assert_eq!(default_filter(true), "debug,ignore=warn");
        for directive in default_filter(true).split(',') {
            assert!(directive.parse::<tracing_subscriber::filter::Directive>().is_ok());
        }
    }

    #[test]
    fn test_tracing_sink_accepts_every_event() {
        let path = Path::new("/replica/a.txt");
        let error = MirrorError::Pool("closed".to_string());

        let sink = TracingSink;
        sink.record(&SyncEvent::Created { src: path, dst: path, bytes: 1 });
        sink.record(&SyncEvent::Removed { path });
        sink.record(&SyncEvent::DirectoryPruned { path });
        sink.record(&SyncEvent::Failed { error: &error });
    }
}
