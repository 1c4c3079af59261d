//! Logging setup
//!
//! Logs go to stderr with a compact timestamp so stdout only carries event
//! lines. `RUST_LOG` takes precedence over the configured level:
//!
//! ```bash
//! RUST_LOG=watcher=debug pollwatch src
//! ```

use crate::settings::LoggingConfig;
use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Local wall-clock time with milliseconds
fn timer() -> ChronoLocal {
    ChronoLocal::new("%H:%M:%S%.3f".to_string())
}

fn filter(level: &str) -> Result<EnvFilter> {
    if std::env::var("RUST_LOG").is_ok() {
        return Ok(EnvFilter::from_default_env());
    }
    EnvFilter::try_new(level).with_context(|| format!("Invalid log level '{}'", level))
}

/// Install the global subscriber
///
/// Keep the returned guard alive for as long as logs should reach the file.
pub fn init(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_timer(timer())
        .with_target(true)
        .with_filter(filter(&config.level)?);

    let Some(path) = &config.file else {
        tracing_subscriber::registry().with(stderr_layer).try_init()?;
        return Ok(None);
    };

    let directory = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| std::path::Path::new("."));
    let file_name = path
        .file_name()
        .with_context(|| format!("Invalid log file path {}", path.display()))?;
    std::fs::create_dir_all(directory)
        .with_context(|| format!("Failed to create log directory {}", directory.display()))?;

    let (writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::never(directory, file_name));
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_timer(timer())
        .with_filter(filter(&config.level)?);

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .try_init()?;
    Ok(Some(guard))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timer_prints_millisecond_clock() {
        use tracing_subscriber::fmt::format::Writer;
        use tracing_subscriber::fmt::time::FormatTime;

        let mut out = String::new();
        timer().format_time(&mut Writer::new(&mut out)).unwrap();
        assert_eq!(out.len(), "12:34:56.789".len());
        assert_eq!(out.matches(':').count(), 2);
    }

    #[test]
    fn test_filter_accepts_levels_and_directives() {
        if std::env::var("RUST_LOG").is_ok() {
            return;
        }
        assert!(filter("debug").is_ok());
        assert!(filter("warn,watcher=trace").is_ok());
        assert!(filter("watcher=loud").is_err());
    }
}
