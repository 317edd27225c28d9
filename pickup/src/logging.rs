use crate::settings::{Settings, LOG_FILE};
use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const DEFAULT_LOG_FILTER: &str = "pickup=info";
const VERBOSE_LOG_FILTER: &str = "pickup=debug";

/// Install the global subscriber.
///
/// Normal runs log to stderr. Verbose runs send detailed output to
/// `<state_dir>/pickup.log` and keep only warnings on stderr. The returned
/// guard must live until the process exits so buffered lines are flushed.
pub fn init_logging(settings: &Settings) -> Result<Option<WorkerGuard>> {
    let default_filter = if settings.verbose {
        VERBOSE_LOG_FILTER
    } else {
        DEFAULT_LOG_FILTER
    };

    let mut guard = None;
    let file_layer = if settings.verbose {
        let appender = tracing_appender::rolling::never(&settings.state_dir, LOG_FILE);
        let (file_writer, file_guard) = tracing_appender::non_blocking(appender);
        guard = Some(file_guard);
        Some(
            tracing_subscriber::fmt::layer()
                .with_writer(file_writer)
                .with_ansi(false)
                .with_filter(env_filter(default_filter)),
        )
    } else {
        None
    };

    let console_filter = if settings.verbose {
        EnvFilter::new("warn")
    } else {
        env_filter(default_filter)
    };

    tracing_subscriber::registry()
        .with(file_layer)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(console_filter),
        )
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(guard)
}

fn env_filter(default_filter: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter))
}
