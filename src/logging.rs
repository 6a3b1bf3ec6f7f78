use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingSection;

/// Installs the global subscriber writing to stderr through a non-blocking
/// writer. `RUST_LOG` wins over the configured level; `debug` wins over both.
/// Keep the returned guard alive until exit or buffered lines are lost.
pub fn init_logging(logging: &LoggingSection, debug: bool) -> Result<WorkerGuard> {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        match EnvFilter::try_from_default_env() {
            Ok(filter) => filter,
            Err(_) => EnvFilter::try_new(&logging.level)
                .with_context(|| format!("invalid log level `{}`", logging.level))?,
        }
    };

    let (writer, guard) = tracing_appender::non_blocking(std::io::stderr());
    let registry = tracing_subscriber::registry().with(filter);
    let installed = if logging.json {
        registry
            .with(fmt::layer().json().with_writer(writer))
            .try_init()
    } else {
        registry
            .with(fmt::layer().with_target(false).with_writer(writer))
            .try_init()
    };
    installed.context("installing the tracing subscriber")?;
    Ok(guard)
}
