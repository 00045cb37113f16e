//! Logging/tracing bootstrap: a `tracing-subscriber` stack selected by
//! `LoggingConfig::sink`, with no metrics exporter attached.

use std::path::Path;

use anyhow::{Context, Result};
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::{LogType, LoggingConfig};

/// Installs the global `tracing` subscriber for the process. Idempotent
/// within a single `main` — call once at startup before any span is
/// entered.
pub fn init(config: &LoggingConfig) -> Result<()> {
    config.validate()?;

    let crate_name = env!("CARGO_PKG_NAME");
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{crate_name}={},warn", config.level)));

    match &config.sink {
        LogType::Stdout { color, json } => {
            if *json {
                tracing_subscriber::registry().with(filter).with(fmt::layer().json()).try_init()
            } else {
                tracing_subscriber::registry().with(filter).with(fmt::layer().compact().with_ansi(*color)).try_init()
            }
        }
        LogType::File { path, json } => {
            let writer = file_writer(path)?;
            if *json {
                tracing_subscriber::registry().with(filter).with(fmt::layer().json().with_writer(writer)).try_init()
            } else {
                tracing_subscriber::registry().with(filter).with(fmt::layer().compact().with_writer(writer)).try_init()
            }
        }
    }
    .context("failed to install tracing subscriber")
}

fn file_writer(path: &Path) -> Result<tracing_appender::non_blocking::NonBlocking> {
    let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or_else(|| Path::new("."));
    let filename = path.file_name().context("log file path has no filename component")?;

    let appender = tracing_appender::rolling::never(dir, filename);
    let (non_blocking, guard) = tracing_appender::non_blocking(appender);
    // Leaked deliberately: the guard must outlive the process for buffered
    // lines to flush, and this is only ever called once at startup.
    std::mem::forget(guard);
    Ok(non_blocking)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_logging_config_is_rejected_before_subscriber_install() {
        let cfg = LoggingConfig { level: "deafening".to_string(), ..Default::default() };
        assert!(init(&cfg).is_err());
    }
}
