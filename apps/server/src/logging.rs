//! Tracing subscriber setup.
//!
//! `RUST_LOG` takes precedence over `logging.level`. Console output is text or
//! JSON; an optional rolling file receives the same events without ANSI colors.

use crate::config::LoggingConfig;
use anyhow::Context;
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling::{RollingFileAppender, Rotation},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry};

/// Keeps the file writer flushing until dropped.
#[must_use = "dropping the guard stops file logging"]
pub struct LoggingGuard {
    _file: Option<WorkerGuard>,
}

pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<LoggingGuard> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .with_context(|| format!("Invalid log level '{}'", config.level))?;

    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();
    if config.json {
        layers.push(tracing_subscriber::fmt::layer().json().boxed());
    } else {
        layers.push(tracing_subscriber::fmt::layer().boxed());
    }

    let mut file_guard = None;
    if config.file_enabled {
        let appender = RollingFileAppender::builder()
            .rotation(rotation(&config.file_rotation))
            .filename_prefix(&config.file_prefix)
            .filename_suffix("log")
            .build(&config.file_directory)
            .with_context(|| {
                format!("Failed to open log directory '{}'", config.file_directory)
            })?;
        let (writer, guard) = tracing_appender::non_blocking(appender);
        file_guard = Some(guard);

        let layer = tracing_subscriber::fmt::layer()
            .with_writer(writer)
            .with_ansi(false);
        if config.json {
            layers.push(layer.json().boxed());
        } else {
            layers.push(layer.boxed());
        }
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    tracing::debug!(
        service = %config.service_name,
        environment = %config.deployment_environment,
        json = config.json,
        file = config.file_enabled,
        "Logging initialized"
    );

    Ok(LoggingGuard { _file: file_guard })
}

fn rotation(value: &str) -> Rotation {
    match value {
        "hourly" => Rotation::HOURLY,
        "minutely" => Rotation::MINUTELY,
        "never" => Rotation::NEVER,
        _ => Rotation::DAILY,
    }
}
