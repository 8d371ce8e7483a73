//! Log routing.
//!
//! ```text
//! logs/cron.<YYYY-MM-DD>.log   scheduler stream, one file per day
//! logs/delivery.log            target `devmemory::delivery` only, never rotated
//! stderr                       compact, for interactive use
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use devmemory_channels::DELIVERY_TARGET;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::filter::{LevelFilter, filter_fn};
use tracing_subscriber::{EnvFilter, Layer, fmt, prelude::*};

/// Install the global subscriber. Keep the guards alive until exit so
/// buffered lines are flushed.
pub fn init(logs_dir: &Path, verbose: bool) -> Result<Vec<WorkerGuard>> {
    std::fs::create_dir_all(logs_dir)
        .with_context(|| format!("cannot create log directory {}", logs_dir.display()))?;

    let cron_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("cron")
        .filename_suffix("log")
        .build(logs_dir)
        .context("cannot open scheduler log")?;
    let (cron_writer, cron_guard) = tracing_appender::non_blocking(cron_appender);

    let delivery_appender = tracing_appender::rolling::never(logs_dir, "delivery.log");
    let (delivery_writer, delivery_guard) = tracing_appender::non_blocking(delivery_appender);

    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let stderr_level = if verbose { LevelFilter::DEBUG } else { LevelFilter::INFO };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(cron_writer)
                .with_ansi(false)
                .with_filter(filter_fn(|meta| meta.target() != DELIVERY_TARGET)),
        )
        .with(
            fmt::layer()
                .with_writer(delivery_writer)
                .with_ansi(false)
                .with_target(false)
                .with_filter(filter_fn(|meta| meta.target() == DELIVERY_TARGET)),
        )
        .with(
            fmt::layer()
                .compact()
                .with_target(false)
                .with_writer(std::io::stderr)
                .with_filter(stderr_level),
        )
        .try_init()
        .context("logging already initialized")?;

    Ok(vec![cron_guard, delivery_guard])
}
