// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Tracing setup.
//!
//! The filter comes from `GRIDLINE_LOG` (same syntax as `RUST_LOG`) and
//! defaults to `warn`. Batch commands log to stderr. The terminal UI owns the
//! screen, so it logs to a daily rolling file under the data directory instead.

use anyhow::{Context, Result, anyhow};
use std::fs;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::APP_NAME;

const LOG_ENV: &str = "GRIDLINE_LOG";
const DEFAULT_FILTER: &str = "warn";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTarget {
    Stderr,
    File,
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// `GRIDLINE_LOG=off` turns the log file off entirely, so the data directory
/// is never touched.
fn file_logging_disabled(filter: Option<&str>) -> bool {
    filter.is_some_and(|value| value.trim().eq_ignore_ascii_case("off"))
}

pub fn logs_dir() -> Result<PathBuf> {
    let data_root = dirs::data_dir()
        .ok_or_else(|| anyhow!("cannot resolve data directory; set {LOG_ENV}=off to skip logs"))?;
    Ok(data_root.join(APP_NAME).join("logs"))
}

/// Installs the global subscriber. Keep the returned guard alive until exit so
/// buffered file output is flushed.
pub fn init(target: LogTarget) -> Result<Option<WorkerGuard>> {
    match target {
        LogTarget::Stderr => {
            tracing_subscriber::registry()
                .with(
                    fmt::layer()
                        .with_writer(std::io::stderr)
                        .with_target(true)
                        .with_filter(env_filter()),
                )
                .try_init()
                .context("install stderr logger")?;
            Ok(None)
        }
        LogTarget::File => {
            if file_logging_disabled(std::env::var(LOG_ENV).ok().as_deref()) {
                return Ok(None);
            }
            let dir = logs_dir()?;
            fs::create_dir_all(&dir)
                .with_context(|| format!("create log directory {}", dir.display()))?;
            let appender = tracing_appender::rolling::daily(&dir, "gridline.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(
                    fmt::layer()
                        .with_writer(writer)
                        .with_ansi(false)
                        .with_target(true)
                        .with_line_number(true)
                        .with_filter(env_filter()),
                )
                .try_init()
                .context("install file logger")?;
            Ok(Some(guard))
        }
    }
}
