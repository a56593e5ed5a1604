// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Subscriber setup shared by `mxd` and `mx-printer`.
//!
//! Stdout is reserved for the `READY` line and printer output, so logs go to
//! stderr unless a log file is given.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;

use crate::lifecycle::LifecycleError;

/// Install the global subscriber, filtered by `RUST_LOG` (default `info`)
///
/// The returned guard must be held for the process lifetime when logging to
/// a file; dropping it flushes and stops the background writer.
pub fn setup_logging(log_file: Option<&Path>) -> Result<Option<WorkerGuard>, LifecycleError> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let Some(path) = log_file else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
        return Ok(None);
    };

    let file_name = path
        .file_name()
        .ok_or_else(|| LifecycleError::InvalidLogPath(path.to_path_buf()))?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let file_appender = tracing_appender::rolling::never(dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    Ok(Some(guard))
}
