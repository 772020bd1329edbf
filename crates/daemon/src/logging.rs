// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon logging: tee formatted events to the daemon log file and to
//! stderr.

use std::path::Path;

use mutagen_stream::LineWriter;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Install the daemon's tracing subscriber. The log file is truncated
/// for the new run. Returns the appender guard, which must live as long
/// as the daemon so buffered events flush on shutdown.
///
/// A subscriber may already be installed (tests running several daemons
/// in one process); in that case the existing one is kept.
pub fn initialize(log_path: &Path) -> std::io::Result<WorkerGuard> {
    let log_file = std::fs::File::create(log_path)?;
    set_owner_only(&log_file)?;
    let (log_writer, guard) = tracing_appender::non_blocking(log_file);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(log_writer).with_ansi(false))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();

    Ok(guard)
}

#[cfg(unix)]
fn set_owner_only(file: &std::fs::File) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(std::fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn set_owner_only(_file: &std::fs::File) -> std::io::Result<()> {
    Ok(())
}

/// Adapt a byte stream into log events, one line at a time.
///
/// Transport plugins hand this to subprocesses whose stdout/stderr
/// should land in the daemon log under a stable source label.
pub fn line_writer(source: &'static str) -> LineWriter<impl FnMut(&str)> {
    LineWriter::new(move |line| tracing::info!(source, "{line}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn line_writer_accepts_subprocess_output() {
        let mut writer = line_writer("agent");
        writer.write_all(b"connected to remote\npartial").unwrap();
        writer.flush().unwrap();
    }

    #[test]
    fn initialize_truncates_the_log_file() {
        let directory = tempfile::tempdir().unwrap();
        let path = directory.path().join("log");
        std::fs::write(&path, b"previous run").unwrap();

        let _guard = initialize(&path).unwrap();
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 0);
    }
}
