// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: single-instance enforcement, startup,
//! the termination loop, and shutdown cleanup.

mod startup;

use std::path::PathBuf;

use mutagen_platform::{data_directory, ipc, DirectoryError, Locker};
use mutagen_sessions::housekeeping;
use mutagen_sessions::ManagerError;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::env::HOUSEKEEPING_INTERVAL;

/// Name of the IPC endpoint inside the daemon directory.
#[cfg(unix)]
const ENDPOINT_NAME: &str = "daemon.sock";
#[cfg(windows)]
const ENDPOINT_NAME: &str = "daemon.pipe";

/// Daemon configuration: every path the daemon owns inside the data
/// directory.
#[derive(Debug, Clone)]
pub struct Config {
    /// Data directory root (e.g. `~/.mutagen`).
    pub data_directory: PathBuf,
    /// Lock file enforcing the daemon singleton.
    pub lock_path: PathBuf,
    /// IPC endpoint (socket on POSIX, pipe-name record on Windows).
    pub endpoint_path: PathBuf,
    /// Current run's log, truncated on start.
    pub log_path: PathBuf,
    /// API token for TCP clients.
    pub token_path: PathBuf,
    /// TCP port record.
    pub port_path: PathBuf,
    /// Daemon version record.
    pub version_path: PathBuf,
    /// Tunnel records.
    pub tunnels_directory: PathBuf,
    /// Forwarding session records.
    pub forwarding_directory: PathBuf,
    /// Synchronization session records.
    pub synchronization_directory: PathBuf,
    /// Staged file roots.
    pub staging_directory: PathBuf,
    /// Cache files.
    pub caches_directory: PathBuf,
    /// Agent binaries.
    pub agents_directory: PathBuf,
}

impl Config {
    /// Resolve daemon paths without touching the filesystem.
    pub fn load() -> Result<Self, DirectoryError> {
        let data_directory = data_directory(false, &[])?;
        let daemon = data_directory.join("daemon");
        let sessions = data_directory.join("sessions");
        Ok(Self {
            lock_path: daemon.join("daemon.lock"),
            endpoint_path: daemon.join(ENDPOINT_NAME),
            log_path: daemon.join("log"),
            token_path: daemon.join("token"),
            port_path: daemon.join("port"),
            version_path: daemon.join("version"),
            tunnels_directory: data_directory.join("tunnels"),
            forwarding_directory: sessions.join("forwarding"),
            synchronization_directory: sessions.join("synchronization"),
            staging_directory: data_directory.join("staging"),
            caches_directory: data_directory.join("caches"),
            agents_directory: data_directory.join("agents"),
            data_directory,
        })
    }

    /// Create the directories the daemon owns.
    fn prepare(&self) -> Result<(), DaemonError> {
        data_directory(true, &["daemon"])?;
        Ok(())
    }
}

/// Lifecycle errors.
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("another daemon is already running")]
    AlreadyRunning,

    #[error("data directory unusable: {0}")]
    Directory(#[from] DirectoryError),

    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("manager initialization failed: {0}")]
    Manager(#[from] ManagerError),

    #[error("listener failed: {0}")]
    Listener(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Run the daemon until a termination signal, a `Daemon.Terminate` RPC,
/// or a fatal failure.
pub async fn run(config: Config) -> Result<(), DaemonError> {
    config.prepare()?;

    // The lock is the only process-wide singleton; everything else hangs
    // off this call frame.
    let mut locker = Locker::create(&config.lock_path)?;
    locker.lock(false).map_err(|_| DaemonError::AlreadyRunning)?;

    let result = run_locked(&config).await;

    if let Err(error) = locker.unlock() {
        warn!(%error, "failed to release daemon lock");
    }
    result
}

async fn run_locked(config: &Config) -> Result<(), DaemonError> {
    let _log_guard = crate::logging::initialize(&config.log_path)?;
    info!(version = %crate::version::Version::current(), "daemon starting");

    // Signal handlers are installed before any listener exists, so a
    // signal during startup still terminates cleanly.
    let mut signals = TerminationSignals::register()?;

    let shutdown = CancellationToken::new();
    let mut startup = startup::startup(config, shutdown.clone()).await?;

    let mut listener_task = tokio::spawn(startup.listener.run());
    let mut listener_finished = false;
    let housekeeper = spawn_housekeeping(config.clone(), shutdown.clone());
    info!("daemon started");

    let outcome = tokio::select! {
        reason = signals.recv() => {
            info!(reason, "received termination signal");
            Ok(())
        }
        _ = startup.termination.recv() => {
            info!("terminated via RPC");
            Ok(())
        }
        join = &mut listener_task => {
            listener_finished = true;
            let cause = match join {
                Ok(()) => "listener exited unexpectedly".to_string(),
                Err(error) => error.to_string(),
            };
            Err(DaemonError::Listener(cause))
        }
    };

    // Wind down: listeners first, then managers, then the files the
    // endpoint advertised.
    shutdown.cancel();
    if !listener_finished {
        if let Err(error) = listener_task.await {
            warn!(%error, "listener task failed");
        }
    }
    housekeeper.await.ok();

    startup.tunnels.shutdown().await;
    startup.forwarding.shutdown().await;
    startup.synchronization.shutdown().await;

    if let Err(error) = ipc::remove_stale_endpoint(&config.endpoint_path) {
        warn!(%error, "failed to remove endpoint");
    }
    for path in [&config.port_path, &config.version_path] {
        if path.exists() {
            if let Err(error) = std::fs::remove_file(path) {
                warn!(path = %path.display(), %error, "failed to remove record");
            }
        }
    }

    info!("daemon stopped");
    outcome
}

#[cfg(unix)]
struct TerminationSignals {
    interrupt: tokio::signal::unix::Signal,
    terminate: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl TerminationSignals {
    fn register() -> std::io::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};
        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
        })
    }

    async fn recv(&mut self) -> &'static str {
        tokio::select! {
            _ = self.interrupt.recv() => "interrupt",
            _ = self.terminate.recv() => "terminate",
        }
    }
}

#[cfg(not(unix))]
struct TerminationSignals;

#[cfg(not(unix))]
impl TerminationSignals {
    fn register() -> std::io::Result<Self> {
        Ok(Self)
    }

    async fn recv(&mut self) -> &'static str {
        let _ = tokio::signal::ctrl_c().await;
        "interrupt"
    }
}

fn spawn_housekeeping(config: Config, shutdown: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(HOUSEKEEPING_INTERVAL);
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = timer.tick() => {}
            }

            debug!("running housekeeping");
            let agents = config.agents_directory.clone();
            let caches = config.caches_directory.clone();
            let staging = config.staging_directory.clone();
            let sweep = tokio::task::spawn_blocking(move || {
                housekeeping::housekeep_agents(&agents);
                housekeeping::housekeep_caches(&caches);
                housekeeping::housekeep_staging(&staging);
            });
            if sweep.await.is_err() {
                warn!("housekeeping sweep failed");
            }
        }
    })
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
