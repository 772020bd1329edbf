// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared plumbing for the workspace specs.

use std::time::Duration;

use mutagen_daemon::{lifecycle, Config};

/// A daemon running against a scratch data directory.
///
/// Environment configuration is process-global, so tests using this
/// helper are serialized.
pub struct TestDaemon {
    _root: tempfile::TempDir,
    pub config: Config,
    pub task: tokio::task::JoinHandle<Result<(), mutagen_daemon::DaemonError>>,
}

impl TestDaemon {
    /// Start a daemon in a fresh scratch data directory and wait until
    /// its endpoint is ready.
    pub async fn start() -> Self {
        let root = tempfile::tempdir().unwrap();
        std::env::set_var("MUTAGEN_DATA_DIRECTORY", root.path());
        std::env::set_var("MUTAGEN_DAEMON_TCP_PORT", "0");

        let config = Config::load().unwrap();
        let task = tokio::spawn(lifecycle::run(config.clone()));

        tokio::time::timeout(Duration::from_secs(5), async {
            while !config.port_path.exists() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap_or_else(|_| panic!("daemon never became ready"));

        Self { _root: root, config, task }
    }

    /// Stop the daemon and assert it exits cleanly within a second.
    pub async fn stop(self) {
        let client = mutagen_daemon::DaemonClient::connect(client_options()).await.unwrap();
        client.terminate().await.unwrap();
        tokio::time::timeout(Duration::from_secs(1), self.task)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
    }
}

/// Client options for talking to a test daemon: same build, no
/// autostart.
pub fn client_options() -> mutagen_daemon::ClientOptions {
    mutagen_daemon::ClientOptions { enforce_version_match: true, autostart: false }
}
