// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle and handshake specs.

use std::time::Duration;

use mutagen_daemon::protocol::{DaemonRequest, Request, Response};
use mutagen_daemon::{lifecycle, ClientError, DaemonClient, Version};
use mutagen_wire::{read_message, write_message};
use serial_test::serial;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use super::prelude::{client_options, TestDaemon};

#[tokio::test]
#[serial]
async fn daemon_lifecycle_round_trip() {
    let daemon = TestDaemon::start().await;
    let config = daemon.config.clone();

    // Endpoint artifacts exist while running.
    for path in
        [&config.lock_path, &config.endpoint_path, &config.token_path, &config.port_path]
    {
        assert!(path.exists(), "{path:?} missing");
    }

    // The daemon reports this build's version.
    let client = DaemonClient::connect(client_options()).await.unwrap();
    assert_eq!(client.version().await.unwrap(), Version::current());

    daemon.stop().await;
    assert!(!config.port_path.exists());
}

#[tokio::test]
#[serial]
async fn single_instance_enforcement() {
    let daemon = TestDaemon::start().await;
    let config = daemon.config.clone();

    let second = tokio::time::timeout(
        Duration::from_secs(1),
        lifecycle::run(config.clone()),
    )
    .await
    .unwrap();
    assert!(matches!(second, Err(mutagen_daemon::DaemonError::AlreadyRunning)));

    // The loser must not have disturbed the winner's endpoint.
    assert!(config.endpoint_path.exists());
    let client = DaemonClient::connect(client_options()).await.unwrap();
    client.version().await.unwrap();

    daemon.stop().await;
}

#[tokio::test]
#[serial]
async fn version_mismatch_is_rejected() {
    // A fake daemon endpoint reporting a different build.
    let root = tempfile::tempdir().unwrap();
    std::env::set_var("MUTAGEN_DATA_DIRECTORY", root.path());
    std::fs::create_dir_all(root.path().join("daemon")).unwrap();

    let config = mutagen_daemon::Config::load().unwrap();
    let mut listener = mutagen_platform::ipc::listen(&config.endpoint_path).await.unwrap();
    let fake = tokio::spawn(async move {
        loop {
            let Ok(stream) = listener.accept().await else { return };
            tokio::spawn(async move {
                let (mut reader, mut writer) = tokio::io::split(stream);
                let Ok(Request::Daemon(DaemonRequest::Version)) =
                    read_message::<_, Request>(&mut reader).await
                else {
                    return;
                };
                let response = Response::Version {
                    version: Version { major: 1, minor: 2, patch: 3, tag: "alpha".into() },
                };
                let _ = write_message(&mut writer, &response).await;
            });
        }
    });

    let result = DaemonClient::connect(client_options()).await;
    assert!(matches!(result, Err(ClientError::VersionMismatch)));
    fake.abort();
}

#[tokio::test]
#[serial]
async fn tcp_connections_require_the_token() {
    let daemon = TestDaemon::start().await;
    let config = daemon.config.clone();

    let port: u16 =
        std::fs::read_to_string(&config.port_path).unwrap().trim().parse().unwrap();
    let token = std::fs::read_to_string(&config.token_path).unwrap().trim().to_string();

    // Wrong token: rejected.
    {
        let mut stream = tokio::net::TcpStream::connect(("127.0.0.1", port)).await.unwrap();
        let request =
            Request::Daemon(DaemonRequest::Authenticate { token: "wrong".to_string() });
        write_message(&mut stream, &request).await.unwrap();
        let response: Response = read_message(&mut stream).await.unwrap();
        assert!(matches!(response, Response::Error { .. }));
    }

    // Correct token: authenticated, then serviced.
    {
        let mut stream = tokio::net::TcpStream::connect(("127.0.0.1", port)).await.unwrap();
        let request = Request::Daemon(DaemonRequest::Authenticate { token });
        write_message(&mut stream, &request).await.unwrap();
        let response: Response = read_message(&mut stream).await.unwrap();
        assert!(matches!(response, Response::Ok));

        write_message(&mut stream, &Request::Daemon(DaemonRequest::Version)).await.unwrap();
        let response: Response = read_message(&mut stream).await.unwrap();
        match response {
            Response::Version { version } => assert_eq!(version, Version::current()),
            other => panic!("unexpected response: {other:?}"),
        }
    }

    daemon.stop().await;
}

#[tokio::test]
#[serial]
async fn requests_before_tcp_auth_are_refused() {
    let daemon = TestDaemon::start().await;
    let config = daemon.config.clone();

    let port: u16 =
        std::fs::read_to_string(&config.port_path).unwrap().trim().parse().unwrap();

    let mut stream = tokio::net::TcpStream::connect(("127.0.0.1", port)).await.unwrap();
    write_message(&mut stream, &Request::Daemon(DaemonRequest::Version)).await.unwrap();
    let response: Response = read_message(&mut stream).await.unwrap();
    assert!(matches!(response, Response::Error { .. }));

    // The connection is closed after the refusal.
    let mut probe = [0u8; 1];
    let read = stream.read(&mut probe).await.unwrap();
    assert_eq!(read, 0);
    stream.shutdown().await.ok();

    daemon.stop().await;
}
