// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tunnel lifecycle specs over the RPC surface, including cross-request
//! prompter routing.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use mutagen_core::Selection;
use mutagen_daemon::protocol::{PrompterExchange, PrompterReply};
use mutagen_daemon::DaemonClient;
use mutagen_sessions::tunneling::TunnelCreateSpec;
use mutagen_sessions::Status;
use parking_lot::Mutex;
use serial_test::serial;

use super::prelude::{client_options, TestDaemon};

fn tunnel_spec(name: &str) -> TunnelCreateSpec {
    let mut labels = HashMap::new();
    labels.insert("env".to_string(), "dev".to_string());
    TunnelCreateSpec { name: Some(name.to_string()), labels, ..Default::default() }
}

fn by_name(name: &str) -> Selection {
    Selection::Specifications { specifications: vec![name.to_string()] }
}

async fn await_status(client: &DaemonClient, name: &str, status: Status) {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let (_, states) = client.list_tunnels(by_name(name), 0).await.unwrap();
            if states.iter().any(|state| state.status == status) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("tunnel {name} never reached {status}"));
}

#[tokio::test]
#[serial]
async fn tunnel_create_pause_resume_terminate() {
    let daemon = TestDaemon::start().await;
    let client = DaemonClient::connect(client_options()).await.unwrap();

    // Register a prompter on its own connection; actions reference it by
    // handle.
    let messages: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&messages);
    let (handle, stream_task) = client
        .register_prompter(move |exchange| match exchange {
            PrompterExchange::Emit { message } => {
                sink.lock().push(message);
                PrompterReply { response: None }
            }
            PrompterExchange::Ask { .. } => PrompterReply { response: Some(String::new()) },
        })
        .await
        .unwrap();

    // Create.
    let (tunnel, credentials) =
        client.create_tunnel(tunnel_spec("t1"), Some(handle.clone())).await.unwrap();
    assert!(!credentials.is_empty());
    assert_eq!(tunnel.name.as_deref(), Some("t1"));
    assert_eq!(tunnel.labels.get("env").map(String::as_str), Some("dev"));

    let (_, states) = client.list_tunnels(Selection::All, 0).await.unwrap();
    assert_eq!(states.len(), 1);
    assert_eq!(states[0].object.name.as_deref(), Some("t1"));
    await_status(&client, "t1", Status::Connected).await;

    // Pause.
    client.pause_tunnels(by_name("t1"), Some(handle.clone())).await.unwrap();
    let (_, states) = client.list_tunnels(by_name("t1"), 0).await.unwrap();
    assert!(states[0].object.paused);
    assert_eq!(states[0].status, Status::Paused);

    // Resume.
    client.resume_tunnels(by_name("t1"), Some(handle.clone())).await.unwrap();
    let (_, states) = client.list_tunnels(by_name("t1"), 0).await.unwrap();
    assert!(!states[0].object.paused);
    await_status(&client, "t1", Status::Connected).await;

    // Terminate removes the record.
    client.terminate_tunnels(by_name("t1"), Some(handle.clone())).await.unwrap();
    let (_, states) = client.list_tunnels(Selection::All, 0).await.unwrap();
    assert!(states.is_empty());
    let (_, states) = client.list_tunnels(by_name("t1"), 0).await.unwrap();
    assert!(states.is_empty());

    // The prompter carried the operations' status messages.
    assert!(!messages.lock().is_empty());

    client.unregister_prompter(handle).await.unwrap();
    tokio::time::timeout(Duration::from_secs(1), stream_task)
        .await
        .unwrap()
        .unwrap()
        .unwrap();

    daemon.stop().await;
}

#[tokio::test]
#[serial]
async fn actions_without_matches_report_errors() {
    let daemon = TestDaemon::start().await;
    let client = DaemonClient::connect(client_options()).await.unwrap();

    let result = client.pause_tunnels(by_name("ghost"), None).await;
    match result {
        Err(mutagen_daemon::ClientError::Daemon(message)) => {
            assert!(message.contains("no matching objects"), "{message}");
        }
        other => panic!("expected a daemon error, got {other:?}"),
    }

    // List with the same selection is not an error; it is just empty.
    let (_, states) = client.list_tunnels(by_name("ghost"), 0).await.unwrap();
    assert!(states.is_empty());

    daemon.stop().await;
}

#[tokio::test]
#[serial]
async fn tunnels_survive_daemon_restart() {
    // Two daemon runs over one data directory, so the scratch root must
    // outlive both.
    let root = tempfile::tempdir().unwrap();
    std::env::set_var("MUTAGEN_DATA_DIRECTORY", root.path());
    std::env::set_var("MUTAGEN_DAEMON_TCP_PORT", "0");
    let config = mutagen_daemon::Config::load().unwrap();

    let await_ready = |config: mutagen_daemon::Config| async move {
        tokio::time::timeout(Duration::from_secs(5), async {
            while !config.port_path.exists() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap_or_else(|_| panic!("daemon never became ready"));
    };

    let task = tokio::spawn(mutagen_daemon::lifecycle::run(config.clone()));
    await_ready(config.clone()).await;

    let client = DaemonClient::connect(client_options()).await.unwrap();
    let (tunnel, _) = client.create_tunnel(tunnel_spec("durable"), None).await.unwrap();
    client.terminate().await.unwrap();
    tokio::time::timeout(Duration::from_secs(1), task).await.unwrap().unwrap().unwrap();

    // Restart over the same data directory.
    let task = tokio::spawn(mutagen_daemon::lifecycle::run(config.clone()));
    await_ready(config.clone()).await;

    let client = DaemonClient::connect(client_options()).await.unwrap();
    let (_, states) = client.list_tunnels(Selection::All, 0).await.unwrap();
    assert_eq!(states.len(), 1);
    assert_eq!(states[0].object.identifier, tunnel.identifier);

    client.terminate().await.unwrap();
    tokio::time::timeout(Duration::from_secs(1), task).await.unwrap().unwrap().unwrap();
}
