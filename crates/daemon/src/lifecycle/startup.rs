// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon startup: managers, token, listeners, and the listen context.

use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use mutagen_platform::{ipc, write_file_atomic};
use mutagen_sessions::forwarding::ForwardingManager;
use mutagen_sessions::synchronization::SynchronizationManager;
use mutagen_sessions::tunneling::TunnelManager;
use mutagen_sessions::PassiveConnector;
use rand::rngs::OsRng;
use rand::RngCore;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::env;
use crate::listener::{ListenCtx, Listener};
use crate::services::prompting::PrompterRegistry;
use crate::version::Version;

use super::{Config, DaemonError};

/// Length of the base64url encoding of a 256-bit token.
const TOKEN_LENGTH: usize = 43;

pub(super) struct StartupResult {
    pub listener: Listener,
    pub termination: mpsc::Receiver<()>,
    pub tunnels: Arc<TunnelManager>,
    pub forwarding: Arc<ForwardingManager>,
    pub synchronization: Arc<SynchronizationManager>,
}

pub(super) async fn startup(
    config: &Config,
    shutdown: CancellationToken,
) -> Result<StartupResult, DaemonError> {
    // Managers load their records before the endpoint accepts clients,
    // so the first list call already sees persisted state.
    let tunnels = Arc::new(TunnelManager::open(
        config.tunnels_directory.clone(),
        Arc::new(PassiveConnector),
    )?);
    let forwarding = Arc::new(ForwardingManager::open(
        config.forwarding_directory.clone(),
        Arc::new(PassiveConnector),
    )?);
    let synchronization = Arc::new(SynchronizationManager::open(
        config.synchronization_directory.clone(),
        Arc::new(PassiveConnector),
    )?);

    // The lock holder is responsible for clearing any stale endpoint.
    ipc::remove_stale_endpoint(&config.endpoint_path)?;
    let ipc_listener = ipc::listen(&config.endpoint_path).await?;
    debug!(endpoint = %config.endpoint_path.display(), "listening on IPC endpoint");

    let token = load_or_generate_token(config)?;

    let port = env::tcp_port().map_err(DaemonError::Configuration)?;
    let tcp_listener = TcpListener::bind(("127.0.0.1", port)).await?;
    let bound_port = tcp_listener.local_addr()?.port();
    write_file_atomic(&config.port_path, bound_port.to_string().as_bytes(), 0o600)?;
    info!(port = bound_port, "listening on loopback TCP");

    write_file_atomic(
        &config.version_path,
        Version::current().to_string().as_bytes(),
        0o600,
    )?;

    let (termination_sender, termination_receiver) = mpsc::channel(1);
    let ctx = Arc::new(ListenCtx {
        tunnels: Arc::clone(&tunnels),
        forwarding: Arc::clone(&forwarding),
        synchronization: Arc::clone(&synchronization),
        prompting: PrompterRegistry::new(),
        termination: termination_sender,
        token,
    });

    Ok(StartupResult {
        listener: Listener::new(ipc_listener, tcp_listener, ctx, shutdown),
        termination: termination_receiver,
        tunnels,
        forwarding,
        synchronization,
    })
}

/// Load the daemon token, regenerating it when missing or malformed.
fn load_or_generate_token(config: &Config) -> Result<String, DaemonError> {
    if let Ok(existing) = std::fs::read_to_string(&config.token_path) {
        let existing = existing.trim();
        if existing.len() == TOKEN_LENGTH && URL_SAFE_NO_PAD.decode(existing).is_ok() {
            return Ok(existing.to_string());
        }
        debug!("replacing malformed daemon token");
    }

    let mut entropy = [0u8; 32];
    OsRng.fill_bytes(&mut entropy);
    let token = URL_SAFE_NO_PAD.encode(entropy);
    write_file_atomic(&config.token_path, token.as_bytes(), 0o600)?;
    Ok(token)
}
