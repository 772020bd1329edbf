// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Listener task for handling IPC and TCP connections.
//!
//! The listener accepts connections until shutdown, spawning a task per
//! connection. Each connection carries one request/response exchange,
//! except prompter registration, which holds its connection open as the
//! prompter's message stream. TCP connections must authenticate with the
//! daemon token before their first request.

use std::sync::Arc;

use mutagen_platform::ipc::IpcListener;
use mutagen_sessions::forwarding::ForwardingManager;
use mutagen_sessions::synchronization::SynchronizationManager;
use mutagen_sessions::tunneling::TunnelManager;
use mutagen_wire::{read_message, write_message, ProtocolError};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::protocol::{DaemonRequest, Request, Response};
use crate::services;
use crate::services::prompting::PrompterRegistry;

/// Shared daemon context for all request handlers.
pub(crate) struct ListenCtx {
    pub tunnels: Arc<TunnelManager>,
    pub forwarding: Arc<ForwardingManager>,
    pub synchronization: Arc<SynchronizationManager>,
    pub prompting: Arc<PrompterRegistry>,
    /// One-slot termination signal; extra sends are absorbed.
    pub termination: mpsc::Sender<()>,
    /// Token TCP clients must present before their first request.
    pub token: String,
}

/// Errors from connection handling.
#[derive(Debug, Error)]
pub(crate) enum ConnectionError {
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Source of a connection, for credential gating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ConnectionSource {
    /// Local IPC endpoint: gated by filesystem ACL.
    Ipc,
    /// Loopback TCP: requires the daemon token.
    Tcp,
}

/// Listener over the IPC endpoint and the loopback TCP socket.
pub(crate) struct Listener {
    ipc: IpcListener,
    tcp: TcpListener,
    ctx: Arc<ListenCtx>,
    shutdown: CancellationToken,
}

impl Listener {
    pub fn new(
        ipc: IpcListener,
        tcp: TcpListener,
        ctx: Arc<ListenCtx>,
        shutdown: CancellationToken,
    ) -> Self {
        Self { ipc, tcp, ctx, shutdown }
    }

    /// Accept connections until shutdown.
    pub async fn run(mut self) {
        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                result = self.ipc.accept() => match result {
                    Ok(stream) => self.spawn_connection(stream, ConnectionSource::Ipc),
                    Err(error) => error!(%error, "IPC accept failed"),
                },
                result = self.tcp.accept() => match result {
                    Ok((stream, peer)) => {
                        debug!(%peer, "accepted TCP connection");
                        self.spawn_connection(stream, ConnectionSource::Tcp);
                    }
                    Err(error) => error!(%error, "TCP accept failed"),
                },
            }
        }
        debug!("listener stopped");
    }

    fn spawn_connection<S>(&self, stream: S, source: ConnectionSource)
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let ctx = Arc::clone(&self.ctx);
        tokio::spawn(async move {
            let (reader, writer) = tokio::io::split(stream);
            if let Err(error) = handle_connection(reader, writer, source, &ctx).await {
                log_connection_error(error);
            }
        });
    }
}

fn log_connection_error(error: ConnectionError) {
    match error {
        ConnectionError::Protocol(ProtocolError::ConnectionClosed) => {
            debug!("client disconnected")
        }
        other => warn!(error = %other, "connection failed"),
    }
}

/// Handle a single client connection.
async fn handle_connection<R, W>(
    mut reader: R,
    mut writer: W,
    source: ConnectionSource,
    ctx: &ListenCtx,
) -> Result<(), ConnectionError>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    let mut request: Request = read_message(&mut reader).await?;

    // TCP connections authenticate before anything else.
    if source == ConnectionSource::Tcp {
        match request {
            Request::Daemon(DaemonRequest::Authenticate { ref token })
                if *token == ctx.token =>
            {
                write_message(&mut writer, &Response::Ok).await?;
                request = read_message(&mut reader).await?;
            }
            _ => {
                let response =
                    Response::Error { message: "unauthorized".to_string() };
                let _ = write_message(&mut writer, &response).await;
                return Ok(());
            }
        }
    }

    if let Err(error) = request.ensure_valid() {
        let response = Response::Error { message: error.to_string() };
        write_message(&mut writer, &response).await?;
        return Ok(());
    }
    debug!(?request, "received request");

    // Prompter registration upgrades the connection into a long-lived
    // stream.
    if matches!(request, Request::Prompting(crate::protocol::PromptingRequest::Register)) {
        return services::prompting::serve_prompter(reader, writer, ctx).await;
    }

    // Race the handler against client departure so abandoned blocking
    // calls (list waits) do not leak.
    let response = tokio::select! {
        response = dispatch(request, ctx) => response,
        _ = detect_client_disconnect(&mut reader) => {
            debug!("client disconnected, dropping handler");
            return Ok(());
        }
    };

    if let Err(error) = response.ensure_valid() {
        return Err(ConnectionError::Internal(format!("invalid response: {error}")));
    }
    write_message(&mut writer, &response).await?;
    Ok(())
}

async fn dispatch(request: Request, ctx: &ListenCtx) -> Response {
    match request {
        Request::Daemon(request) => services::daemon::handle(request, ctx).await,
        Request::Tunneling(request) => services::tunneling::handle(request, ctx).await,
        Request::Forwarding(request) => services::forwarding::handle(request, ctx).await,
        Request::Synchronization(request) => {
            services::synchronization::handle(request, ctx).await
        }
        Request::Prompting(request) => {
            services::prompting::handle_control(request, ctx).await
        }
    }
}

/// Resolve when the client half-closes or drops the connection. One-shot
/// requests send nothing after the request, so any read completion means
/// departure.
async fn detect_client_disconnect<R: AsyncRead + Unpin>(reader: &mut R) {
    let mut probe = [0u8; 1];
    let _ = reader.read(&mut probe).await;
}
