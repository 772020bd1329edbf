// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Client for dialing the daemon: autostart, version enforcement, and
//! one-connection-per-request RPC.

use std::path::PathBuf;

use mutagen_core::Selection;
use mutagen_platform::{ipc, DirectoryError};
use mutagen_sessions::forwarding::{ForwardingCreateSpec, ForwardingSession};
use mutagen_sessions::synchronization::{SynchronizationCreateSpec, SynchronizationSession};
use mutagen_sessions::tunneling::{Tunnel, TunnelCreateSpec};
use mutagen_sessions::State;
use mutagen_wire::{read_message, write_message, ProtocolError};
use thiserror::Error;
use tokio::time::timeout;
use tracing::debug;

use crate::env::{AUTOSTART_DIAL_ATTEMPTS, AUTOSTART_DIAL_INTERVAL, DIAL_TIMEOUT};
use crate::protocol::{
    DaemonRequest, EnvelopeError, ForwardingRequest, PrompterExchange, PrompterReply,
    PromptingRequest, Request, Response, SynchronizationRequest, TunnelingRequest,
};
use crate::registration;
use crate::version::Version;

/// Client connection options.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Verify that the daemon's build version matches this client's.
    pub enforce_version_match: bool,
    /// Start the daemon when dialing fails (unless disabled by
    /// environment).
    pub autostart: bool,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self { enforce_version_match: true, autostart: true }
    }
}

/// Errors from daemon client operations.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("unable to connect to daemon (is the daemon running?)")]
    DialFailed,

    #[error("client/daemon version mismatch")]
    VersionMismatch,

    #[error("daemon reported an error: {0}")]
    Daemon(String),

    #[error("unexpected response to {0}")]
    UnexpectedResponse(&'static str),

    #[error("invalid response envelope: {0}")]
    Envelope(#[from] EnvelopeError),

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("data directory unusable: {0}")]
    Directory(#[from] DirectoryError),

    #[error("daemon start failed: {0}")]
    Start(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A handle for making daemon RPCs. Each request uses its own
/// connection to the endpoint.
pub struct DaemonClient {
    endpoint: PathBuf,
}

impl DaemonClient {
    /// Connect to the daemon, optionally autostarting it and enforcing
    /// a version match.
    pub async fn connect(options: ClientOptions) -> Result<Self, ClientError> {
        let config = crate::lifecycle::Config::load()?;
        let endpoint = config.endpoint_path;

        // Probe the endpoint, triggering autostart if necessary.
        let probe = dial(&endpoint).await;
        if probe.is_err() {
            if !options.autostart || crate::env::autostart_disabled() {
                return Err(ClientError::DialFailed);
            }
            start_daemon()?;
            redial(&endpoint).await?;
        }

        let client = Self { endpoint };
        if options.enforce_version_match {
            let daemon_version = client.version().await?;
            if !daemon_version.matches(&Version::current()) {
                return Err(ClientError::VersionMismatch);
            }
        }
        Ok(client)
    }

    /// `Daemon.Version`.
    pub async fn version(&self) -> Result<Version, ClientError> {
        match self.roundtrip(Request::Daemon(DaemonRequest::Version)).await? {
            Response::Version { version } => Ok(version),
            _ => Err(ClientError::UnexpectedResponse("version")),
        }
    }

    /// `Daemon.Terminate`. Returns before the daemon fully exits.
    pub async fn terminate(&self) -> Result<(), ClientError> {
        match self.roundtrip(Request::Daemon(DaemonRequest::Terminate)).await? {
            Response::Ok => Ok(()),
            _ => Err(ClientError::UnexpectedResponse("terminate")),
        }
    }

    /// `Tunneling.Create`.
    pub async fn create_tunnel(
        &self,
        specification: TunnelCreateSpec,
        prompter: Option<String>,
    ) -> Result<(Tunnel, Vec<u8>), ClientError> {
        let request =
            Request::Tunneling(TunnelingRequest::Create { specification, prompter });
        match self.roundtrip(request).await? {
            Response::TunnelCreated { tunnel, host_credentials } => {
                Ok((*tunnel, host_credentials))
            }
            _ => Err(ClientError::UnexpectedResponse("tunnel create")),
        }
    }

    /// `Tunneling.List`.
    pub async fn list_tunnels(
        &self,
        selection: Selection,
        previous_state_index: u64,
    ) -> Result<(u64, Vec<State<Tunnel>>), ClientError> {
        let request =
            Request::Tunneling(TunnelingRequest::List { selection, previous_state_index });
        match self.roundtrip(request).await? {
            Response::TunnelList { state_index, states } => Ok((state_index, states)),
            _ => Err(ClientError::UnexpectedResponse("tunnel list")),
        }
    }

    /// `Tunneling.Pause`.
    pub async fn pause_tunnels(
        &self,
        selection: Selection,
        prompter: Option<String>,
    ) -> Result<(), ClientError> {
        self.expect_ok(
            Request::Tunneling(TunnelingRequest::Pause { selection, prompter }),
            "tunnel pause",
        )
        .await
    }

    /// `Tunneling.Resume`.
    pub async fn resume_tunnels(
        &self,
        selection: Selection,
        prompter: Option<String>,
    ) -> Result<(), ClientError> {
        self.expect_ok(
            Request::Tunneling(TunnelingRequest::Resume { selection, prompter }),
            "tunnel resume",
        )
        .await
    }

    /// `Tunneling.Terminate`.
    pub async fn terminate_tunnels(
        &self,
        selection: Selection,
        prompter: Option<String>,
    ) -> Result<(), ClientError> {
        self.expect_ok(
            Request::Tunneling(TunnelingRequest::Terminate { selection, prompter }),
            "tunnel terminate",
        )
        .await
    }

    /// `Forwarding.Create`.
    pub async fn create_forwarding_session(
        &self,
        specification: ForwardingCreateSpec,
        prompter: Option<String>,
    ) -> Result<ForwardingSession, ClientError> {
        let request =
            Request::Forwarding(ForwardingRequest::Create { specification, prompter });
        match self.roundtrip(request).await? {
            Response::ForwardingCreated { session } => Ok(*session),
            _ => Err(ClientError::UnexpectedResponse("forwarding create")),
        }
    }

    /// `Synchronization.Create`.
    pub async fn create_synchronization_session(
        &self,
        specification: SynchronizationCreateSpec,
        prompter: Option<String>,
    ) -> Result<SynchronizationSession, ClientError> {
        let request =
            Request::Synchronization(SynchronizationRequest::Create { specification, prompter });
        match self.roundtrip(request).await? {
            Response::SynchronizationCreated { session } => Ok(*session),
            _ => Err(ClientError::UnexpectedResponse("synchronization create")),
        }
    }

    /// `Prompting.Register`: open a prompter stream serviced by
    /// `respond`, returning the opaque handle and the stream task.
    ///
    /// The task runs until the prompter is unregistered or the daemon
    /// closes the stream.
    pub async fn register_prompter<F>(
        &self,
        mut respond: F,
    ) -> Result<(String, tokio::task::JoinHandle<Result<(), ClientError>>), ClientError>
    where
        F: FnMut(PrompterExchange) -> PrompterReply + Send + 'static,
    {
        let mut stream = dial(&self.endpoint).await.map_err(|_| ClientError::DialFailed)?;
        let handle = {
            let (mut reader, mut writer) = tokio::io::split(&mut stream);
            write_message(&mut writer, &Request::Prompting(PromptingRequest::Register))
                .await?;
            match read_message::<_, Response>(&mut reader).await? {
                Response::PrompterRegistered { prompter } => prompter,
                Response::Error { message } => return Err(ClientError::Daemon(message)),
                _ => return Err(ClientError::UnexpectedResponse("prompter register")),
            }
        };

        let task = tokio::spawn(async move {
            let (mut reader, mut writer) = tokio::io::split(&mut stream);
            loop {
                let exchange: PrompterExchange = match read_message(&mut reader).await {
                    Ok(exchange) => exchange,
                    Err(ProtocolError::ConnectionClosed) => return Ok(()),
                    Err(error) => return Err(error.into()),
                };
                let reply = respond(exchange);
                write_message(&mut writer, &reply).await?;
            }
        });
        Ok((handle, task))
    }

    /// `Prompting.Unregister`.
    pub async fn unregister_prompter(&self, prompter: String) -> Result<(), ClientError> {
        self.expect_ok(
            Request::Prompting(PromptingRequest::Unregister { prompter }),
            "prompter unregister",
        )
        .await
    }

    async fn expect_ok(
        &self,
        request: Request,
        operation: &'static str,
    ) -> Result<(), ClientError> {
        match self.roundtrip(request).await? {
            Response::Ok => Ok(()),
            _ => Err(ClientError::UnexpectedResponse(operation)),
        }
    }

    async fn roundtrip(&self, request: Request) -> Result<Response, ClientError> {
        let mut stream = dial(&self.endpoint).await.map_err(|_| ClientError::DialFailed)?;
        let (mut reader, mut writer) = tokio::io::split(&mut stream);
        write_message(&mut writer, &request).await?;
        let response: Response = read_message(&mut reader).await?;
        response.ensure_valid()?;
        if let Response::Error { message } = &response {
            return Err(ClientError::Daemon(message.clone()));
        }
        Ok(response)
    }
}

async fn dial(endpoint: &std::path::Path) -> Result<ipc::IpcStream, ClientError> {
    match timeout(DIAL_TIMEOUT, ipc::dial(endpoint)).await {
        Ok(Ok(stream)) => Ok(stream),
        Ok(Err(error)) => Err(ClientError::Io(error)),
        Err(_) => Err(ClientError::DialFailed),
    }
}

/// Redial after autostart: up to [`AUTOSTART_DIAL_ATTEMPTS`] attempts
/// with [`AUTOSTART_DIAL_INTERVAL`] spacing.
async fn redial(endpoint: &std::path::Path) -> Result<(), ClientError> {
    for attempt in 0..AUTOSTART_DIAL_ATTEMPTS {
        tokio::time::sleep(AUTOSTART_DIAL_INTERVAL).await;
        if dial(endpoint).await.is_ok() {
            debug!(attempt, "daemon reachable after autostart");
            return Ok(());
        }
    }
    Err(ClientError::DialFailed)
}

/// Start the daemon: prefer the system service registration; otherwise
/// spawn this binary detached with `daemon run`.
pub fn start_daemon() -> Result<(), ClientError> {
    if registration::registered_start().unwrap_or(false) {
        return Ok(());
    }

    let executable = std::env::current_exe()?;
    let mut command = std::process::Command::new(executable);
    command
        .args(["daemon", "run"])
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null());
    detach(&mut command);
    command.spawn().map_err(|error| ClientError::Start(error.to_string()))?;
    Ok(())
}

#[cfg(unix)]
fn detach(command: &mut std::process::Command) {
    use std::os::unix::process::CommandExt;
    command.process_group(0);
}

#[cfg(windows)]
fn detach(command: &mut std::process::Command) {
    use std::os::windows::process::CommandExt;
    const DETACHED_PROCESS: u32 = 0x0000_0008;
    const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;
    command.creation_flags(DETACHED_PROCESS | CREATE_NEW_PROCESS_GROUP);
}

