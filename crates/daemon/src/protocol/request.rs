// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use mutagen_core::Selection;
use mutagen_sessions::forwarding::ForwardingCreateSpec;
use mutagen_sessions::synchronization::SynchronizationCreateSpec;
use mutagen_sessions::tunneling::TunnelCreateSpec;
use serde::{Deserialize, Serialize};

use super::response::EnvelopeError;

/// First frame on every connection: selects a service and method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "service", content = "request", rename_all = "snake_case")]
pub enum Request {
    Daemon(DaemonRequest),
    Prompting(PromptingRequest),
    Forwarding(ForwardingRequest),
    Synchronization(SynchronizationRequest),
    Tunneling(TunnelingRequest),
}

impl Request {
    /// Validate the request envelope.
    pub fn ensure_valid(&self) -> Result<(), EnvelopeError> {
        match self {
            Request::Daemon(request) => request.ensure_valid(),
            Request::Prompting(request) => request.ensure_valid(),
            Request::Forwarding(request) => request.ensure_valid(),
            Request::Synchronization(request) => request.ensure_valid(),
            Request::Tunneling(request) => request.ensure_valid(),
        }
    }
}

/// Daemon service methods.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum DaemonRequest {
    /// Report the daemon's build version.
    Version,
    /// Request daemon shutdown. Returns before the daemon fully exits.
    Terminate,
    /// TCP-only credential gate; must be the first request on a TCP
    /// connection.
    Authenticate { token: String },
}

impl DaemonRequest {
    fn ensure_valid(&self) -> Result<(), EnvelopeError> {
        match self {
            DaemonRequest::Authenticate { token } if token.is_empty() => {
                Err(EnvelopeError::MissingField("token"))
            }
            _ => Ok(()),
        }
    }
}

/// Prompting service methods.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum PromptingRequest {
    /// Install a prompter; the connection becomes the prompter's message
    /// stream until unregistered or closed.
    Register,
    /// Remove a prompter; pending borrowers observe unavailability.
    Unregister { prompter: String },
    /// Route a modal prompt through a registered prompter.
    Prompt { prompter: String, prompt: String },
    /// Route a one-line status message through a registered prompter.
    Message { prompter: String, message: String },
}

impl PromptingRequest {
    fn ensure_valid(&self) -> Result<(), EnvelopeError> {
        match self {
            PromptingRequest::Register => Ok(()),
            PromptingRequest::Unregister { prompter }
            | PromptingRequest::Prompt { prompter, .. }
            | PromptingRequest::Message { prompter, .. } => {
                if prompter.is_empty() {
                    return Err(EnvelopeError::MissingField("prompter"));
                }
                Ok(())
            }
        }
    }
}

/// Tunneling service methods. Forwarding and Synchronization mirror this
/// shape for their session records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum TunnelingRequest {
    Create {
        specification: TunnelCreateSpec,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        prompter: Option<String>,
    },
    List {
        selection: Selection,
        #[serde(default)]
        previous_state_index: u64,
    },
    Pause {
        selection: Selection,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        prompter: Option<String>,
    },
    Resume {
        selection: Selection,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        prompter: Option<String>,
    },
    Terminate {
        selection: Selection,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        prompter: Option<String>,
    },
}

impl TunnelingRequest {
    fn ensure_valid(&self) -> Result<(), EnvelopeError> {
        match self {
            TunnelingRequest::Create { prompter, .. } => ensure_prompter_valid(prompter),
            TunnelingRequest::List { selection, .. } => Ok(selection.ensure_valid()?),
            TunnelingRequest::Pause { selection, prompter }
            | TunnelingRequest::Resume { selection, prompter }
            | TunnelingRequest::Terminate { selection, prompter } => {
                selection.ensure_valid()?;
                ensure_prompter_valid(prompter)
            }
        }
    }
}

/// Forwarding service methods.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum ForwardingRequest {
    Create {
        specification: ForwardingCreateSpec,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        prompter: Option<String>,
    },
    List {
        selection: Selection,
        #[serde(default)]
        previous_state_index: u64,
    },
    Pause {
        selection: Selection,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        prompter: Option<String>,
    },
    Resume {
        selection: Selection,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        prompter: Option<String>,
    },
    Terminate {
        selection: Selection,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        prompter: Option<String>,
    },
}

impl ForwardingRequest {
    fn ensure_valid(&self) -> Result<(), EnvelopeError> {
        match self {
            ForwardingRequest::Create { prompter, .. } => ensure_prompter_valid(prompter),
            ForwardingRequest::List { selection, .. } => Ok(selection.ensure_valid()?),
            ForwardingRequest::Pause { selection, prompter }
            | ForwardingRequest::Resume { selection, prompter }
            | ForwardingRequest::Terminate { selection, prompter } => {
                selection.ensure_valid()?;
                ensure_prompter_valid(prompter)
            }
        }
    }
}

/// Synchronization service methods.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum SynchronizationRequest {
    Create {
        specification: SynchronizationCreateSpec,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        prompter: Option<String>,
    },
    List {
        selection: Selection,
        #[serde(default)]
        previous_state_index: u64,
    },
    Pause {
        selection: Selection,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        prompter: Option<String>,
    },
    Resume {
        selection: Selection,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        prompter: Option<String>,
    },
    Terminate {
        selection: Selection,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        prompter: Option<String>,
    },
    /// Drive one explicit staging cycle for the selected sessions.
    Flush {
        selection: Selection,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        prompter: Option<String>,
    },
}

impl SynchronizationRequest {
    fn ensure_valid(&self) -> Result<(), EnvelopeError> {
        match self {
            SynchronizationRequest::Create { prompter, .. } => ensure_prompter_valid(prompter),
            SynchronizationRequest::List { selection, .. } => Ok(selection.ensure_valid()?),
            SynchronizationRequest::Pause { selection, prompter }
            | SynchronizationRequest::Resume { selection, prompter }
            | SynchronizationRequest::Terminate { selection, prompter }
            | SynchronizationRequest::Flush { selection, prompter } => {
                selection.ensure_valid()?;
                ensure_prompter_valid(prompter)
            }
        }
    }
}

fn ensure_prompter_valid(prompter: &Option<String>) -> Result<(), EnvelopeError> {
    match prompter {
        Some(handle) if handle.is_empty() => Err(EnvelopeError::MissingField("prompter")),
        _ => Ok(()),
    }
}

/// Server-to-client message on a registered prompter stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PrompterExchange {
    /// One-line status message; expects an empty acknowledgement.
    Emit { message: String },
    /// Modal prompt; expects a response (possibly empty, for masked
    /// input).
    Ask { prompt: String },
}

/// Client-to-server reply on a prompter stream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PrompterReply {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
}

impl PrompterReply {
    /// Validate the reply against the exchange it answers: message
    /// acknowledgements must be empty, prompt replies must carry a
    /// response.
    pub fn ensure_valid(&self, answers_prompt: bool) -> Result<(), EnvelopeError> {
        match (answers_prompt, &self.response) {
            (true, None) => Err(EnvelopeError::MissingField("response")),
            (false, Some(_)) => Err(EnvelopeError::ConflictingFields("response")),
            _ => Ok(()),
        }
    }
}
