// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use mutagen_core::SelectionError;
use mutagen_sessions::forwarding::ForwardingSession;
use mutagen_sessions::synchronization::SynchronizationSession;
use mutagen_sessions::tunneling::Tunnel;
use mutagen_sessions::State;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::version::Version;

/// Envelope validation failures. Fatal to the connection they occur on.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EnvelopeError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("conflicting fields: {0}")]
    ConflictingFields(&'static str),

    #[error("invalid selection: {0}")]
    Selection(#[from] SelectionError),
}

/// Response to a single request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Generic success.
    Ok,

    /// Structured failure; the connection closes after delivery.
    Error { message: String },

    /// Daemon build version.
    Version { version: Version },

    /// Prompter installed; the connection is now its message stream.
    PrompterRegistered { prompter: String },

    /// Routed prompt response.
    PromptResponse {
        #[serde(default)]
        response: String,
    },

    /// Tunnel created.
    TunnelCreated {
        tunnel: Box<Tunnel>,
        #[serde(with = "mutagen_wire::base64_bytes")]
        host_credentials: Vec<u8>,
    },

    /// Tunnel listing snapshot.
    TunnelList { state_index: u64, states: Vec<State<Tunnel>> },

    /// Forwarding session created.
    ForwardingCreated { session: Box<ForwardingSession> },

    /// Forwarding listing snapshot.
    ForwardingList { state_index: u64, states: Vec<State<ForwardingSession>> },

    /// Synchronization session created.
    SynchronizationCreated { session: Box<SynchronizationSession> },

    /// Synchronization listing snapshot.
    SynchronizationList { state_index: u64, states: Vec<State<SynchronizationSession>> },
}

impl Response {
    /// Validate the response envelope.
    pub fn ensure_valid(&self) -> Result<(), EnvelopeError> {
        match self {
            Response::Error { message } if message.is_empty() => {
                Err(EnvelopeError::MissingField("message"))
            }
            Response::PrompterRegistered { prompter } if prompter.is_empty() => {
                Err(EnvelopeError::MissingField("prompter"))
            }
            Response::TunnelCreated { host_credentials, .. } if host_credentials.is_empty() => {
                Err(EnvelopeError::MissingField("host_credentials"))
            }
            Response::TunnelList { state_index, .. }
            | Response::ForwardingList { state_index, .. }
            | Response::SynchronizationList { state_index, .. }
                if *state_index == 0 =>
            {
                Err(EnvelopeError::MissingField("state_index"))
            }
            _ => Ok(()),
        }
    }
}
