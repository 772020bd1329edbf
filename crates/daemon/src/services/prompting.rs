// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Prompter registration and cross-request prompt routing.
//!
//! Each registered prompter is backed by a one-slot job channel: a
//! routed prompt borrows the channel slot, rides the registration
//! connection to the client, and returns the response through a oneshot.
//! Concurrent prompts for the same handle queue on the slot, so at most
//! one exchange is in flight per prompter. Unregistering drops the
//! channel, and pending borrowers observe unavailability.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use mutagen_core::{new_identifier, IdentifierError, PREFIX_PROMPTER};
use mutagen_sessions::{Prompter, PromptingError};
use mutagen_wire::{read_message, write_message};
use parking_lot::Mutex;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use crate::listener::{ConnectionError, ListenCtx};
use crate::protocol::{PrompterExchange, PrompterReply, Response};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PromptKind {
    Message,
    Prompt,
}

pub(crate) struct PromptJob {
    kind: PromptKind,
    text: String,
    reply: oneshot::Sender<Result<String, PromptingError>>,
}

/// Registry of live prompters, keyed by opaque handle.
#[derive(Default)]
pub(crate) struct PrompterRegistry {
    entries: Mutex<HashMap<String, mpsc::Sender<PromptJob>>>,
}

impl PrompterRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Install a prompter, returning its handle and the job stream the
    /// registration connection must service.
    pub fn register(&self) -> Result<(String, mpsc::Receiver<PromptJob>), IdentifierError> {
        let handle = new_identifier(PREFIX_PROMPTER)?;
        let (sender, receiver) = mpsc::channel(1);
        self.entries.lock().insert(handle.clone(), sender);
        Ok((handle, receiver))
    }

    /// Remove a prompter. Pending and future borrowers observe
    /// unavailability.
    pub fn unregister(&self, handle: &str) -> bool {
        self.entries.lock().remove(handle).is_some()
    }

    pub async fn message(&self, handle: &str, text: &str) -> Result<(), PromptingError> {
        self.submit(handle, PromptKind::Message, text).await.map(|_| ())
    }

    pub async fn prompt(&self, handle: &str, text: &str) -> Result<String, PromptingError> {
        self.submit(handle, PromptKind::Prompt, text).await
    }

    async fn submit(
        &self,
        handle: &str,
        kind: PromptKind,
        text: &str,
    ) -> Result<String, PromptingError> {
        let sender = self
            .entries
            .lock()
            .get(handle)
            .cloned()
            .ok_or(PromptingError::Unavailable)?;

        let (reply_sender, reply_receiver) = oneshot::channel();
        let job = PromptJob { kind, text: text.to_string(), reply: reply_sender };
        sender.send(job).await.map_err(|_| PromptingError::Unavailable)?;
        reply_receiver.await.map_err(|_| PromptingError::Unavailable)?
    }
}

/// Prompter routing through the registry by handle. Without a handle,
/// messages are dropped and prompts fail.
pub(crate) struct RegistryPrompter {
    registry: Arc<PrompterRegistry>,
    handle: Option<String>,
}

impl RegistryPrompter {
    pub fn new(registry: Arc<PrompterRegistry>, handle: Option<String>) -> Self {
        Self { registry, handle }
    }
}

#[async_trait]
impl Prompter for RegistryPrompter {
    async fn message(&self, message: &str) -> Result<(), PromptingError> {
        match &self.handle {
            Some(handle) => self.registry.message(handle, message).await,
            None => Ok(()),
        }
    }

    async fn prompt(&self, prompt: &str) -> Result<String, PromptingError> {
        match &self.handle {
            Some(handle) => self.registry.prompt(handle, prompt).await,
            None => Err(PromptingError::Unavailable),
        }
    }
}

/// Handle the prompting service's one-shot methods. Registration never
/// reaches here; the listener upgrades it into a stream first.
pub(crate) async fn handle_control(
    request: crate::protocol::PromptingRequest,
    ctx: &ListenCtx,
) -> Response {
    use crate::protocol::PromptingRequest;

    match request {
        PromptingRequest::Register => {
            Response::Error { message: "registration requires a dedicated connection".to_string() }
        }
        PromptingRequest::Unregister { prompter } => {
            if ctx.prompting.unregister(&prompter) {
                Response::Ok
            } else {
                Response::Error { message: format!("unknown prompter: {prompter}") }
            }
        }
        PromptingRequest::Prompt { prompter, prompt } => {
            match ctx.prompting.prompt(&prompter, &prompt).await {
                Ok(response) => Response::PromptResponse { response },
                Err(error) => Response::Error { message: error.to_string() },
            }
        }
        PromptingRequest::Message { prompter, message } => {
            match ctx.prompting.message(&prompter, &message).await {
                Ok(()) => Response::Ok,
                Err(error) => Response::Error { message: error.to_string() },
            }
        }
    }
}

/// Serve a prompter registration connection: announce the handle, then
/// relay jobs to the client until unregistration or disconnect.
pub(crate) async fn serve_prompter<R, W>(
    mut reader: R,
    mut writer: W,
    ctx: &ListenCtx,
) -> Result<(), ConnectionError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let (handle, mut jobs) = ctx
        .prompting
        .register()
        .map_err(|error| ConnectionError::Internal(error.to_string()))?;
    debug!(handle, "registered prompter");

    write_message(&mut writer, &Response::PrompterRegistered { prompter: handle.clone() })
        .await?;

    let result = relay_jobs(&mut reader, &mut writer, &mut jobs).await;
    ctx.prompting.unregister(&handle);
    debug!(handle, "unregistered prompter");
    result
}

async fn relay_jobs<R, W>(
    reader: &mut R,
    writer: &mut W,
    jobs: &mut mpsc::Receiver<PromptJob>,
) -> Result<(), ConnectionError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    loop {
        // Race the next job against client departure. Clients only write
        // in response to an exchange, so a resolved read here is either
        // a disconnect or a protocol violation.
        let job = tokio::select! {
            job = jobs.recv() => match job {
                Some(job) => job,
                // Unregistered: close the stream cleanly.
                None => return Ok(()),
            },
            unexpected = read_message::<_, PrompterReply>(reader) => {
                return match unexpected {
                    Ok(_) => Err(ConnectionError::Internal(
                        "unsolicited prompter reply".to_string(),
                    )),
                    Err(error) => Err(error.into()),
                };
            }
        };

        let exchange = match job.kind {
            PromptKind::Message => PrompterExchange::Emit { message: job.text.clone() },
            PromptKind::Prompt => PrompterExchange::Ask { prompt: job.text.clone() },
        };
        if let Err(error) = write_message(writer, &exchange).await {
            let _ = job.reply.send(Err(PromptingError::Unavailable));
            return Err(error.into());
        }

        let reply: PrompterReply = match read_message(reader).await {
            Ok(reply) => reply,
            Err(error) => {
                let _ = job.reply.send(Err(PromptingError::Unavailable));
                return Err(error.into());
            }
        };
        if let Err(error) = reply.ensure_valid(job.kind == PromptKind::Prompt) {
            let _ = job.reply.send(Err(PromptingError::Failed(error.to_string())));
            return Err(ConnectionError::Internal(error.to_string()));
        }

        let _ = job.reply.send(Ok(reply.response.unwrap_or_default()));
    }
}

#[cfg(test)]
#[path = "prompting_tests.rs"]
mod tests;
