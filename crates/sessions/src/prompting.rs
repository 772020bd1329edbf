// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The prompting seam between managers and the RPC layer.

use async_trait::async_trait;
use thiserror::Error;

/// Errors from prompt routing.
#[derive(Debug, Error)]
pub enum PromptingError {
    #[error("prompter unavailable")]
    Unavailable,

    #[error("prompting failed: {0}")]
    Failed(String),
}

/// User-interaction callback used by long-running operations.
///
/// Messages are one-line status updates; prompts are modal round-trips.
/// An empty prompt response is valid (masked input).
#[async_trait]
pub trait Prompter: Send + Sync {
    async fn message(&self, message: &str) -> Result<(), PromptingError>;

    async fn prompt(&self, prompt: &str) -> Result<String, PromptingError>;
}

/// Prompter that discards messages and answers prompts with an empty
/// response, for non-interactive callers.
pub struct SilentPrompter;

#[async_trait]
impl Prompter for SilentPrompter {
    async fn message(&self, _message: &str) -> Result<(), PromptingError> {
        Ok(())
    }

    async fn prompt(&self, _prompt: &str) -> Result<String, PromptingError> {
        Ok(String::new())
    }
}
