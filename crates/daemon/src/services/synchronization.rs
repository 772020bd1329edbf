// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Synchronization service handlers.

use std::sync::Arc;

use crate::listener::ListenCtx;
use crate::protocol::{Response, SynchronizationRequest};
use crate::services::prompting::RegistryPrompter;

pub(crate) async fn handle(request: SynchronizationRequest, ctx: &ListenCtx) -> Response {
    match request {
        SynchronizationRequest::Create { specification, prompter } => {
            let prompter = RegistryPrompter::new(Arc::clone(&ctx.prompting), prompter);
            match ctx.synchronization.create_session(specification, &prompter).await {
                Ok(session) => Response::SynchronizationCreated { session: Box::new(session) },
                Err(error) => Response::Error { message: error.to_string() },
            }
        }
        SynchronizationRequest::List { selection, previous_state_index } => {
            match ctx.synchronization.list(&selection, previous_state_index).await {
                Ok((state_index, states)) => {
                    Response::SynchronizationList { state_index, states }
                }
                Err(error) => Response::Error { message: error.to_string() },
            }
        }
        SynchronizationRequest::Pause { selection, prompter } => {
            let prompter = RegistryPrompter::new(Arc::clone(&ctx.prompting), prompter);
            match ctx.synchronization.pause(&selection, &prompter).await {
                Ok(()) => Response::Ok,
                Err(error) => Response::Error { message: error.to_string() },
            }
        }
        SynchronizationRequest::Resume { selection, prompter } => {
            let prompter = RegistryPrompter::new(Arc::clone(&ctx.prompting), prompter);
            match ctx.synchronization.resume(&selection, &prompter).await {
                Ok(()) => Response::Ok,
                Err(error) => Response::Error { message: error.to_string() },
            }
        }
        SynchronizationRequest::Terminate { selection, prompter } => {
            let prompter = RegistryPrompter::new(Arc::clone(&ctx.prompting), prompter);
            match ctx.synchronization.terminate(&selection, &prompter).await {
                Ok(()) => Response::Ok,
                Err(error) => Response::Error { message: error.to_string() },
            }
        }
        SynchronizationRequest::Flush { selection, prompter } => {
            let prompter = RegistryPrompter::new(Arc::clone(&ctx.prompting), prompter);
            match ctx.synchronization.flush(&selection, &prompter).await {
                Ok(()) => Response::Ok,
                Err(error) => Response::Error { message: error.to_string() },
            }
        }
    }
}
