// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Forwarding service handlers.

use std::sync::Arc;

use crate::listener::ListenCtx;
use crate::protocol::{ForwardingRequest, Response};
use crate::services::prompting::RegistryPrompter;

pub(crate) async fn handle(request: ForwardingRequest, ctx: &ListenCtx) -> Response {
    match request {
        ForwardingRequest::Create { specification, prompter } => {
            let prompter = RegistryPrompter::new(Arc::clone(&ctx.prompting), prompter);
            match ctx.forwarding.create_session(specification, &prompter).await {
                Ok(session) => Response::ForwardingCreated { session: Box::new(session) },
                Err(error) => Response::Error { message: error.to_string() },
            }
        }
        ForwardingRequest::List { selection, previous_state_index } => {
            match ctx.forwarding.list(&selection, previous_state_index).await {
                Ok((state_index, states)) => Response::ForwardingList { state_index, states },
                Err(error) => Response::Error { message: error.to_string() },
            }
        }
        ForwardingRequest::Pause { selection, prompter } => {
            let prompter = RegistryPrompter::new(Arc::clone(&ctx.prompting), prompter);
            match ctx.forwarding.pause(&selection, &prompter).await {
                Ok(()) => Response::Ok,
                Err(error) => Response::Error { message: error.to_string() },
            }
        }
        ForwardingRequest::Resume { selection, prompter } => {
            let prompter = RegistryPrompter::new(Arc::clone(&ctx.prompting), prompter);
            match ctx.forwarding.resume(&selection, &prompter).await {
                Ok(()) => Response::Ok,
                Err(error) => Response::Error { message: error.to_string() },
            }
        }
        ForwardingRequest::Terminate { selection, prompter } => {
            let prompter = RegistryPrompter::new(Arc::clone(&ctx.prompting), prompter);
            match ctx.forwarding.terminate(&selection, &prompter).await {
                Ok(()) => Response::Ok,
                Err(error) => Response::Error { message: error.to_string() },
            }
        }
    }
}
