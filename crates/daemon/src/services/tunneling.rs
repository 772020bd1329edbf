// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tunneling service handlers.

use std::sync::Arc;

use crate::listener::ListenCtx;
use crate::protocol::{Response, TunnelingRequest};
use crate::services::prompting::RegistryPrompter;

pub(crate) async fn handle(request: TunnelingRequest, ctx: &ListenCtx) -> Response {
    match request {
        TunnelingRequest::Create { specification, prompter } => {
            let prompter = RegistryPrompter::new(Arc::clone(&ctx.prompting), prompter);
            match ctx.tunnels.create_tunnel(specification, &prompter).await {
                Ok((tunnel, host_credentials)) => {
                    Response::TunnelCreated { tunnel: Box::new(tunnel), host_credentials }
                }
                Err(error) => Response::Error { message: error.to_string() },
            }
        }
        TunnelingRequest::List { selection, previous_state_index } => {
            match ctx.tunnels.list(&selection, previous_state_index).await {
                Ok((state_index, states)) => Response::TunnelList { state_index, states },
                Err(error) => Response::Error { message: error.to_string() },
            }
        }
        TunnelingRequest::Pause { selection, prompter } => {
            let prompter = RegistryPrompter::new(Arc::clone(&ctx.prompting), prompter);
            match ctx.tunnels.pause(&selection, &prompter).await {
                Ok(()) => Response::Ok,
                Err(error) => Response::Error { message: error.to_string() },
            }
        }
        TunnelingRequest::Resume { selection, prompter } => {
            let prompter = RegistryPrompter::new(Arc::clone(&ctx.prompting), prompter);
            match ctx.tunnels.resume(&selection, &prompter).await {
                Ok(()) => Response::Ok,
                Err(error) => Response::Error { message: error.to_string() },
            }
        }
        TunnelingRequest::Terminate { selection, prompter } => {
            let prompter = RegistryPrompter::new(Arc::clone(&ctx.prompting), prompter);
            match ctx.tunnels.terminate(&selection, &prompter).await {
                Ok(()) => Response::Ok,
                Err(error) => Response::Error { message: error.to_string() },
            }
        }
    }
}
