// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon service: version reporting and termination.

use tracing::info;

use crate::listener::ListenCtx;
use crate::protocol::{DaemonRequest, Response};
use crate::version::Version;

pub(crate) async fn handle(request: DaemonRequest, ctx: &ListenCtx) -> Response {
    match request {
        DaemonRequest::Version => Response::Version { version: Version::current() },
        DaemonRequest::Terminate => {
            // The termination channel has one slot; extra concurrent
            // terminate requests are absorbed.
            let _ = ctx.termination.try_send(());
            info!("termination requested via RPC");
            Response::Ok
        }
        // Authentication is consumed during connection setup; reaching
        // dispatch means it arrived out of order.
        DaemonRequest::Authenticate { .. } => {
            Response::Error { message: "authentication must precede requests".to_string() }
        }
    }
}
