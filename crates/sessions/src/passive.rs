// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Placeholder connector for builds without transport plugins.

use async_trait::async_trait;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::manager::Connector;
use crate::registry::{Record, Status};
use crate::runloop::{Activity, TransportError};

/// Connector that reports a connected link and idles until cancelled.
///
/// Used when no concrete transport plugin is registered, so lifecycle
/// management stays fully functional without moving any data.
pub struct PassiveConnector;

#[async_trait]
impl<T: Record> Connector<T> for PassiveConnector {
    async fn run(
        &self,
        cancellation: CancellationToken,
        _record: T,
        activity: watch::Sender<Activity>,
    ) -> Result<(), TransportError> {
        activity
            .send(Activity { status: Status::Connected, active_sessions: 0, total_sessions: 1 })
            .ok();
        cancellation.cancelled().await;
        Ok(())
    }

    async fn flush(&self, _record: T) -> Result<(), TransportError> {
        Ok(())
    }
}
