// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The severity-graded reconnect loop shared by tunnels and sessions.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use mutagen_core::TrackingLock;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::manager::Connector;
use crate::registry::{Entry, Record, Status};

/// Delay before retrying a connection after a delayed-recoverable
/// failure.
pub const HOST_TUNNEL_RETRY_DELAY: Duration = Duration::from_secs(5);

/// How severely a transport failure affects the connection loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Retry immediately.
    Recoverable,
    /// Retry after [`HOST_TUNNEL_RETRY_DELAY`].
    DelayedRecoverable,
    /// Surface the error and stop the loop.
    Unrecoverable,
}

/// A transport failure with its retry classification.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct TransportError {
    pub severity: ErrorSeverity,
    pub message: String,
}

impl TransportError {
    pub fn recoverable(message: impl Into<String>) -> Self {
        Self { severity: ErrorSeverity::Recoverable, message: message.into() }
    }

    pub fn delayed(message: impl Into<String>) -> Self {
        Self { severity: ErrorSeverity::DelayedRecoverable, message: message.into() }
    }

    pub fn unrecoverable(message: impl Into<String>) -> Self {
        Self { severity: ErrorSeverity::Unrecoverable, message: message.into() }
    }
}

/// Connection activity reported by a running transport.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Activity {
    pub status: Status,
    pub active_sessions: u64,
    pub total_sessions: u64,
}

/// Spawn the reconnect loop for one record.
///
/// The loop owns no reference back to its manager: it shares only the
/// entry map and the record snapshot, so manager teardown cannot cycle.
pub(crate) fn spawn_run_loop<T, C>(
    state: Arc<TrackingLock<HashMap<String, Entry<T>>>>,
    connector: Arc<C>,
    record: T,
    cancellation: CancellationToken,
) -> JoinHandle<()>
where
    T: Record,
    C: Connector<T> + ?Sized + 'static,
{
    let identifier = record.identifier().to_string();
    tokio::spawn(async move {
        loop {
            if cancellation.is_cancelled() {
                break;
            }

            set_activity(&state, &identifier, Activity { status: Status::Connecting, ..Default::default() }, None);

            let (activity_sender, activity_receiver) = watch::channel(Activity {
                status: Status::Connecting,
                ..Default::default()
            });
            let relay = spawn_activity_relay(
                Arc::clone(&state),
                identifier.clone(),
                activity_receiver,
            );

            let result =
                connector.run(cancellation.clone(), record.clone(), activity_sender).await;
            relay.await.ok();

            match result {
                Ok(()) => {
                    debug!(identifier, "connection loop finished");
                    break;
                }
                Err(failure) => match failure.severity {
                    ErrorSeverity::Recoverable => {
                        debug!(identifier, error = %failure, "retrying connection");
                        continue;
                    }
                    ErrorSeverity::DelayedRecoverable => {
                        warn!(identifier, error = %failure, "retrying connection after delay");
                        tokio::select! {
                            _ = tokio::time::sleep(HOST_TUNNEL_RETRY_DELAY) => {}
                            _ = cancellation.cancelled() => break,
                        }
                    }
                    ErrorSeverity::Unrecoverable => {
                        error!(identifier, error = %failure, "connection failed permanently");
                        set_activity(
                            &state,
                            &identifier,
                            Activity { status: Status::Disconnected, ..Default::default() },
                            Some(failure.message),
                        );
                        return;
                    }
                },
            }
        }

        // Cancelled or finished cleanly: report the resting status.
        let resting = {
            let guard = state.lock();
            let paused = guard.get(&identifier).map(|entry| entry.record.paused());
            guard.unlock_without_notify();
            paused
        };
        if let Some(paused) = resting {
            let status = if paused { Status::Paused } else { Status::Disconnected };
            set_activity(&state, &identifier, Activity { status, ..Default::default() }, None);
        }
    })
}

/// Forward transport activity updates into the shared entry map. Ends
/// when the transport drops its sender.
fn spawn_activity_relay<T: Record>(
    state: Arc<TrackingLock<HashMap<String, Entry<T>>>>,
    identifier: String,
    mut receiver: watch::Receiver<Activity>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while receiver.changed().await.is_ok() {
            let activity = *receiver.borrow_and_update();
            set_activity(&state, &identifier, activity, None);
        }
    })
}

fn set_activity<T: Record>(
    state: &TrackingLock<HashMap<String, Entry<T>>>,
    identifier: &str,
    activity: Activity,
    last_error: Option<String>,
) {
    let mut guard = state.lock();
    if !guard.contains_key(identifier) {
        // Entry terminated while the loop was winding down.
        guard.unlock_without_notify();
        return;
    }
    if let Some(entry) = guard.get_mut(identifier) {
        entry.status = activity.status;
        entry.active_sessions = activity.active_sessions;
        entry.total_sessions = activity.total_sessions;
        if let Some(last_error) = last_error {
            entry.last_error = Some(last_error);
        }
    }
}
